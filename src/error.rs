use thiserror::Error as ThisError;

use crate::transport::Diagnostic;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a failed request. A failed request never returns a partial `Response`.
///
/// Every variant except `Configuration` carries the target url and the diagnostic text
/// collected from the transport while that phase ran.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Missing or invalid uri, unsupported scheme, or a transport context that could not be
    /// created.
    #[error("{message}")]
    Configuration { message: String, code: i32 },

    /// The transport could not open a connection to the target.
    #[error("Can't connect to {url} [{message}]")]
    Connection { url: String, message: String, code: i32 },

    /// The connection was opened, but the response head could not be read.
    #[error("Can't fetch response headers from {url} [{message}]")]
    HeaderFetch { url: String, message: String, code: i32 },

    /// The response body could not be read.
    #[error("Can't fetch response content from {url} [{message}]")]
    BodyFetch { url: String, message: String, code: i32 },
}

impl Error {
    /// Numeric code of the underlying diagnostic, 0 if there was none.
    pub fn code(&self) -> i32 {
        use Error::*;
        match self {
            Configuration { code, .. }
            | Connection { code, .. }
            | HeaderFetch { code, .. }
            | BodyFetch { code, .. } => *code,
        }
    }

    /// The diagnostic text, without the url prefix.
    pub fn message(&self) -> &str {
        use Error::*;
        match self {
            Configuration { message, .. }
            | Connection { message, .. }
            | HeaderFetch { message, .. }
            | BodyFetch { message, .. } => message,
        }
    }
}

pub(crate) fn configuration<S: Into<String>>(msg: S) -> Error {
    Error::Configuration {
        message: msg.into(),
        code: 0,
    }
}

pub(crate) fn context(diag: Diagnostic) -> Error {
    Error::Configuration {
        message: diag.message,
        code: diag.code,
    }
}

pub(crate) fn connection(url: String, diag: Diagnostic) -> Error {
    Error::Connection {
        url,
        message: diag.message,
        code: diag.code,
    }
}

pub(crate) fn header_fetch(url: String, diag: Diagnostic) -> Error {
    Error::HeaderFetch {
        url,
        message: diag.message,
        code: diag.code,
    }
}

pub(crate) fn body_fetch(url: String, diag: Diagnostic) -> Error {
    Error::BodyFetch {
        url,
        message: diag.message,
        code: diag.code,
    }
}
