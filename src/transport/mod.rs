//! The transport the client delegates network work to.
//!
//! A transport creates a context from [`Options`], opens a [`Stream`] to a uri with that
//! context, and reads the response head and body from the stream. Every call gets the
//! request's [`Diagnostics`] so it can record warnings next to its result. The client fails
//! a phase as soon as the accumulator is non-empty after it, even if the call itself
//! returned `Ok`.

mod tcp;

use std::fmt;
use std::time::Duration;

use http::Method;

use crate::Uri;

pub use tcp::{TcpConnection, TcpContext, TcpTransport};

/// A warning or error reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: i32,
    pub message: String,
}

impl Diagnostic {
    pub fn new<S: Into<String>>(code: i32, message: S) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Diagnostic {
    fn from(err: std::io::Error) -> Self {
        Diagnostic::new(err.raw_os_error().unwrap_or(0), err.to_string())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Diagnostics collected during one request.
///
/// Messages are joined with line breaks in the order they were recorded; the code is the one
/// recorded last.
#[derive(Debug, Default)]
pub struct Diagnostics {
    code: i32,
    message: Option<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, diag: Diagnostic) {
        self.code = diag.code;
        match self.message {
            Some(ref mut message) => {
                message.push('\n');
                message.push_str(&diag.message);
            }
            None => self.message = Some(diag.message),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.message.is_none()
    }

    /// Drain everything recorded so far into one diagnostic.
    pub fn take(&mut self) -> Option<Diagnostic> {
        let message = self.message.take()?;
        let code = std::mem::replace(&mut self.code, 0);
        Some(Diagnostic { code, message })
    }

    /// Fold the result of a transport call into what was recorded during it.
    ///
    /// Fails if the call failed or recorded anything, with every message in order. A value
    /// that came back next to a diagnostic is dropped.
    pub fn settle<R>(&mut self, result: Result<R, Diagnostic>) -> Result<R, Diagnostic> {
        match result {
            Ok(value) => match self.take() {
                Some(diag) => Err(diag),
                None => Ok(value),
            },
            Err(diag) => {
                self.record(diag);
                Err(Diagnostic {
                    code: std::mem::replace(&mut self.code, 0),
                    message: self.message.take().unwrap_or_default(),
                })
            }
        }
    }
}

/// Settings for one exchange, handed to [`Transport::create_context`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub method: Method,
    pub timeout: Duration,
    /// Redirects to follow. The client always asks for 0.
    pub max_redirects: u32,
    /// Deliver non-2xx responses as ordinary responses instead of failing.
    pub ignore_errors: bool,
    /// Request header lines, each terminated by `\r\n`.
    pub header: String,
    /// Request body; only set for POST.
    pub content: Option<Vec<u8>>,
}

/// Opens connections.
pub trait Transport {
    type Context;
    type Stream: Stream;

    fn create_context(
        &mut self,
        options: Options,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self::Context, Diagnostic>;

    fn open(
        &mut self,
        uri: &Uri,
        context: &Self::Context,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self::Stream, Diagnostic>;
}

/// One open exchange.
pub trait Stream {
    /// Status line followed by `Name: value` header lines.
    fn read_metadata(&mut self, diagnostics: &mut Diagnostics) -> Result<Vec<String>, Diagnostic>;

    /// Everything left in the body.
    fn read_all(&mut self, diagnostics: &mut Diagnostics) -> Result<Vec<u8>, Diagnostic>;

    /// Release the connection. Calling it again does nothing.
    fn close(&mut self);
}

/// Holds an open stream and closes it when dropped.
pub(crate) struct Connection<S: Stream> {
    stream: S,
}

impl<S: Stream> Connection<S> {
    pub(crate) fn new(stream: S) -> Self {
        Self { stream }
    }

    pub(crate) fn stream(&mut self) -> &mut S {
        &mut self.stream
    }
}

impl<S: Stream> Drop for Connection<S> {
    fn drop(&mut self) {
        tracing::debug!("closing connection");
        self.stream.close();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_diagnostics_join_messages_keep_last_code() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());
        assert_eq!(diagnostics.take(), None);

        diagnostics.record(Diagnostic::new(2, "first"));
        diagnostics.record(Diagnostic::new(8, "second"));
        assert!(!diagnostics.is_empty());

        let diag = diagnostics.take().unwrap();
        assert_eq!(diag.code, 8);
        assert_eq!(diag.message, "first\nsecond");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_settle() {
        let mut diagnostics = Diagnostics::new();
        assert_eq!(diagnostics.settle(Ok::<_, Diagnostic>(1)), Ok(1));

        diagnostics.record(Diagnostic::new(2, "warning"));
        let err = diagnostics.settle(Ok::<_, Diagnostic>(1)).unwrap_err();
        assert_eq!(err, Diagnostic::new(2, "warning"));
        assert!(diagnostics.is_empty());

        diagnostics.record(Diagnostic::new(2, "warning"));
        let err = diagnostics
            .settle(Err::<u8, _>(Diagnostic::new(111, "refused")))
            .unwrap_err();
        assert_eq!(err, Diagnostic::new(111, "warning\nrefused"));
        assert!(diagnostics.is_empty());
    }

    struct Counting<'a> {
        closed: &'a mut u32,
    }

    impl Stream for Counting<'_> {
        fn read_metadata(&mut self, _: &mut Diagnostics) -> Result<Vec<String>, Diagnostic> {
            Ok(Vec::new())
        }

        fn read_all(&mut self, _: &mut Diagnostics) -> Result<Vec<u8>, Diagnostic> {
            Ok(Vec::new())
        }

        fn close(&mut self) {
            *self.closed += 1;
        }
    }

    #[test]
    fn test_connection_closes_on_drop() {
        let mut closed = 0;
        {
            let mut conn = Connection::new(Counting {
                closed: &mut closed,
            });
            let _ = conn.stream().read_all(&mut Diagnostics::new());
        }
        assert_eq!(closed, 1);
    }
}
