//! Request target: `scheme://[username[:password]@]host:port/path[?query][#fragment]`

use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{self, Error, Result};

const HTTP_PORT: u16 = 80;
const HTTPS_PORT: u16 = 443;

/// Supported uri schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            _ => Err(error::configuration(format!("Unsupported uri scheme: {}", s))),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed http(s) uri.
///
/// The port is always rendered, and switching the scheme to `https` moves a port that was
/// never set explicitly from 80 to 443.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    scheme: Scheme,
    username: Option<String>,
    password: Option<String>,
    host: String,
    port: u16,
    // true once set_port was called; an explicit port survives scheme changes
    port_explicit: bool,
    path: String,
    query: String,
    fragment: String,
}

impl Default for Uri {
    fn default() -> Self {
        Self {
            scheme: Scheme::Http,
            username: None,
            password: None,
            host: String::new(),
            port: HTTP_PORT,
            port_explicit: false,
            path: "/".to_owned(),
            query: String::new(),
            fragment: String::new(),
        }
    }
}

impl Uri {
    /// Parse a url string.
    ///
    /// Components are applied through their setters in the order scheme, username,
    /// password, host, port, path, query, fragment, so scheme validation and the https
    /// port default run exactly as they would for a uri built by hand.
    pub fn parse(s: &str) -> Result<Self> {
        let url = Url::parse(s)
            .map_err(|err| error::configuration(format!("Invalid uri {}: {}", s, err)))?;

        // `url` lowercases the scheme; validate it as written
        let scheme = s.trim_start().split(':').next().unwrap_or_default();

        let mut uri = Uri::default();
        uri.set_scheme(scheme)?;
        if !url.username().is_empty() {
            uri.set_username(Some(url.username()));
        }
        if let Some(password) = url.password() {
            uri.set_password(Some(password));
        }
        if let Some(host) = url.host_str() {
            uri.set_host(host);
        }
        // `url` hides ports equal to the scheme default
        if let Some(port) = url.port() {
            uri.set_port(port);
        }
        uri.set_path(url.path());
        if let Some(query) = url.query() {
            uri.set_query(query);
        }
        if let Some(fragment) = url.fragment() {
            uri.set_fragment(fragment);
        }

        Ok(uri)
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Only `http` and `https` are accepted.
    pub fn set_scheme(&mut self, scheme: &str) -> Result<()> {
        let scheme: Scheme = scheme.parse()?;
        if scheme == Scheme::Https && !self.port_explicit && self.port == HTTP_PORT {
            self.port = HTTPS_PORT;
        }
        self.scheme = scheme;
        Ok(())
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn set_username<S: Into<String>>(&mut self, username: Option<S>) {
        self.username = username.map(Into::into);
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn set_password<S: Into<String>>(&mut self, password: Option<S>) {
        self.password = password.map(Into::into);
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn set_host<S: Into<String>>(&mut self, host: S) {
        self.host = host.into();
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
        self.port_explicit = true;
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Stored with exactly one leading slash.
    pub fn set_path(&mut self, path: &str) {
        self.path = format!("/{}", path.trim_start_matches('/'));
    }

    /// Raw query, without the leading `?`.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query<S: Into<String>>(&mut self, query: S) {
        self.query = query.into();
    }

    /// Raw fragment, without the leading `#`.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn set_fragment(&mut self, fragment: &str) {
        self.fragment = fragment.trim_start_matches('#').to_owned();
    }

    /// Path plus query, as sent on the request line.
    pub fn request_target(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.scheme)?;

        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            f.write_str(username)?;
            if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
                write!(f, ":{}", password)?;
            }
            f.write_str("@")?;
        }

        write!(f, "{}:{}{}", self.host, self.port, self.path)?;

        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        if !self.fragment.is_empty() {
            write!(f, "#{}", self.fragment)?;
        }
        Ok(())
    }
}

impl FromStr for Uri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uri::parse(s)
    }
}

impl TryFrom<&str> for Uri {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Uri::parse(s)
    }
}

impl TryFrom<String> for Uri {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Uri::parse(&s)
    }
}
