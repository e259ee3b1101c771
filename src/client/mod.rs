//! Simple blocking client for one HTTP exchange at a time.

mod encode;

use std::convert::TryFrom;
use std::time::Duration;

use http::Method;
use indexmap::IndexMap;

use crate::error::{self, Result};
use crate::transport::{Connection, Diagnostics, Options, Stream, TcpTransport, Transport};
use crate::{Response, Uri};

/// Status line used when response headers are not fetched.
const DEFAULT_STATUS_LINE: &str = "HTTP/1.0 200 OK";

/// Basic auth credentials. Either may be unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Auth {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Read the response body.
    pub fetch_body: bool,
    /// Read the response head. When false, the response is reported as `200 OK`.
    pub fetch_headers: bool,
    pub timeout: Duration,
    /// Method of the last request; unset until the first one.
    pub method: Option<Method>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch_body: true,
            fetch_headers: true,
            timeout: Duration::from_secs(10),
            method: None,
        }
    }
}

/// Partial config; only the fields that are set are applied by [`Client::set_config`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub fetch_body: Option<bool>,
    pub fetch_headers: Option<bool>,
    pub timeout: Option<Duration>,
    pub method: Option<Method>,
}

impl Config {
    fn merge(&mut self, update: ConfigUpdate) {
        if let Some(fetch_body) = update.fetch_body {
            self.fetch_body = fetch_body;
        }
        if let Some(fetch_headers) = update.fetch_headers {
            self.fetch_headers = fetch_headers;
        }
        if let Some(timeout) = update.timeout {
            self.timeout = timeout;
        }
        if let Some(method) = update.method {
            self.method = Some(method);
        }
    }
}

/// Anything a [`Client`] accepts as its uri.
pub trait IntoUri {
    fn into_uri(self) -> Result<Uri>;
}

impl IntoUri for Uri {
    fn into_uri(self) -> Result<Uri> {
        Ok(self)
    }
}

impl IntoUri for &Uri {
    fn into_uri(self) -> Result<Uri> {
        Ok(self.clone())
    }
}

impl IntoUri for &str {
    fn into_uri(self) -> Result<Uri> {
        Uri::try_from(self)
    }
}

impl IntoUri for String {
    fn into_uri(self) -> Result<Uri> {
        Uri::try_from(self)
    }
}

/// A configurable HTTP client.
///
/// Uri, parameters, headers, auth and config persist across requests. Each
/// [`request`](Client::request) opens its own connection through the transport and closes it
/// before returning, on success and on every error.
///
/// A client runs one request at a time; `request` takes `&mut self`.
#[derive(Debug)]
pub struct Client<T: Transport = TcpTransport> {
    transport: T,
    uri: Option<Uri>,
    auth: Auth,
    parameters_get: IndexMap<String, String>,
    parameters_post: IndexMap<String, String>,
    headers: IndexMap<String, String>,
    config: Config,
}

impl Client<TcpTransport> {
    pub fn new() -> Self {
        Self::with_transport(TcpTransport::new())
    }

    pub fn with_uri<U: IntoUri>(uri: U) -> Result<Self> {
        let mut client = Self::new();
        client.set_uri(uri)?;
        Ok(client)
    }
}

impl Default for Client<TcpTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            uri: None,
            auth: Auth::default(),
            parameters_get: IndexMap::new(),
            parameters_post: IndexMap::new(),
            headers: IndexMap::new(),
            config: Config::default(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Replace the uri. Strings are parsed.
    pub fn set_uri<U: IntoUri>(&mut self, uri: U) -> Result<&mut Self> {
        self.uri = Some(uri.into_uri()?);
        Ok(self)
    }

    pub fn uri(&self) -> Result<&Uri> {
        self.uri
            .as_ref()
            .ok_or_else(|| error::configuration("Uri not set"))
    }

    pub fn set_auth(&mut self, username: Option<&str>, password: Option<&str>) -> &mut Self {
        self.auth = Auth {
            username: username.map(str::to_owned),
            password: password.map(str::to_owned),
        };
        self
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// Merge `update` into the config; unset fields keep their value.
    pub fn set_config(&mut self, update: ConfigUpdate) -> &mut Self {
        self.config.merge(update);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_parameter_get<K, V>(&mut self, name: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.parameters_get.insert(name.into(), value.into());
        self
    }

    /// Merge many GET parameters at once.
    pub fn set_parameters_get<I, K, V>(&mut self, params: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in params {
            self.set_parameter_get(name, value);
        }
        self
    }

    pub fn remove_parameter_get(&mut self, name: &str) -> &mut Self {
        self.parameters_get.shift_remove(name);
        self
    }

    pub fn parameters_get(&self) -> &IndexMap<String, String> {
        &self.parameters_get
    }

    pub fn set_parameter_post<K, V>(&mut self, name: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.parameters_post.insert(name.into(), value.into());
        self
    }

    /// Merge many POST parameters at once.
    pub fn set_parameters_post<I, K, V>(&mut self, params: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in params {
            self.set_parameter_post(name, value);
        }
        self
    }

    pub fn remove_parameter_post(&mut self, name: &str) -> &mut Self {
        self.parameters_post.shift_remove(name);
        self
    }

    pub fn parameters_post(&self) -> &IndexMap<String, String> {
        &self.parameters_post
    }

    /// Set a custom request header, replacing any previous value.
    pub fn set_header<K, V>(&mut self, name: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        self.headers.shift_remove(name);
        self
    }

    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    /// Clear GET and POST parameters, and custom headers if `reset_headers`.
    pub fn reset_parameters(&mut self, reset_headers: bool) -> &mut Self {
        self.parameters_get.clear();
        self.parameters_post.clear();
        if reset_headers {
            self.headers.clear();
        }
        self
    }

    pub fn get(&mut self) -> Result<Response> {
        self.request(Method::GET)
    }

    pub fn post(&mut self) -> Result<Response> {
        self.request(Method::POST)
    }

    /// Perform one exchange.
    ///
    /// Any status, including 4xx and 5xx, is an `Ok` response. An error means the exchange
    /// itself failed: bad configuration, a connection that could not be opened, or a head
    /// or body that could not be read. Diagnostics the transport records during a phase
    /// fail that phase even if the call returned a value.
    pub fn request(&mut self, method: Method) -> Result<Response> {
        let mut diagnostics = Diagnostics::new();

        self.config.merge(ConfigUpdate {
            method: Some(method.clone()),
            ..ConfigUpdate::default()
        });

        let uri = self.uri()?.clone();
        let target = uri.to_string();
        tracing::debug!("{} {}", method, target);

        let content = if method == Method::POST {
            Some(encode::build_query(&self.parameters_post).into_bytes())
        } else {
            None
        };
        let options = Options {
            header: encode::header_block(&self.headers, uri.host(), &self.auth, &method),
            method,
            timeout: self.config.timeout,
            max_redirects: 0,
            ignore_errors: true,
            content,
        };

        let res = self.transport.create_context(options, &mut diagnostics);
        let context = diagnostics.settle(res).map_err(error::context)?;

        let conn_uri = encode::connection_uri(&uri, &self.parameters_get);
        tracing::debug!("opening {}", conn_uri);
        // wrapped before settling, so a stream opened next to a diagnostic is still closed
        let res = self
            .transport
            .open(&conn_uri, &context, &mut diagnostics)
            .map(Connection::new);
        let mut conn = diagnostics
            .settle(res)
            .map_err(|diag| error::connection(target.clone(), diag))?;

        let lines = if self.config.fetch_headers {
            let res = conn.stream().read_metadata(&mut diagnostics);
            diagnostics
                .settle(res)
                .map_err(|diag| error::header_fetch(target.clone(), diag))?
        } else {
            vec![DEFAULT_STATUS_LINE.to_owned()]
        };

        let body = if self.config.fetch_body {
            let res = conn.stream().read_all(&mut diagnostics);
            diagnostics
                .settle(res)
                .map_err(|diag| error::body_fetch(target.clone(), diag))?
        } else {
            Vec::new()
        };

        drop(conn);

        let response = Response::new(lines, body);
        tracing::debug!("{} {} {}", target, response.status(), response.status_text());
        Ok(response)
    }
}
