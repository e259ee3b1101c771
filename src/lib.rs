#![deny(unsafe_code)]

//! # bowler
//!
//! A small, synchronous http client for script-style integrations.
//!
//! Configure a [`Client`] with a uri, query and form parameters, headers and basic auth,
//! then call [`Client::request`]. One request performs one exchange: redirects are not
//! followed, and every status code comes back as an ordinary [`Response`].
//!
//! ```no_run
//! use bowler::{Client, Method};
//!
//! # fn main() -> bowler::Result<()> {
//! let mut client = Client::with_uri("http://example.org/search")?;
//! client.set_parameter_get("q", "hats");
//!
//! let resp = client.request(Method::GET)?;
//! println!("{} {}", resp.status(), resp.status_text());
//! # Ok(())
//! # }
//! ```
//!
//! Network work goes through a [`transport::Transport`]. [`transport::TcpTransport`], the
//! default, speaks plain HTTP/1.0 over TCP.

pub mod client;
mod error;
mod response;
pub mod transport;
mod uri;

pub use client::{Auth, Client, Config, ConfigUpdate, IntoUri};
pub use error::{Error, Result};
pub use http::Method;
pub use response::Response;
pub use uri::{Scheme, Uri};
