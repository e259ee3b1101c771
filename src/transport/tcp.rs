//! Blocking HTTP/1.0 transport over a plain TCP socket.
//!
//! Each exchange uses a fresh connection. Redirects are never followed and every status is
//! returned as an ordinary response. There is no TLS, so `https` uris fail to open, and no
//! chunked decoding, since an HTTP/1.0 request does not receive chunked bodies.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use http::Method;

use super::{Diagnostic, Diagnostics, Options, Stream, Transport};
use crate::uri::{Scheme, Uri};

const CR: u8 = b'\r';
const LF: u8 = b'\n';
const MAX_HEADERS: usize = 128;
const MAX_HEAD_LENGTH: usize = 64 * 1024;

/// The default transport used by [`Client`](crate::Client).
#[derive(Debug, Default, Clone)]
pub struct TcpTransport;

impl TcpTransport {
    pub fn new() -> Self {
        TcpTransport
    }
}

#[derive(Debug)]
pub struct TcpContext {
    options: Options,
}

impl Transport for TcpTransport {
    type Context = TcpContext;
    type Stream = TcpConnection;

    fn create_context(
        &mut self,
        options: Options,
        _diagnostics: &mut Diagnostics,
    ) -> Result<TcpContext, Diagnostic> {
        // a zero timeout is rejected by set_read_timeout
        if options.timeout == Duration::from_secs(0) {
            return Err(Diagnostic::new(0, "timeout must be greater than zero"));
        }
        if options.max_redirects != 0 {
            tracing::warn!("redirects are never followed, ignoring max_redirects");
        }
        Ok(TcpContext { options })
    }

    fn open(
        &mut self,
        uri: &Uri,
        context: &TcpContext,
        _diagnostics: &mut Diagnostics,
    ) -> Result<TcpConnection, Diagnostic> {
        if uri.scheme() != Scheme::Http {
            return Err(Diagnostic::new(
                0,
                format!("scheme {} is not supported by the tcp transport", uri.scheme()),
            ));
        }

        let options = &context.options;
        let stream = connect(uri.host(), uri.port(), options.timeout)?;
        stream.set_read_timeout(Some(options.timeout))?;
        stream.set_write_timeout(Some(options.timeout))?;

        let mut conn = TcpConnection {
            reader: BufReader::new(stream),
            head: Vec::new(),
            content_length: None,
            has_body: true,
            closed: false,
        };

        let res = conn
            .send(uri, options)
            .and_then(|_| conn.read_head(&options.method));
        match res {
            Ok(()) => Ok(conn),
            Err(diag) => {
                conn.close();
                Err(diag)
            }
        }
    }
}

/// An exchange whose response head has already been read.
#[derive(Debug)]
pub struct TcpConnection {
    reader: BufReader<TcpStream>,
    head: Vec<String>,
    content_length: Option<u64>,
    has_body: bool,
    closed: bool,
}

impl TcpConnection {
    fn send(&mut self, uri: &Uri, options: &Options) -> Result<(), Diagnostic> {
        let mut buf: Vec<u8> = Vec::new();

        let val = format!("{} {} HTTP/1.0\r\n", options.method, uri.request_target());
        tracing::trace!("> {}", val.trim_end());
        buf.extend_from_slice(val.as_bytes());

        for line in options.header.lines().filter(|line| !line.is_empty()) {
            tracing::trace!("> {}", line);
            buf.extend_from_slice(line.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }

        if let Some(ref content) = options.content {
            let val = format!("Content-Length: {}\r\n", content.len());
            tracing::trace!("> {}", val.trim_end());
            buf.extend_from_slice(val.as_bytes());
        }

        buf.extend_from_slice(b"\r\n");

        if let Some(ref content) = options.content {
            buf.extend_from_slice(content);
        }

        let stream = self.reader.get_mut();
        stream.write_all(&buf)?;
        stream.flush()?;
        Ok(())
    }

    fn read_head(&mut self, method: &Method) -> Result<(), Diagnostic> {
        let mut buf = Vec::new();

        loop {
            let limit = (MAX_HEAD_LENGTH - buf.len()) as u64;
            let bytes_read = self.reader.by_ref().take(limit).read_until(LF, &mut buf)?;
            if bytes_read == 0 {
                return Err(Diagnostic::new(
                    0,
                    "connection closed before the response head was complete",
                ));
            }

            if buf.len() >= MAX_HEAD_LENGTH {
                return Err(Diagnostic::new(0, "response head exceeds 64 KiB"));
            }

            if buf.ends_with(&[CR, LF, CR, LF]) || buf.ends_with(&[LF, LF]) {
                break;
            }
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut res = httparse::Response::new(&mut headers);
        let status = res
            .parse(&buf)
            .map_err(|err| Diagnostic::new(0, format!("malformed response head: {}", err)))?;
        if status.is_partial() {
            return Err(Diagnostic::new(0, "malformed response head"));
        }
        let code = res.code.unwrap_or(0);

        let status_line = buf
            .split(|&b| b == LF)
            .next()
            .map(|line| String::from_utf8_lossy(line).trim_end().to_owned())
            .unwrap_or_default();
        tracing::trace!("< {}", status_line);

        let mut head = vec![status_line];
        let mut content_length = None;
        for header in res.headers.iter() {
            let value = String::from_utf8_lossy(header.value);
            if header.name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse::<u64>().ok();
            }
            let line = format!("{}: {}", header.name, value);
            tracing::trace!("< {}", line);
            head.push(line);
        }

        self.head = head;
        self.content_length = content_length;
        self.has_body = *method != Method::HEAD
            && !(100..200).contains(&code)
            && code != 204
            && code != 304;
        Ok(())
    }
}

impl Stream for TcpConnection {
    fn read_metadata(&mut self, _diagnostics: &mut Diagnostics) -> Result<Vec<String>, Diagnostic> {
        Ok(self.head.clone())
    }

    fn read_all(&mut self, diagnostics: &mut Diagnostics) -> Result<Vec<u8>, Diagnostic> {
        let mut body = Vec::new();
        if !self.has_body {
            return Ok(body);
        }

        match self.content_length {
            Some(len) => {
                self.reader.by_ref().take(len).read_to_end(&mut body)?;
                if (body.len() as u64) < len {
                    diagnostics.record(Diagnostic::new(
                        0,
                        format!(
                            "response body truncated: expected {} bytes, got {}",
                            len,
                            body.len()
                        ),
                    ));
                }
            }
            None => {
                self.reader.read_to_end(&mut body)?;
            }
        }

        Ok(body)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(err) = self.reader.get_ref().shutdown(Shutdown::Both) {
            tracing::debug!("error shutting down connection: {}", err);
        }
    }
}

fn connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, Diagnostic> {
    // ipv6 literals come bracketed from the uri
    let host = host.trim_start_matches('[').trim_end_matches(']');

    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        tracing::debug!("connecting to {}", addr);
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }

    Err(match last_err {
        Some(err) => err.into(),
        None => Diagnostic::new(0, format!("no addresses found for {}", host)),
    })
}
