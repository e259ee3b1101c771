use std::borrow::Cow;

use indexmap::IndexMap;

/// A complete response, built once from the raw head lines and body of one exchange.
///
/// The first head line is the status line, `<protocol> <code> <text...>`. The rest are
/// `Name: value` header lines. Header lines without a colon are skipped, and a repeated
/// header name keeps the last value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status_code: u16,
    status_text: String,
    headers: IndexMap<String, String>,
    body: Vec<u8>,
}

impl Response {
    pub fn new<I, S, B>(lines: I, body: B) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        B: Into<Vec<u8>>,
    {
        let mut lines = lines.into_iter();

        let (status_code, status_text) = match lines.next() {
            Some(status_line) => parse_status_line(status_line.as_ref()),
            None => (0, String::new()),
        };

        let mut headers = IndexMap::new();
        for line in lines {
            let line = line.as_ref();
            match line.split_once(':') {
                Some((name, value)) => {
                    headers.insert(name.to_owned(), value.trim().to_owned());
                }
                None => {
                    tracing::warn!("skipping malformed response header line: {:?}", line);
                }
            }
        }

        Self {
            status_code,
            status_text,
            headers,
            body: body.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status_code
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Value of the header named exactly `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// All headers, in the order they were first received.
    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text; invalid utf-8 is replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

// A code that is missing or not a number reads as 0, a missing text as "".
fn parse_status_line(line: &str) -> (u16, String) {
    let mut parts = line.splitn(3, ' ');
    let _protocol = parts.next();
    let code = parts
        .next()
        .and_then(|code| code.trim().parse::<u16>().ok())
        .unwrap_or(0);
    let text = parts.next().unwrap_or("").trim_end().to_owned();
    (code, text)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_and_headers() {
        let res = Response::new(
            vec!["HTTP/1.1 404 Not Found", "Content-Type: text/plain"],
            "nope",
        );
        assert_eq!(res.status(), 404);
        assert_eq!(res.status_text(), "Not Found");
        assert_eq!(res.header("Content-Type"), Some("text/plain"));
        assert_eq!(res.body(), b"nope");
        assert_eq!(res.text(), "nope");
    }

    #[test]
    fn test_status_text_keeps_spaces() {
        let res = Response::new(vec!["HTTP/1.1 500 Internal Server Error"], "");
        assert_eq!(res.status(), 500);
        assert_eq!(res.status_text(), "Internal Server Error");
    }

    #[test]
    fn test_default_status_line() {
        let res = Response::new(vec!["HTTP/1.0 200 OK"], Vec::new());
        assert_eq!(res.status(), 200);
        assert_eq!(res.status_text(), "OK");
        assert!(res.headers().is_empty());
        assert!(res.body().is_empty());
    }

    #[test]
    fn test_header_value_split_on_first_colon_and_trimmed() {
        let res = Response::new(
            vec!["HTTP/1.1 302 Found", "Location:   http://example.org:8080/next  "],
            "",
        );
        assert_eq!(res.header("Location"), Some("http://example.org:8080/next"));
    }

    #[test]
    fn test_duplicate_header_last_wins() {
        let res = Response::new(
            vec![
                "HTTP/1.1 200 OK",
                "Set-Cookie: a=1",
                "X-Other: x",
                "Set-Cookie: b=2",
            ],
            "",
        );
        assert_eq!(res.header("Set-Cookie"), Some("b=2"));
        assert_eq!(res.headers().len(), 2);
        let names: Vec<_> = res.headers().keys().map(String::as_str).collect();
        assert_eq!(names, ["Set-Cookie", "X-Other"]);
    }

    #[test]
    fn test_missing_header_is_none() {
        let res = Response::new(vec!["HTTP/1.1 200 OK"], "");
        assert_eq!(res.header("Content-Length"), None);
    }

    #[test]
    fn test_header_lookup_is_exact() {
        let res = Response::new(vec!["HTTP/1.1 200 OK", "Content-Type: text/html"], "");
        assert_eq!(res.header("content-type"), None);
    }

    // Characterization: a head line without a colon is skipped, not an error.
    #[test]
    fn test_header_line_without_colon_is_skipped() {
        let res = Response::new(
            vec!["HTTP/1.1 200 OK", "garbage line", "X-Ok: yes"],
            "",
        );
        assert_eq!(res.headers().len(), 1);
        assert_eq!(res.header("X-Ok"), Some("yes"));
        assert_eq!(res.header("garbage line"), None);
    }

    #[test]
    fn test_malformed_status_line() {
        let res = Response::new(vec!["HTTP/1.1 abc"], "");
        assert_eq!(res.status(), 0);
        assert_eq!(res.status_text(), "");

        let res = Response::new(Vec::<String>::new(), "");
        assert_eq!(res.status(), 0);
    }
}
