use base64ct::{Base64, Encoding};
use http::Method;
use indexmap::IndexMap;
use url::form_urlencoded;

use super::Auth;
use crate::Uri;

/// POST data encodings
pub(crate) const ENC_URLENCODED: &str = "application/x-www-form-urlencoded";
pub(crate) const ENC_FORMDATA: &str = "multipart/form-data";

/// Form encoding where only `[A-Za-z0-9-_.]` pass through; `*` is escaped as well.
pub(crate) fn urlencode(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes())
        .map(|chunk| if chunk == "*" { "%2A" } else { chunk })
        .collect()
}

/// `a=1&b=2`, names and values url-encoded, in map order.
pub(crate) fn build_query(params: &IndexMap<String, String>) -> String {
    params
        .iter()
        .map(|(name, value)| format!("{}={}", urlencode(name), urlencode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Credentials are url-encoded before they are joined and base64-encoded, so `p@ss` is sent
/// as `p%40ss`. Servers see the encoded form.
pub(crate) fn basic_auth(username: &str, password: &str) -> String {
    let credentials = format!("{}:{}", urlencode(username), urlencode(password));
    format!("Basic {}", Base64::encode_string(credentials.as_bytes()))
}

/// The request header block.
///
/// `Host`, `Authorization` (only with a non-empty username and password) and `Content-Type`
/// are set on a copy of the custom headers; a custom header with the same name keeps its
/// position but takes the computed value.
pub(crate) fn header_block(
    custom: &IndexMap<String, String>,
    host: &str,
    auth: &Auth,
    method: &Method,
) -> String {
    let mut headers = custom.clone();

    headers.insert("Host".to_owned(), host.to_owned());

    let username = auth.username.as_deref().filter(|s| !s.is_empty());
    let password = auth.password.as_deref().filter(|s| !s.is_empty());
    if let (Some(username), Some(password)) = (username, password) {
        headers.insert("Authorization".to_owned(), basic_auth(username, password));
    }

    let content_type = if *method == Method::POST {
        ENC_URLENCODED
    } else {
        ENC_FORMDATA
    };
    headers.insert("Content-Type".to_owned(), content_type.to_owned());

    let mut block = String::new();
    for (name, value) in headers.iter() {
        block.push_str(name);
        block.push_str(": ");
        block.push_str(value);
        block.push_str("\r\n");
    }
    block
}

/// A copy of `uri` with the GET parameters appended to its query.
///
/// A non-empty query always gets a `&` separator, so `q=rust` with no parameters becomes
/// `q=rust&`.
pub(crate) fn connection_uri(uri: &Uri, params: &IndexMap<String, String>) -> Uri {
    let mut uri = uri.clone();
    let mut query = uri.query().to_owned();
    if !query.is_empty() {
        query.push('&');
    }
    query.push_str(&build_query(params));
    uri.set_query(query);
    uri
}

#[cfg(test)]
mod test {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn auth(username: Option<&str>, password: Option<&str>) -> Auth {
        Auth {
            username: username.map(str::to_owned),
            password: password.map(str::to_owned),
        }
    }

    // Characterization: credentials are url-encoded before base64, unlike RFC 7617.
    #[test]
    fn test_basic_auth_urlencodes_credentials() {
        let expected = format!("Basic {}", Base64::encode_string(b"ann:p%40ss"));
        assert_eq!(basic_auth("ann", "p@ss"), expected);
        assert_eq!(basic_auth("ann", "p@ss"), "Basic YW5uOnAlNDBzcw==");
        assert_ne!(
            basic_auth("ann", "p@ss"),
            format!("Basic {}", Base64::encode_string(b"ann:p@ss"))
        );
    }

    #[test]
    fn test_build_query() {
        let query = build_query(&params(&[("a", "1"), ("b", "two words"), ("c&d", "=")]));
        assert_eq!(query, "a=1&b=two+words&c%26d=%3D");
        assert_eq!(build_query(&IndexMap::new()), "");
    }

    // Characterization: `*` is escaped, only letters, digits and `-_.` pass through.
    #[test]
    fn test_urlencode_escapes_star() {
        assert_eq!(urlencode("a*b"), "a%2Ab");
        assert_eq!(urlencode("a-b_c.d~e"), "a-b_c.d%7Ee");
        assert_eq!(build_query(&params(&[("k", "a*b")])), "k=a%2Ab");
        assert_eq!(build_query(&params(&[("*", "1")])), "%2A=1");
        assert_eq!(
            basic_auth("u", "a*b"),
            format!("Basic {}", Base64::encode_string(b"u:a%2Ab"))
        );
    }

    #[test]
    fn test_header_block_get() {
        let block = header_block(
            &IndexMap::new(),
            "example.org",
            &auth(None, None),
            &Method::GET,
        );
        assert_eq!(
            block,
            "Host: example.org\r\nContent-Type: multipart/form-data\r\n"
        );
    }

    #[test]
    fn test_header_block_post_with_auth() {
        let block = header_block(
            &IndexMap::new(),
            "example.org",
            &auth(Some("ann"), Some("p@ss")),
            &Method::POST,
        );
        assert_eq!(
            block,
            "Host: example.org\r\n\
             Authorization: Basic YW5uOnAlNDBzcw==\r\n\
             Content-Type: application/x-www-form-urlencoded\r\n"
        );
    }

    #[test]
    fn test_header_block_needs_both_credentials() {
        for (user, pass) in [(Some("ann"), None), (None, Some("pw")), (Some("ann"), Some(""))]
            .iter()
        {
            let block = header_block(
                &IndexMap::new(),
                "example.org",
                &auth(*user, *pass),
                &Method::GET,
            );
            assert!(!block.contains("Authorization"), "{}", block);
        }
    }

    #[test]
    fn test_header_block_custom_headers() {
        let custom = params(&[("X-Trace", "abc"), ("Host", "ignored"), ("Accept", "*/*")]);
        let block = header_block(&custom, "example.org", &auth(None, None), &Method::GET);
        assert_eq!(
            block,
            "X-Trace: abc\r\n\
             Host: example.org\r\n\
             Accept: */*\r\n\
             Content-Type: multipart/form-data\r\n"
        );
    }

    #[test]
    fn test_connection_uri_appends_params() {
        let uri = Uri::parse("http://example.org/search?q=rust").unwrap();

        let conn = connection_uri(&uri, &params(&[("page", "2")]));
        assert_eq!(conn.query(), "q=rust&page=2");
        assert_eq!(conn.host(), "example.org");
        assert_eq!(conn.path(), "/search");
        // input uri is not modified
        assert_eq!(uri.query(), "q=rust");

        // Characterization: an existing query keeps its separator even with no parameters.
        let conn = connection_uri(&uri, &IndexMap::new());
        assert_eq!(conn.query(), "q=rust&");
        assert_eq!(conn.to_string(), "http://example.org:80/search?q=rust&");

        let bare = Uri::parse("http://example.org/").unwrap();
        let conn = connection_uri(&bare, &IndexMap::new());
        assert_eq!(conn.to_string(), "http://example.org:80/");

        let bare = Uri::parse("http://example.org/").unwrap();
        let conn = connection_uri(&bare, &params(&[("a", "1"), ("b", "2")]));
        assert_eq!(conn.to_string(), "http://example.org:80/?a=1&b=2");
    }
}
