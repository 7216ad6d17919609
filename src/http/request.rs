//! Request parsing.
//!
//! # Responsibilities
//! - Split the request head into request line and header lines
//! - Decode the request target into path and query parameters
//! - Expose routing-relevant information (method, path, params)
//!
//! # Design Decisions
//! - The head is parsed only once it is complete (see `reader.rs`)
//! - Method tokens are case-sensitive, header names are not
//! - The path is percent-decoded after splitting off the query, so an
//!   encoded `?` stays part of the path

use std::fmt;
use std::net::SocketAddr;

use percent_encoding::percent_decode_str;
use url::form_urlencoded;

use crate::http::headers::Headers;

/// Errors raised while parsing a request head.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty request")]
    Empty,
    #[error("request head is not valid UTF-8")]
    Encoding,
    #[error("malformed request line: {0:?}")]
    RequestLine(String),
    #[error("unsupported protocol version: {0:?}")]
    Version(String),
    #[error("malformed request target: {0:?}")]
    Target(String),
    #[error("malformed query parameter: {0:?}")]
    Query(String),
    #[error("malformed header line: {0:?}")]
    Header(String),
    #[error("invalid content-length: {0:?}")]
    ContentLength(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Patch,
    Other(String),
}

impl Method {
    pub fn parse(method: &str) -> Self {
        match method {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
            Method::Other(other) => other,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol version from the request line, echoed back in the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
    Other(String),
}

impl Version {
    pub fn parse(version: &str) -> Result<Self, ParseError> {
        match version {
            "HTTP/1.0" => Ok(Version::Http10),
            "HTTP/1.1" => Ok(Version::Http11),
            other if other.starts_with("HTTP/") && other.len() > "HTTP/".len() => {
                Ok(Version::Other(other.to_string()))
            }
            other => Err(ParseError::Version(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
            Version::Other(other) => other,
        }
    }

    /// `Connection: close` is only meaningful for HTTP/1.x.
    pub fn is_http1(&self) -> bool {
        self.as_str().starts_with("HTTP/1")
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded request target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Target {
    /// Percent-decoded path, always starting with `/`.
    pub path: String,
    /// Query parameters in order of appearance.
    pub params: Vec<(String, String)>,
}

impl Target {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let (raw_path, query) = match raw.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (raw, None),
        };

        if !raw_path.starts_with('/') {
            return Err(ParseError::Target(raw.to_string()));
        }

        let path = percent_decode_str(raw_path)
            .decode_utf8()
            .map_err(|_| ParseError::Target(raw.to_string()))?
            .into_owned();

        let mut params = Vec::new();
        for pair in query.unwrap_or_default().split('&') {
            if pair.is_empty() {
                continue;
            }
            if !pair.contains('=') {
                return Err(ParseError::Query(pair.to_string()));
            }
            params.extend(
                form_urlencoded::parse(pair.as_bytes())
                    .map(|(name, value)| (name.into_owned(), value.into_owned())),
            );
        }

        Ok(Self { path, params })
    }

    /// Value of a query parameter; the last occurrence wins.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Target exactly as sent, for logging.
    pub raw_target: String,
    pub target: Target,
    pub version: Version,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub peer_addr: Option<SocketAddr>,
}

impl Request {
    /// Parse a request head: the bytes before the blank line.
    pub fn parse(head: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(head).map_err(|_| ParseError::Encoding)?;
        // clients may send stray CRLFs between requests
        let text = text.trim_start_matches(['\r', '\n']).trim_end_matches(['\r', '\n']);
        if text.is_empty() {
            return Err(ParseError::Empty);
        }

        let mut lines = text.lines();
        let request_line = lines.next().ok_or(ParseError::Empty)?;
        let parts: Vec<&str> = request_line.split_whitespace().collect();
        let [method, raw_target, version] = parts.as_slice() else {
            return Err(ParseError::RequestLine(request_line.to_string()));
        };

        let version = Version::parse(version)?;
        let target = Target::parse(raw_target)?;

        let mut headers = Headers::new();
        for line in lines {
            // `lines` only strips a CR that precedes LF
            if line.contains('\r') {
                return Err(ParseError::Header(line.to_string()));
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ParseError::Header(line.to_string()))?;
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(ParseError::Header(line.to_string()));
            }
            headers.insert(name, value.trim());
        }

        Ok(Self {
            method: Method::parse(method),
            raw_target: raw_target.to_string(),
            target,
            version,
            headers,
            body: Vec::new(),
            peer_addr: None,
        })
    }

    /// Declared body length; zero when absent.
    pub fn content_length(&self) -> Result<usize, ParseError> {
        match self.headers.get("content-length") {
            None => Ok(0),
            Some(value) => value
                .parse()
                .map_err(|_| ParseError::ContentLength(value.to_string())),
        }
    }

    pub fn path(&self) -> &str {
        &self.target.path
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.target.param(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_browser_request() {
        let head = b"GET /hello/nested?a=1&b=two HTTP/1.1\r\n\
            Host: 127.0.0.1:8080\r\n\
            User-Agent: Mozilla/5.0 (X11; Linux x86_64; rv:146.0) Gecko/20100101 Firefox/146.0\r\n\
            Accept: text/html,*/*;q=0.8\r\n\r\n";

        let request = Request::parse(head).unwrap();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.version, Version::Http11);
        assert_eq!(request.raw_target, "/hello/nested?a=1&b=two");
        assert_eq!(request.path(), "/hello/nested");
        assert_eq!(request.param("a"), Some("1"));
        assert_eq!(request.param("b"), Some("two"));
        assert_eq!(request.headers.get("host"), Some("127.0.0.1:8080"));
        assert_eq!(request.headers.get("user-agent").map(|ua| ua.contains("Firefox")), Some(true));
    }

    #[test]
    fn test_header_value_may_contain_colons() {
        let request = Request::parse(b"GET / HTTP/1.0\r\nReferer: http://x:1/a\r\n").unwrap();
        assert_eq!(request.headers.get("Referer"), Some("http://x:1/a"));
        assert_eq!(request.version, Version::Http10);
    }

    #[test]
    fn test_bare_newlines_are_accepted() {
        let request = Request::parse(b"\r\nPOST /echo HTTP/1.1\nContent-Length: 3\n").unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.content_length(), Ok(3));
    }

    #[test]
    fn test_later_duplicate_header_wins() {
        let request = Request::parse(b"GET / HTTP/1.1\r\nX-A: 1\r\nx-a: 2\r\n").unwrap();
        assert_eq!(request.headers.get("X-A"), Some("2"));
        assert_eq!(request.headers.len(), 1);
    }

    #[test]
    fn test_rejects_malformed_heads() {
        assert_eq!(Request::parse(b"\r\n\r\n").unwrap_err(), ParseError::Empty);
        assert_eq!(Request::parse(&[0xff, 0xfe]).unwrap_err(), ParseError::Encoding);
        assert!(matches!(Request::parse(b"GET /\r\n"), Err(ParseError::RequestLine(_))));
        assert!(matches!(
            Request::parse(b"GET / HTTP/1.1 extra\r\n"),
            Err(ParseError::RequestLine(_))
        ));
        assert!(matches!(Request::parse(b"GET / FTP/1.0\r\n"), Err(ParseError::Version(_))));
        assert!(matches!(
            Request::parse(b"GET / HTTP/1.1\r\nNoColonHere\r\n"),
            Err(ParseError::Header(_))
        ));
        assert!(matches!(
            Request::parse(b"GET / HTTP/1.1\r\nBad Name: x\r\n"),
            Err(ParseError::Header(_))
        ));
    }

    #[test]
    fn test_bare_carriage_return_in_header_is_rejected() {
        let head = b"POST /echo HTTP/1.1\r\nContent-Type: text/plain\rSet-Cookie: evil=1\r\n";
        assert_eq!(
            Request::parse(head).unwrap_err(),
            ParseError::Header("Content-Type: text/plain\rSet-Cookie: evil=1".into())
        );
    }

    #[test]
    fn test_other_methods_and_versions_are_kept() {
        let request = Request::parse(b"BREW /pot HTTP/2\r\n").unwrap();
        assert_eq!(request.method, Method::Other("BREW".into()));
        assert_eq!(request.version.as_str(), "HTTP/2");
        assert!(!request.version.is_http1());
    }

    #[test]
    fn test_target_decoding() {
        let target = Target::parse("/my%20dir/%ED%95%9C.txt?q=a+b&x=%26").unwrap();
        assert_eq!(target.path, "/my dir/한.txt");
        assert_eq!(target.param("q"), Some("a b"));
        assert_eq!(target.param("x"), Some("&"));

        // encoded '?' belongs to the path
        let target = Target::parse("/what%3F?is=this").unwrap();
        assert_eq!(target.path, "/what?");
        assert_eq!(target.param("is"), Some("this"));
    }

    #[test]
    fn test_target_query_edge_cases() {
        assert!(Target::parse("/p?").unwrap().params.is_empty());
        assert_eq!(Target::parse("/p?a=1&&b=").unwrap().params, vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), String::new()),
        ]);
        assert_eq!(Target::parse("/p?a=1&a=2").unwrap().param("a"), Some("2"));
        assert_eq!(
            Target::parse("/p?flag").unwrap_err(),
            ParseError::Query("flag".into())
        );
        assert!(matches!(Target::parse("relative"), Err(ParseError::Target(_))));
        assert!(matches!(Target::parse("/%ff"), Err(ParseError::Target(_))));
    }

    #[test]
    fn test_invalid_content_length() {
        let request = Request::parse(b"POST / HTTP/1.1\r\nContent-Length: lots\r\n").unwrap();
        assert_eq!(
            request.content_length(),
            Err(ParseError::ContentLength("lots".into()))
        );
    }
}
