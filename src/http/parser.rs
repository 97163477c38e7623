//! HTTP message parsing
//!
//! The framer hands over complete header blocks, so parsing here is a pure
//! function of the header text. Request validation follows a fixed rule
//! order and the first failing rule decides the error.

use super::{
    Error, Headers, HttpRequest, Method, Result, Status, Version, CRLF, HTTP_VERSION,
};

/// A validated request line plus its headers, waiting for its body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: Method,
    pub target: String,
    pub headers: Headers,
}

impl RequestHead {
    /// Declared body length, if any
    pub fn content_length(&self) -> Result<Option<usize>> {
        content_length(&self.headers)
    }

    /// Attach the body and freeze the request
    pub fn into_request(self, body: Vec<u8>) -> HttpRequest {
        HttpRequest::builder()
            .method(self.method)
            .target(self.target)
            .headers(self.headers)
            .body(body)
            .build()
    }
}

/// Parse the `Content-Length` header, if present
pub fn content_length(headers: &Headers) -> Result<Option<usize>> {
    headers
        .get("Content-Length")
        .map(|v| {
            v.trim()
                .parse::<usize>()
                .map_err(|_| Error::BadRequest(format!("Invalid Content-Length: {}", v)))
        })
        .transpose()
}

/// Check the whitespace-separated tokens of a request line.
///
/// Rules, in order:
/// 1. at least three tokens
/// 2. method is GET, HEAD, PUT or POST
/// 3. version is exactly `HTTP/1.1`
/// 4. PUT and POST targets contain a single `/`
pub fn is_valid_http_request(tokens: &[&str]) -> bool {
    check_request_tokens(tokens).is_ok()
}

fn check_request_tokens(tokens: &[&str]) -> Result<Method> {
    if tokens.len() < 3 {
        return Err(Error::BadRequest(format!(
            "request line has {} tokens",
            tokens.len()
        )));
    }

    let method: Method = tokens[0]
        .parse()
        .map_err(|_| Error::BadRequest(format!("unsupported method {}", tokens[0])))?;

    if tokens[2] != HTTP_VERSION {
        return Err(Error::BadRequest(format!("unsupported version {}", tokens[2])));
    }

    if method.is_write() && tokens[1].matches('/').count() > 1 {
        return Err(Error::BadRequest(format!(
            "nested target {} for {}",
            tokens[1], method
        )));
    }

    Ok(method)
}

/// Parse and validate a request line.
///
/// On top of [`is_valid_http_request`] the target must be origin-form and
/// may not contain `..` segments.
pub fn parse_request_line(line: &str) -> Result<(Method, String)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let method = check_request_tokens(&tokens)?;
    let target = tokens[1];

    if !target.starts_with('/') {
        return Err(Error::BadRequest(format!("target {} is not a path", target)));
    }

    if target.split('/').any(|segment| segment == "..") {
        return Err(Error::BadRequest(format!("target {} escapes the root", target)));
    }

    Ok((method, target.to_string()))
}

/// Parse a request header block (terminator excluded)
pub fn parse_request_head(head: &str) -> Result<RequestHead> {
    let mut lines = head.split(CRLF);
    let line = lines.next().unwrap_or_default();
    let (method, target) = parse_request_line(line)?;

    let headers = Headers::parse_lines(lines)
        .map_err(|e| Error::BadRequest(e.to_string()))?;

    Ok(RequestHead {
        method,
        target,
        headers,
    })
}

/// Close decision for a header block, valid or not.
///
/// Looks at the last `Connection:` header line; the request line is not
/// inspected, so a rejected request closes the same way a valid one would.
pub fn wants_close(head: &str) -> bool {
    head.split(CRLF)
        .skip(1)
        .filter_map(|line| Headers::parse_header_line(line).ok())
        .filter(|(name, _)| name == "Connection")
        .last()
        .is_some_and(|(_, value)| value == "close")
}

/// Body length announced by a header block whose request line may be
/// invalid. Used to keep the stream framed after a rejection.
pub fn declared_length(head: &str) -> Option<usize> {
    head.split(CRLF)
        .skip(1)
        .filter_map(|line| Headers::parse_header_line(line).ok())
        .filter(|(name, _)| name == "Content-Length")
        .last()
        .and_then(|(_, value)| value.parse().ok())
}

/// Parse HTTP response status line
///
/// Format: VERSION STATUS REASON
/// Example: HTTP/1.1 200 OK
pub fn parse_status_line(line: &str) -> Result<(Version, Status, String)> {
    let parts: Vec<&str> = line.splitn(3, ' ').collect();

    if parts.len() < 2 {
        return Err(Error::Parse(format!(
            "Invalid status line: expected at least 2 parts, got {}",
            parts.len()
        )));
    }

    let version: Version = parts[0].parse()?;
    let status_code = parts[1]
        .parse::<u16>()
        .map_err(|_| Error::Parse(format!("Invalid status code: {}", parts[1])))?;
    let status = Status::new(status_code)?;
    let reason = match parts.get(2) {
        Some(reason) => reason.to_string(),
        None => status.reason_phrase().to_string(),
    };

    Ok((version, status, reason))
}

/// Parsed response head
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub version: Version,
    pub status: Status,
    pub reason: String,
    pub headers: Headers,
}

/// Parse a response header block (terminator excluded).
///
/// Header lines without a colon are skipped; origins in the wild send them.
pub fn parse_response_head(head: &str) -> Result<ResponseHead> {
    let mut lines = head.split(CRLF);
    let (version, status, reason) = parse_status_line(lines.next().unwrap_or_default())?;

    let headers = lines
        .filter_map(|line| Headers::parse_header_line(line).ok())
        .collect();

    Ok(ResponseHead {
        version,
        status,
        reason,
        headers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_request_tokens() {
        assert!(is_valid_http_request(&["GET", "/", "HTTP/1.1"]));
        assert!(is_valid_http_request(&["HEAD", "/a/b/c.png", "HTTP/1.1"]));
        assert!(is_valid_http_request(&["PUT", "/new.html", "HTTP/1.1"]));
        assert!(is_valid_http_request(&["GET", "/", "HTTP/1.1", "extra"]));
    }

    #[test]
    fn test_invalid_request_tokens() {
        assert!(!is_valid_http_request(&["GET", "/"]));
        assert!(!is_valid_http_request(&["DELETE", "/", "HTTP/1.1"]));
        assert!(!is_valid_http_request(&["GET", "/", "HTTP/1.0"]));
        assert!(!is_valid_http_request(&["POST", "/dir/new.html", "HTTP/1.1"]));
        assert!(!is_valid_http_request(&["PUT", "//", "HTTP/1.1"]));
    }

    #[test]
    fn test_disconnect_sentinel_is_rejected() {
        assert!(matches!(
            parse_request_head("DISCONNECT"),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn test_parse_request_head() {
        let head = parse_request_head(
            "GET /index.html HTTP/1.1\r\nHost: localhost\r\nIf-Modified-Since: Thu, 18 Mar 2021 20:44:30 GMT",
        )
        .unwrap();

        assert_eq!(head.method, Method::Get);
        assert_eq!(head.target, "/index.html");
        assert_eq!(head.headers.get("Host"), Some("localhost"));
        assert_eq!(
            head.headers.get("If-Modified-Since"),
            Some("Thu, 18 Mar 2021 20:44:30 GMT")
        );
    }

    #[test]
    fn test_parse_request_head_rejects_bad_targets() {
        assert!(parse_request_head("GET index.html HTTP/1.1").is_err());
        assert!(parse_request_head("GET /../secret HTTP/1.1").is_err());
    }

    #[test]
    fn test_parse_request_head_rejects_bad_header_line() {
        assert!(matches!(
            parse_request_head("GET / HTTP/1.1\r\nno colon here"),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn test_content_length() {
        let head = parse_request_head("PUT /a.html HTTP/1.1\r\nContent-Length: 12").unwrap();
        assert_eq!(head.content_length().unwrap(), Some(12));

        let head = parse_request_head("PUT /a.html HTTP/1.1\r\nContent-Length: twelve").unwrap();
        assert!(head.content_length().is_err());

        let head = parse_request_head("GET / HTTP/1.1").unwrap();
        assert_eq!(head.content_length().unwrap(), None);
    }

    #[test]
    fn test_wants_close() {
        assert!(wants_close("GET / HTTP/1.1\r\nConnection: close"));
        assert!(wants_close("BROKEN\r\nConnection:   close  "));
        assert!(!wants_close("GET / HTTP/1.1\r\nConnection: keep-alive"));
        assert!(!wants_close("GET / HTTP/1.1"));
        assert!(!wants_close("GET / HTTP/1.1\r\nConnection: close\r\nConnection: keep-alive"));
    }

    #[test]
    fn test_declared_length_ignores_request_line() {
        assert_eq!(declared_length("FETCH / HTTP/1.1\r\nContent-Length: 5"), Some(5));
        assert_eq!(declared_length("FETCH / HTTP/1.1\r\nContent-Length: x"), None);
        assert_eq!(declared_length("DISCONNECT"), None);
    }

    #[test]
    fn test_parse_status_line() {
        let (version, status, reason) = parse_status_line("HTTP/1.1 304 Not Modified").unwrap();
        assert_eq!(version, Version::Http11);
        assert_eq!(status, Status::NOT_MODIFIED);
        assert_eq!(reason, "Not Modified");

        let (_, status, reason) = parse_status_line("HTTP/1.0 200").unwrap();
        assert_eq!(status, Status::OK);
        assert_eq!(reason, "OK");

        assert!(parse_status_line("garbage").is_err());
    }

    #[test]
    fn test_parse_response_head_skips_junk_lines() {
        let head = parse_response_head(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=UTF-8\r\njunk\r\nContent-Length: 3",
        )
        .unwrap();

        assert_eq!(head.status, Status::OK);
        assert_eq!(head.headers.len(), 2);
        assert_eq!(head.headers.get("Content-Length"), Some("3"));
    }
}
