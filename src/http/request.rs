use crate::http::headers::{Headers, find_crlf};
use crate::http::parser::ParseError;

const SUPPORTED_VERSION: &str = "1.1";

/// The `method target HTTP/version` triple at the start of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// Upper-case method token (e.g. `GET`)
    pub method: String,
    /// Request target as sent by the client (e.g. `/index.html?x=1`)
    pub target: String,
    /// Version number without the `HTTP/` prefix; always `1.1`
    pub version: String,
}

/// A fully parsed HTTP request.
///
/// Produced by [`crate::http::parser::RequestParser`] once it reaches the
/// `Done` state; the headers and body are read-only from then on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub line: RequestLine,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Request {
    pub fn method(&self) -> &str {
        &self.line.method
    }

    pub fn target(&self) -> &str {
        &self.line.target
    }

    /// Retrieves a header value by name (case-insensitive).
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }
}

/// Parses the request line from the front of `buf`.
///
/// Returns `Ok(None)` until a full CRLF-terminated line is buffered. The
/// consumed length includes the CRLF.
pub fn parse_request_line(buf: &[u8]) -> Result<Option<(RequestLine, usize)>, ParseError> {
    let Some(idx) = find_crlf(buf) else {
        return Ok(None);
    };

    let line = std::str::from_utf8(&buf[..idx]).map_err(|_| ParseError::MalformedRequestLine)?;
    let request_line = request_line_from_str(line)?;

    Ok(Some((request_line, idx + 2)))
}

fn request_line_from_str(line: &str) -> Result<RequestLine, ParseError> {
    let parts: Vec<&str> = line.split(' ').collect();
    let [method, target, version] = parts[..] else {
        return Err(ParseError::MalformedRequestLine);
    };

    if target.is_empty() {
        return Err(ParseError::MalformedRequestLine);
    }

    if method.is_empty() || !method.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(ParseError::InvalidMethod(method.to_string()));
    }

    match version.split('/').collect::<Vec<_>>()[..] {
        ["HTTP", SUPPORTED_VERSION] => {}
        _ => return Err(ParseError::UnsupportedVersion(version.to_string())),
    }

    Ok(RequestLine {
        method: method.to_string(),
        target: target.to_string(),
        version: SUPPORTED_VERSION.to_string(),
    })
}
