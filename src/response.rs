//! Parsed response data and the public [`Response`] type.

use std::borrow::Cow;
use std::time::Duration;

use bytes::Bytes;

use crate::header::{self, Header};
use crate::status::StatusLine;

/// The record built up by the response parser for one exchange.
///
/// Owned by the parser while the exchange runs, then moved into the
/// [`Response`]. When an exchange is stopped early through a progress
/// callback, later fields simply keep their defaults.
#[derive(Debug, Default)]
pub struct ParsedResponse {
    /// Parsed status line.
    pub status_line: StatusLine,
    /// Raw header block, up to but not including the terminating blank line.
    pub headers_string: String,
    /// Decoded header fields, in the order they appeared.
    pub headers: Vec<Header>,
    /// The response body.
    pub body_data: Bytes,
}

/// Read-only access to the parsed parts of a response.
///
/// Implemented by [`Response`] and by the progress events that expose the
/// response while it is still being received, so the same accessors work
/// everywhere.
pub trait ParsedHeaders {
    /// The underlying parsed record.
    fn parsed_response(&self) -> &ParsedResponse;

    /// Returns the status code from the status line; `0` when unparseable.
    fn get_status_code(&self) -> u16 {
        self.parsed_response().status_line.status_code
    }

    /// Returns the reason phrase from the status line.
    fn get_status_message(&self) -> &str {
        &self.parsed_response().status_line.status_message
    }

    /// Returns the HTTP version token from the status line.
    fn get_http_version(&self) -> &str {
        &self.parsed_response().status_line.http_version
    }

    /// Returns the parsed status line.
    fn get_status_line(&self) -> &StatusLine {
        &self.parsed_response().status_line
    }

    /// Returns the raw header block as received.
    fn get_headers_string(&self) -> &str {
        &self.parsed_response().headers_string
    }

    /// Returns the decoded headers, in order.
    fn get_headers(&self) -> &[Header] {
        &self.parsed_response().headers
    }

    /// Returns a header by name, ASCII case-insensitively.
    fn get_header(&self, name: &str) -> Option<&Header> {
        header::find_header(&self.parsed_response().headers, name)
    }

    /// Returns a header value by name, ASCII case-insensitively.
    fn get_header_value(&self, name: &str) -> Option<&str> {
        self.get_header(name).map(|h| h.value.as_str())
    }
}

impl ParsedHeaders for ParsedResponse {
    fn parsed_response(&self) -> &ParsedResponse {
        self
    }
}

/// The response of an HTTP request.
///
/// Immutable once constructed; moved to the caller (or carried inside a
/// [`ResponseFuture`][crate::ResponseFuture]) when the exchange finishes.
#[derive(Debug)]
pub struct Response {
    parsed: ParsedResponse,
    url: String,
    total_time: Duration,
}

impl Response {
    pub(crate) fn new(parsed: ParsedResponse, url: String, total_time: Duration) -> Response {
        Response {
            parsed,
            url,
            total_time,
        }
    }

    /// Returns the body of the response.
    pub fn get_body(&self) -> &[u8] {
        &self.parsed.body_data
    }

    /// Returns the body of the response as text.
    ///
    /// Invalid UTF-8 sequences are replaced, not rejected.
    pub fn get_body_string(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.get_body())
    }

    /// Returns the URL the request was sent to, after URI encoding.
    pub fn get_url(&self) -> &str {
        &self.url
    }

    /// Returns the wall-clock time from just before the socket was opened
    /// until the response completed.
    pub fn get_total_time(&self) -> Duration {
        self.total_time
    }
}

impl ParsedHeaders for Response {
    fn parsed_response(&self) -> &ParsedResponse {
        &self.parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ParsedResponse {
        ParsedResponse {
            status_line: StatusLine {
                http_version: "HTTP/1.1".to_owned(),
                status_code: 200,
                status_message: "OK".to_owned(),
            },
            headers_string: "HTTP/1.1 200 OK\r\nContent-Length: 5".to_owned(),
            headers: vec![Header::new("Content-Length", "5")],
            body_data: Bytes::from_static(b"hello"),
        }
    }

    #[test]
    fn accessors_delegate() {
        let response = Response::new(sample(), "http://x/".to_owned(), Duration::from_millis(3));
        assert_eq!(response.get_status_code(), 200);
        assert_eq!(response.get_status_message(), "OK");
        assert_eq!(response.get_http_version(), "HTTP/1.1");
        assert_eq!(response.get_header_value("content-length"), Some("5"));
        assert_eq!(response.get_body_string(), "hello");
        assert_eq!(response.get_url(), "http://x/");
        assert_eq!(response.get_total_time(), Duration::from_millis(3));
    }

    #[test]
    fn header_lookup_any_case() {
        let parsed = sample();
        assert_eq!(
            parsed.get_header("CONTENT-LENGTH"),
            parsed.get_header("content-length")
        );
    }
}
