//! Decoded message type and wire-format encoding.
//!
//! A frame on the wire is a CRLF-separated header block terminated by a
//! blank line, followed by exactly `Content-Length` body bytes:
//!
//! ```text
//! Content-Length: 5\r\n
//! X-Request-Kind: event\r\n
//! \r\n
//! hello
//! ```
//!
//! Frames repeat back-to-back on the stream with no extra delimiter.

use super::headers::{Headers, CONTENT_LENGTH};

/// Line terminator for header lines; a bare CRLF ends the header block.
pub(crate) const CRLF: &[u8] = b"\r\n";

/// A complete decoded message: one header block plus its body.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Headers of the message, matched case-insensitively.
    pub headers: Headers,
    /// Body text, exactly `Content-Length` bytes decoded as UTF-8.
    pub body: String,
}

impl Frame {
    /// Create a frame from headers and body.
    pub fn new(headers: Headers, body: impl Into<String>) -> Self {
        Self {
            headers,
            body: body.into(),
        }
    }

    /// Case-insensitive header lookup.
    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Body length in bytes.
    #[inline]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }
}

/// Build the wire bytes for a message.
///
/// Emits a `Content-Length` header computed from the body, any additional
/// headers, the blank line, and the body bytes. A `Content-Length` entry in
/// `headers` is ignored in favor of the computed value.
///
/// # Example
///
/// ```
/// use framewire::{build_frame, Headers};
///
/// let bytes = build_frame(&Headers::new(), "hello");
/// assert_eq!(bytes, b"Content-Length: 5\r\n\r\nhello");
/// ```
pub fn build_frame(headers: &Headers, body: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(body.len() + 64);
    buf.extend_from_slice(CONTENT_LENGTH.as_bytes());
    buf.extend_from_slice(b": ");
    buf.extend_from_slice(body.len().to_string().as_bytes());
    buf.extend_from_slice(CRLF);
    for (name, value) in headers.iter() {
        if name.eq_ignore_ascii_case(CONTENT_LENGTH) {
            continue;
        }
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(CRLF);
    }
    buf.extend_from_slice(CRLF);
    buf.extend_from_slice(body.as_bytes());
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_accessors() {
        let mut headers = Headers::new();
        headers.insert("X-Foo", "bar");
        let frame = Frame::new(headers, "hello");

        assert_eq!(frame.header("x-foo"), Some("bar"));
        assert_eq!(frame.body, "hello");
        assert_eq!(frame.body_len(), 5);
    }

    #[test]
    fn test_build_frame_minimal() {
        let bytes = build_frame(&Headers::new(), "hello");
        assert_eq!(bytes, b"Content-Length: 5\r\n\r\nhello");
    }

    #[test]
    fn test_build_frame_empty_body() {
        let bytes = build_frame(&Headers::new(), "");
        assert_eq!(bytes, b"Content-Length: 0\r\n\r\n");
    }

    #[test]
    fn test_build_frame_extra_headers() {
        let mut headers = Headers::new();
        headers.insert("X-Kind", "event");
        let bytes = build_frame(&headers, "ok");
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("Content-Length: 2\r\n"));
        assert!(text.contains("x-kind: event\r\n"));
        assert!(text.ends_with("\r\n\r\nok"));
    }

    #[test]
    fn test_build_frame_ignores_stale_content_length() {
        let mut headers = Headers::new();
        headers.insert(CONTENT_LENGTH, "999");
        let bytes = build_frame(&headers, "abc");
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.contains("Content-Length: 3\r\n"));
        assert!(!text.contains("999"));
    }
}
