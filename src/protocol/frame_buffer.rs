//! Receive buffer and framing state machine.
//!
//! Accumulates raw socket bytes and extracts complete messages. Handles
//! arbitrary fragmentation: data may arrive one byte at a time or as many
//! messages in a single read, and the extracted sequence is identical.
//!
//! Two states per message:
//! - `Headers`: scan buffered bytes one CRLF line at a time; an empty line
//!   ends the header block
//! - `Body`: wait until the declared `Content-Length` bytes are buffered
//!
//! Consumed lines and bodies are split off the front of the buffer, and an
//! explicit `scanned` cursor remembers how far the remaining bytes have been
//! searched for a line boundary, so no byte is ever scanned twice and memory
//! stays bounded by the largest single message plus one read chunk.

use bytes::BytesMut;

use super::frame::{Frame, CRLF};
use super::headers::{Headers, CONTENT_LENGTH};
use crate::error::{FramewireError, Result};

/// Default maximum body size (64 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

/// Default maximum length of a single header line (8 KB).
pub const DEFAULT_MAX_HEADER_LINE: usize = 8 * 1024;

/// Initial buffer capacity.
const INITIAL_CAPACITY: usize = 4 * 1024;

/// State machine for message parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Scanning header lines of the current message.
    Headers,
    /// Header block complete, waiting for the declared body bytes.
    Body { declared: usize },
}

/// One outcome of feeding bytes into the buffer.
#[derive(Debug)]
pub enum FrameEvent {
    /// A complete, well-formed message.
    Frame(Frame),
    /// A recoverable protocol violation. The offending message was dropped
    /// and scanning resumes at the next message boundary.
    Error(FramewireError),
}

/// Buffer for accumulating incoming bytes and extracting complete messages.
///
/// # Example
///
/// ```
/// use framewire::{FrameBuffer, FrameEvent};
///
/// let mut buffer = FrameBuffer::new();
/// let events = buffer.push(b"Content-Length: 5\r\n\r\nhello").unwrap();
///
/// match &events[0] {
///     FrameEvent::Frame(frame) => assert_eq!(frame.body, "hello"),
///     FrameEvent::Error(e) => panic!("unexpected error: {e}"),
/// }
/// ```
pub struct FrameBuffer {
    /// Bytes received but not yet consumed.
    buffer: BytesMut,
    /// How far `buffer` has been searched for a CRLF. Bytes before this
    /// offset are known to contain no line boundary.
    scanned: usize,
    /// Current parsing state.
    state: State,
    /// Headers accumulated for the current message.
    headers: Headers,
    /// Set when the current message hit a recoverable violation; its bytes
    /// are still consumed for realignment but it is not delivered.
    dropped: bool,
    /// Maximum allowed declared body length.
    max_body_size: usize,
    /// Maximum length of an unterminated header line.
    max_header_line: usize,
}

impl FrameBuffer {
    /// Create a frame buffer with default limits.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_HEADER_LINE)
    }

    /// Create a frame buffer with custom body and header-line limits.
    pub fn with_limits(max_body_size: usize, max_header_line: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
            scanned: 0,
            state: State::Headers,
            headers: Headers::new(),
            dropped: false,
            max_body_size,
            max_header_line,
        }
    }

    /// Feed received bytes and extract everything that completes.
    ///
    /// Recoverable protocol violations are reported inline as
    /// [`FrameEvent::Error`] and scanning continues. An `Err` return means
    /// the stream cannot be realigned to a message boundary (declared body
    /// over the size limit, or an endless header line) and the connection
    /// must be torn down.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<FrameEvent>> {
        self.buffer.extend_from_slice(data);

        let mut events = Vec::new();
        while self.advance(&mut events)? {}
        Ok(events)
    }

    /// Number of buffered, unconsumed bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer holds no unconsumed bytes.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Run one state-machine step.
    ///
    /// Returns `Ok(false)` when more data is needed to make progress.
    fn advance(&mut self, events: &mut Vec<FrameEvent>) -> Result<bool> {
        match self.state {
            State::Headers => self.scan_header_line(events),
            State::Body { declared } => Ok(self.take_body(declared, events)),
        }
    }

    /// Consume one header line if a full line is buffered.
    fn scan_header_line(&mut self, events: &mut Vec<FrameEvent>) -> Result<bool> {
        let Some(pos) = self.find_line_end() else {
            // Everything buffered is one unterminated line; remember how far
            // we searched so those bytes are never scanned again.
            self.scanned = self.buffer.len().saturating_sub(1);
            if self.buffer.len() > self.max_header_line {
                return Err(FramewireError::Protocol(format!(
                    "header line exceeds {} bytes without a terminator",
                    self.max_header_line
                )));
            }
            return Ok(false);
        };

        let line = self.buffer.split_to(pos + CRLF.len());
        self.scanned = 0;
        let line = &line[..pos];

        if line.is_empty() {
            // Blank line ends the header block.
            let declared = self.declared_body_length(events)?;
            self.state = State::Body { declared };
        } else {
            self.parse_header_line(line, events);
        }
        Ok(true)
    }

    /// Find the next CRLF at or after the scan cursor.
    fn find_line_end(&self) -> Option<usize> {
        let from = self.scanned;
        self.buffer[from..]
            .windows(CRLF.len())
            .position(|w| w == CRLF)
            .map(|i| i + from)
    }

    /// Split a header line on the first colon and upsert it.
    fn parse_header_line(&mut self, line: &[u8], events: &mut Vec<FrameEvent>) {
        let Ok(text) = std::str::from_utf8(line) else {
            self.poison(events, "header line is not valid UTF-8".to_string());
            return;
        };
        match text.split_once(':') {
            Some((name, value)) => self.headers.insert(name, value),
            None => self.poison(events, format!("header line {text:?} has no colon")),
        }
    }

    /// Resolve the body length declared by the completed header block.
    ///
    /// A missing header means an empty body. A malformed value is a
    /// recoverable violation: the message is dropped and the body treated as
    /// zero-length. A well-formed value above the limit is unrecoverable.
    fn declared_body_length(&mut self, events: &mut Vec<FrameEvent>) -> Result<usize> {
        let declared = match self.headers.content_length() {
            None => 0,
            Some(Ok(n)) => n,
            Some(Err(_)) => {
                let value = self.headers.get(CONTENT_LENGTH).unwrap_or_default().to_string();
                self.poison(events, format!("invalid Content-Length {value:?}"));
                0
            }
        };
        if declared > self.max_body_size {
            return Err(FramewireError::Protocol(format!(
                "declared body length {} exceeds maximum {}",
                declared, self.max_body_size
            )));
        }
        Ok(declared)
    }

    /// Consume the body once enough bytes are buffered and deliver the
    /// message, then reset per-message state.
    fn take_body(&mut self, declared: usize, events: &mut Vec<FrameEvent>) -> bool {
        if self.buffer.len() < declared {
            return false;
        }

        let body = self.buffer.split_to(declared);
        self.scanned = 0;
        let headers = std::mem::take(&mut self.headers);
        let dropped = std::mem::take(&mut self.dropped);
        self.state = State::Headers;

        if !dropped {
            match String::from_utf8(body.to_vec()) {
                Ok(body) => events.push(FrameEvent::Frame(Frame::new(headers, body))),
                Err(e) => events.push(FrameEvent::Error(e.into())),
            }
        }
        true
    }

    /// Mark the current message as dropped, reporting the first violation.
    fn poison(&mut self, events: &mut Vec<FrameEvent>, message: String) {
        if !self.dropped {
            events.push(FrameEvent::Error(FramewireError::Protocol(message)));
            self.dropped = true;
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
