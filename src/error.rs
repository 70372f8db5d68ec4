//! Error types for framewire.

use thiserror::Error;

/// Main error type for all framewire operations.
#[derive(Debug, Error)]
pub enum FramewireError {
    /// I/O error while receiving from the underlying stream.
    ///
    /// Always fatal to the read loop; the reader never retries internally.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol violation (malformed header line, bad `Content-Length`,
    /// framing limit exceeded).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Message body was not valid UTF-8.
    ///
    /// The offending message is dropped; the stream stays aligned because
    /// the body bytes were already consumed.
    #[error("Body encoding error: {0}")]
    BodyEncoding(#[from] std::string::FromUtf8Error),

    /// A message handler panicked. Isolated per message; the read loop
    /// continues.
    #[error("Handler fault: {0}")]
    Handler(String),

    /// Misuse of the reader lifecycle (`start` without `bind`, double
    /// `start`, etc.). Surfaced synchronously to the violating caller.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias using FramewireError.
pub type Result<T> = std::result::Result<T, FramewireError>;
