//! # framewire
//!
//! Framed-message listener for header-delimited wire protocols.
//!
//! Reads a continuous byte stream from a socket, splits it into discrete
//! messages framed by a textual header block (`Name: Value` lines
//! terminated by a blank line) followed by a body whose length is declared
//! by a `Content-Length` header, and hands each decoded message to a
//! caller-supplied handler. This is the framing style used by debug
//! adapters and language servers.
//!
//! ## Architecture
//!
//! - **Protocol layer**: case-insensitive [`Headers`], the [`FrameBuffer`]
//!   state machine that reassembles messages from arbitrarily fragmented
//!   reads, and the decoded [`Frame`]
//! - **Reader**: [`FrameReader`] runs the read loop on its own task,
//!   dispatches messages in wire order, and reports termination exactly once
//!
//! ## Example
//!
//! ```ignore
//! use framewire::FrameReader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stream = tokio::net::TcpStream::connect("127.0.0.1:4711").await?;
//!
//!     let reader = FrameReader::builder()
//!         .on_frame(|frame| println!("body: {}", frame.body))
//!         .on_close(|| println!("connection closed"))
//!         .build()?;
//!
//!     reader.bind(stream)?;
//!     reader.start()?;
//!     // reader.stop() may be called from any thread to tear down.
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod protocol;

mod reader;

pub use error::{FramewireError, Result};
pub use protocol::{
    build_frame, Frame, FrameBuffer, FrameEvent, Headers, CONTENT_LENGTH,
    DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_HEADER_LINE,
};
pub use reader::{FrameReader, FrameReaderBuilder, ReaderConfig, DEFAULT_READ_CHUNK_SIZE};
