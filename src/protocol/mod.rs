//! Protocol module - header parsing, framing, and message types.
//!
//! This module implements the wire format for the listener:
//! - Case-insensitive header set scoped to one message
//! - Receive buffer with the header/body state machine
//! - Decoded `Frame` type and the encode-side `build_frame`

mod frame;
mod frame_buffer;
mod headers;

pub use frame::{build_frame, Frame};
pub use frame_buffer::{
    FrameBuffer, FrameEvent, DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_HEADER_LINE,
};
pub use headers::{Headers, CONTENT_LENGTH};
