//! Reader lifecycle and the dedicated read loop.
//!
//! The [`FrameReader`] owns the receive side of one connection:
//! 1. Bind a connected stream
//! 2. Start the read loop on its own task
//! 3. Decoded messages arrive through the `on_frame` callback
//! 4. Termination (peer close, I/O error, `stop()`) is observed exactly
//!    once through the `on_close` callback
//!
//! A reader cannot be restarted; create a new instance for a new
//! connection.
//!
//! # Example
//!
//! ```ignore
//! use framewire::FrameReader;
//!
//! let reader = FrameReader::builder()
//!     .on_frame(|frame| println!("got: {}", frame.body))
//!     .on_close(|| println!("connection closed"))
//!     .build()?;
//!
//! reader.bind(stream)?;
//! reader.start()?;
//! // ... later, from any thread:
//! reader.stop();
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;

use crate::error::{FramewireError, Result};
use crate::protocol::{
    Frame, FrameBuffer, FrameEvent, DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_HEADER_LINE,
};

/// Default size of a single receive call.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024;

type BoxedStream = Box<dyn AsyncRead + Unpin + Send>;
type FrameHandler = dyn Fn(Frame) + Send + Sync;
type ErrorHandler = dyn Fn(&FramewireError) + Send + Sync;
type CloseHandler = dyn FnOnce() + Send;

/// Configuration for a reader.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Size of the buffer passed to each receive call.
    pub read_chunk_size: usize,
    /// Maximum allowed declared body length.
    pub max_body_size: usize,
    /// Maximum length of a single header line.
    pub max_header_line: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            max_header_line: DEFAULT_MAX_HEADER_LINE,
        }
    }
}

/// Builder for configuring and creating a [`FrameReader`].
///
/// `on_frame` is required; everything else has defaults. Recoverable
/// protocol errors go to `on_error` (default: a `tracing` warning).
pub struct FrameReaderBuilder {
    config: ReaderConfig,
    on_frame: Option<Box<FrameHandler>>,
    on_error: Option<Box<ErrorHandler>>,
    on_close: Option<Box<CloseHandler>>,
}

impl FrameReaderBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: ReaderConfig::default(),
            on_frame: None,
            on_error: None,
            on_close: None,
        }
    }

    /// Set the message handler, invoked once per decoded message on the
    /// reader's own task, in wire order.
    pub fn on_frame(mut self, handler: impl Fn(Frame) + Send + Sync + 'static) -> Self {
        self.on_frame = Some(Box::new(handler));
        self
    }

    /// Set the diagnostic hook for recoverable protocol errors and the
    /// final fatal error, if any.
    pub fn on_error(mut self, hook: impl Fn(&FramewireError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    /// Set the termination callback, invoked exactly once after the read
    /// loop exits for any reason.
    pub fn on_close(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(callback));
        self
    }

    /// Set the receive chunk size.
    ///
    /// Default: 8 KB.
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.config.read_chunk_size = size;
        self
    }

    /// Set the maximum declared body length. A message declaring more is
    /// fatal to the connection.
    ///
    /// Default: 64 MB.
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Set the maximum header line length.
    ///
    /// Default: 8 KB.
    pub fn max_header_line(mut self, size: usize) -> Self {
        self.config.max_header_line = size;
        self
    }

    /// Build the reader.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if no frame handler was registered.
    pub fn build(self) -> Result<FrameReader> {
        let on_frame = self.on_frame.ok_or_else(|| {
            FramewireError::InvalidState("no frame handler registered".to_string())
        })?;
        let on_error = self.on_error.unwrap_or_else(|| {
            Box::new(|err: &FramewireError| tracing::warn!("Frame reader error: {}", err))
        });
        let (stop_tx, _) = watch::channel(false);

        Ok(FrameReader {
            inner: Arc::new(Inner {
                config: self.config,
                on_frame,
                on_error,
                on_close: Mutex::new(self.on_close),
                stream: Mutex::new(None),
                stop_tx,
                started: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
            }),
        })
    }
}

impl Default for FrameReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state between the reader handle and its read task.
struct Inner {
    config: ReaderConfig,
    on_frame: Box<FrameHandler>,
    on_error: Box<ErrorHandler>,
    on_close: Mutex<Option<Box<CloseHandler>>>,
    /// Bound stream, held between `bind` and `start`. This slot and the
    /// stop flag are the only state touched from outside the read task.
    stream: Mutex<Option<BoxedStream>>,
    stop_tx: watch::Sender<bool>,
    started: AtomicBool,
    stopped: AtomicBool,
}

/// A framed-message listener for one connection.
///
/// Cheaply cloneable; clones share the same reader and any clone may call
/// [`stop`](FrameReader::stop) from any thread.
#[derive(Clone)]
pub struct FrameReader {
    inner: Arc<Inner>,
}

impl FrameReader {
    /// Create a new reader builder.
    pub fn builder() -> FrameReaderBuilder {
        FrameReaderBuilder::new()
    }

    /// Attach a live, already-connected stream. Must be called before
    /// [`start`](FrameReader::start).
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the reader has already been started or
    /// stopped.
    pub fn bind(&self, stream: impl AsyncRead + Unpin + Send + 'static) -> Result<()> {
        let mut slot = self.inner.stream.lock().expect("reader stream lock poisoned");
        if self.inner.stopped.load(Ordering::Acquire) {
            return Err(FramewireError::InvalidState(
                "reader was stopped".to_string(),
            ));
        }
        if self.inner.started.load(Ordering::Acquire) {
            return Err(FramewireError::InvalidState(
                "reader is already running".to_string(),
            ));
        }
        *slot = Some(Box::new(stream));
        Ok(())
    }

    /// Begin the read loop on its own task. Returns immediately; all
    /// message delivery and termination notification happen asynchronously
    /// on that task.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if no stream is bound, or if the reader was
    /// already started or stopped.
    pub fn start(&self) -> Result<()> {
        let stream = {
            let mut slot = self.inner.stream.lock().expect("reader stream lock poisoned");
            if self.inner.stopped.load(Ordering::Acquire) {
                return Err(FramewireError::InvalidState(
                    "reader was stopped".to_string(),
                ));
            }
            if self.inner.started.swap(true, Ordering::AcqRel) {
                return Err(FramewireError::InvalidState(
                    "reader was already started".to_string(),
                ));
            }
            match slot.take() {
                Some(stream) => stream,
                None => {
                    self.inner.started.store(false, Ordering::Release);
                    return Err(FramewireError::InvalidState(
                        "no stream bound".to_string(),
                    ));
                }
            }
        };

        let inner = self.inner.clone();
        let stop_rx = self.inner.stop_tx.subscribe();
        tokio::spawn(read_loop(inner, stream, stop_rx));
        Ok(())
    }

    /// Signal the read loop to stop at the next safe point.
    ///
    /// Callable from any thread at any time; idempotent. A read task
    /// blocked in a receive is promptly unblocked: the pending read is
    /// abandoned and the stream is dropped (closed) on loop exit. A stream
    /// bound but not yet started is dropped here.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);
        self.inner
            .stream
            .lock()
            .expect("reader stream lock poisoned")
            .take();
        self.inner.stop_tx.send_replace(true);
    }
}

/// The dedicated per-connection read loop.
///
/// Blocks on one receive at a time, feeds every chunk through the frame
/// buffer, and dispatches completed messages. Exits on EOF, I/O error,
/// unrecoverable protocol error, or the stop signal, then fires `on_close`
/// exactly once.
async fn read_loop(inner: Arc<Inner>, mut stream: BoxedStream, mut stop_rx: watch::Receiver<bool>) {
    let mut buffer =
        FrameBuffer::with_limits(inner.config.max_body_size, inner.config.max_header_line);
    let mut chunk = vec![0u8; inner.config.read_chunk_size.max(1)];

    loop {
        // A stop issued before this task subscribed leaves no change to
        // observe; the flag itself is authoritative.
        if *stop_rx.borrow() {
            tracing::debug!("Read loop stopped by request");
            break;
        }

        let n = tokio::select! {
            _ = stop_rx.changed() => {
                tracing::debug!("Read loop stopped by request");
                break;
            }
            read = stream.read(&mut chunk) => match read {
                Ok(0) => {
                    tracing::debug!("Peer closed the stream");
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    let err = FramewireError::Io(e);
                    (inner.on_error)(&err);
                    break;
                }
            },
        };

        match buffer.push(&chunk[..n]) {
            Ok(events) => dispatch(&inner, events),
            Err(err) => {
                (inner.on_error)(&err);
                break;
            }
        }
    }

    drop(stream);
    if let Some(on_close) = inner
        .on_close
        .lock()
        .expect("reader close lock poisoned")
        .take()
    {
        on_close();
    }
}

/// Deliver decoded messages and surface recoverable errors.
///
/// A panicking handler is contained per message; framing and handler
/// execution are decoupled failure domains.
fn dispatch(inner: &Inner, events: Vec<FrameEvent>) {
    for event in events {
        match event {
            FrameEvent::Frame(frame) => {
                if let Err(payload) = catch_unwind(AssertUnwindSafe(|| (inner.on_frame)(frame))) {
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "frame handler panicked".to_string());
                    let err = FramewireError::Handler(message);
                    tracing::error!("{}; continuing", err);
                    (inner.on_error)(&err);
                }
            }
            FrameEvent::Error(err) => (inner.on_error)(&err),
        }
    }
}
