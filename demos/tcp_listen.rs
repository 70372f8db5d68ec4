//! Framed TCP listener - accepts one connection and prints every message.
//!
//! This example demonstrates:
//! - Building a reader with the fluent API
//! - Binding an accepted TCP stream and starting the read loop
//! - Observing termination through the close callback
//!
//! # Driving it from a shell
//!
//! ```sh
//! cargo run --example tcp_listen
//!
//! # in another terminal:
//! printf 'Content-Length: 5\r\n\r\nhello' | nc 127.0.0.1 4711
//! ```

use framewire::FrameReader;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:4711").await?;
    println!("listening on {}", listener.local_addr()?);

    let (stream, peer) = listener.accept().await?;
    println!("connection from {}", peer);

    let (done_tx, done_rx) = oneshot::channel();
    let reader = FrameReader::builder()
        .on_frame(|frame| {
            println!("[{} header(s), {} byte body] {}", frame.headers.len(), frame.body_len(), frame.body);
        })
        .on_close(move || {
            let _ = done_tx.send(());
        })
        .build()?;

    reader.bind(stream)?;
    reader.start()?;

    done_rx.await?;
    println!("connection closed");
    Ok(())
}
