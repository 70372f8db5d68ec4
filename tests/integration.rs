//! Integration tests for framewire.
//!
//! These tests exercise the full path: wire bytes in, decoded messages out
//! of a running reader, across in-memory duplex streams and real TCP.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{duplex, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use framewire::{build_frame, Frame, FrameReader, Headers};

const WAIT: Duration = Duration::from_secs(5);

/// Run a reader over an in-memory stream, write the given chunks, close the
/// write side, and collect everything that was delivered.
async fn deliver_chunks(chunks: Vec<Vec<u8>>) -> Vec<Frame> {
    let (frame_tx, mut frames) = mpsc::unbounded_channel();
    let (close_tx, mut closed) = mpsc::unbounded_channel();
    let reader = FrameReader::builder()
        .on_frame(move |frame| {
            let _ = frame_tx.send(frame);
        })
        .on_close(move || {
            let _ = close_tx.send(());
        })
        .build()
        .unwrap();

    let (mut client, server) = duplex(4096);
    reader.bind(server).unwrap();
    reader.start().unwrap();

    for chunk in chunks {
        client.write_all(&chunk).await.unwrap();
        client.flush().await.unwrap();
    }
    drop(client);

    assert!(timeout(WAIT, closed.recv()).await.unwrap().is_some());

    let mut delivered = Vec::new();
    while let Ok(frame) = frames.try_recv() {
        delivered.push(frame);
    }
    delivered
}

/// Encoded test stream: three messages back-to-back.
fn three_message_stream() -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut headers = Headers::new();
    headers.insert("X-Seq", "1");
    bytes.extend_from_slice(&build_frame(&headers, "first"));
    bytes.extend_from_slice(b"X-Seq: 2\r\n\r\n");
    let mut headers = Headers::new();
    headers.insert("X-Seq", "3");
    bytes.extend_from_slice(&build_frame(&headers, "third"));
    bytes
}

#[tokio::test]
async fn test_back_to_back_messages_in_one_write() {
    let frames = deliver_chunks(vec![three_message_stream()]).await;

    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].body, "first");
    assert_eq!(frames[1].body, "");
    assert_eq!(frames[2].body, "third");
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame.header("x-seq"), Some((i + 1).to_string().as_str()));
    }
}

#[tokio::test]
async fn test_fragmented_delivery_matches_unfragmented() {
    let bytes = three_message_stream();

    let whole = deliver_chunks(vec![bytes.clone()]).await;
    for size in [1, 2, 5, 13] {
        let split = deliver_chunks(bytes.chunks(size).map(|c| c.to_vec()).collect()).await;
        assert_eq!(split, whole, "chunk size {size}");
    }
}

#[tokio::test]
async fn test_json_bodies_end_to_end() {
    let payload = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": { "capabilities": {} },
    });
    let mut headers = Headers::new();
    headers.insert("Content-Type", "application/vscode-jsonrpc; charset=utf-8");
    let bytes = build_frame(&headers, &payload.to_string());

    let frames = deliver_chunks(vec![bytes]).await;

    assert_eq!(frames.len(), 1);
    let decoded: serde_json::Value = serde_json::from_str(&frames[0].body).unwrap();
    assert_eq!(decoded, payload);
    assert_eq!(
        frames[0].header("content-type"),
        Some("application/vscode-jsonrpc; charset=utf-8")
    );
}

#[tokio::test]
async fn test_malformed_message_does_not_poison_the_stream() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"Content-Length: oops\r\n\r\n");
    bytes.extend_from_slice(&build_frame(&Headers::new(), "survivor"));

    let frames = deliver_chunks(vec![bytes]).await;

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].body, "survivor");
}

#[tokio::test]
async fn test_truncated_body_is_never_delivered() {
    let frames = deliver_chunks(vec![b"Content-Length: 100\r\n\r\nonly a little".to_vec()]).await;
    assert!(frames.is_empty());
}

#[tokio::test]
async fn test_tcp_end_to_end() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let peer = tokio::spawn(async move {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(&build_frame(&Headers::new(), "over tcp"))
            .await
            .unwrap();
        stream.shutdown().await.unwrap();
    });

    let (stream, _) = listener.accept().await.unwrap();

    let (frame_tx, mut frames) = mpsc::unbounded_channel();
    let (close_tx, mut closed) = mpsc::unbounded_channel();
    let reader = FrameReader::builder()
        .on_frame(move |frame| {
            let _ = frame_tx.send(frame);
        })
        .on_close(move || {
            let _ = close_tx.send(());
        })
        .build()
        .unwrap();
    reader.bind(stream).unwrap();
    reader.start().unwrap();

    let frame = timeout(WAIT, frames.recv()).await.unwrap().unwrap();
    assert_eq!(frame.body, "over tcp");
    assert!(timeout(WAIT, closed.recv()).await.unwrap().is_some());

    peer.await.unwrap();
}

#[tokio::test]
async fn test_concurrent_stop_during_active_stream() {
    let (frame_tx, mut frames) = mpsc::unbounded_channel();
    let closes = Arc::new(AtomicUsize::new(0));
    let closes_seen = closes.clone();
    let (done_tx, done_rx) = oneshot::channel();
    let reader = FrameReader::builder()
        .on_frame(move |frame| {
            let _ = frame_tx.send(frame);
        })
        .on_close(move || {
            closes_seen.fetch_add(1, Ordering::SeqCst);
            let _ = done_tx.send(());
        })
        .build()
        .unwrap();

    let (mut client, server) = duplex(1024);
    reader.bind(server).unwrap();
    reader.start().unwrap();

    // Keep writing until the reader tears the stream down.
    let writer = tokio::spawn(async move {
        let mut seq = 0u64;
        loop {
            let mut headers = Headers::new();
            headers.insert("X-Seq", &seq.to_string());
            if client.write_all(&build_frame(&headers, "tick")).await.is_err() {
                break;
            }
            seq += 1;
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    });

    for _ in 0..5 {
        assert!(timeout(WAIT, frames.recv()).await.unwrap().is_some());
    }

    let stopper = {
        let reader = reader.clone();
        tokio::spawn(async move { reader.stop() })
    };
    stopper.await.unwrap();

    timeout(WAIT, done_rx).await.unwrap().unwrap();
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    writer.await.unwrap();
}
