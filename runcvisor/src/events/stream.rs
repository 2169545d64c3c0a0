//! Decode loop that republishes runtime telemetry on a bounded channel.

use super::Event;
use super::decoder::{Decoded, EventDecoder};
use crate::errors::{RuncError, RuncResult};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStdout};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Capacity of the event channel. A full channel blocks the decode loop.
pub const EVENT_CHANNEL_CAPACITY: usize = 128;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Why the decode loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamEnd {
    /// Clean end of stream.
    Eof,
    /// Reading the pipe failed.
    ReadFailed,
    /// The caller cancelled the stream.
    Cancelled,
    /// The consumer dropped its receiver.
    ReceiverDropped,
}

/// Spawn the decode task for a telemetry subprocess.
///
/// The channel closes when the stream ends. The child is reaped afterwards,
/// and killed first unless the stream ended cleanly.
pub(crate) fn spawn_event_stream(
    mut child: Child,
    stdout: ChildStdout,
    container_id: String,
    cancel: CancellationToken,
) -> mpsc::Receiver<Event> {
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let end = pump(stdout, tx, &container_id, &cancel).await;
        tracing::debug!(container_id = %container_id, end = ?end, "Event stream closed");

        if end != StreamEnd::Eof
            && let Err(e) = child.start_kill()
        {
            tracing::debug!(container_id = %container_id, error = %e, "Event process already gone");
        }

        match child.wait().await {
            Ok(status) if !status.success() && end == StreamEnd::Eof => {
                tracing::warn!(container_id = %container_id, %status, "Event process exited unsuccessfully");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(container_id = %container_id, error = %e, "Failed to reap event process");
            }
        }
    });

    rx
}

/// Decode `reader` into `tx` until the stream ends.
///
/// Consumes the sender, so the channel is closed when this returns.
pub(crate) async fn pump<R>(
    mut reader: R,
    tx: mpsc::Sender<Event>,
    container_id: &str,
    cancel: &CancellationToken,
) -> StreamEnd
where
    R: AsyncRead + Unpin,
{
    let mut decoder = EventDecoder::default();
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    let mut ended = false;

    loop {
        loop {
            match decoder.decode_next() {
                Decoded::Event(event) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return StreamEnd::Cancelled,
                        sent = tx.send(event) => {
                            if sent.is_err() {
                                return StreamEnd::ReceiverDropped;
                            }
                        }
                    }
                }
                Decoded::Malformed(reason) => {
                    tracing::warn!(container_id = %container_id, error = %reason, "Skipping malformed event");
                }
                Decoded::NeedMore => break,
            }
        }
        if ended {
            return StreamEnd::Eof;
        }

        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return StreamEnd::Cancelled,
            read = reader.read(&mut chunk) => read,
        };

        match read {
            Ok(0) => {
                decoder.end_of_input();
                ended = true;
            }
            Ok(n) => decoder.feed(&chunk[..n]),
            Err(e) => {
                tracing::error!(container_id = %container_id, error = %e, "Failed to read event stream");
                return StreamEnd::ReadFailed;
            }
        }
    }
}

/// Read until the first complete event, skipping malformed records.
///
/// Returns `Ok(None)` if the stream ends first.
pub(crate) async fn read_first_event<R>(mut reader: R, container_id: &str) -> RuncResult<Option<Event>>
where
    R: AsyncRead + Unpin,
{
    let mut decoder = EventDecoder::default();
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    let mut ended = false;

    loop {
        loop {
            match decoder.decode_next() {
                Decoded::Event(event) => return Ok(Some(event)),
                Decoded::Malformed(reason) => {
                    tracing::warn!(container_id = %container_id, error = %reason, "Skipping malformed event");
                }
                Decoded::NeedMore => break,
            }
        }
        if ended {
            return Ok(None);
        }

        let n = reader
            .read(&mut chunk)
            .await
            .map_err(|e| RuncError::io(format!("read stats for {}", container_id), e))?;
        if n == 0 {
            decoder.end_of_input();
            ended = true;
        } else {
            decoder.feed(&chunk[..n]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use std::time::Duration;

    const STREAM: &str = concat!(
        r#"{"type":"stats","id":"c1","data":{"pids":{"current":1}}}"#,
        "\n###\n",
        r#"{"type":"oom","id":"c1"}"#,
        "\n{\"type\":}\n",
        r#"{"type":"stats","id":"c1","data":{"pids":{"current":3}}}"#,
        "\n",
    );

    #[tokio::test]
    async fn test_pump_skips_noise_and_closes() {
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let end = pump(STREAM.as_bytes(), tx, "c1", &CancellationToken::new()).await;
        assert_eq!(end, StreamEnd::Eof);

        let mut kinds = Vec::new();
        while let Some(event) = rx.recv().await {
            kinds.push(event.kind);
        }
        assert_eq!(kinds, [EventKind::Stats, EventKind::Oom, EventKind::Stats]);
    }

    #[tokio::test]
    async fn test_pump_backpressure_keeps_every_record() {
        let stream: String = (0..50)
            .map(|i| format!(r#"{{"type":"stats","id":"c{}"}}"#, i))
            .collect();

        // Capacity one forces the loop to block on every send.
        let (tx, mut rx) = mpsc::channel(1);
        let producer = tokio::spawn(async move {
            pump(std::io::Cursor::new(stream.into_bytes()), tx, "c", &CancellationToken::new()).await
        });

        let mut received = Vec::new();
        while let Some(event) = rx.recv().await {
            tokio::time::sleep(Duration::from_millis(1)).await;
            received.push(event.id);
        }

        assert_eq!(producer.await.unwrap(), StreamEnd::Eof);
        let expected: Vec<_> = (0..50).map(|i| format!("c{}", i)).collect();
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn test_pump_stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let end = pump(STREAM.as_bytes(), tx, "c1", &CancellationToken::new()).await;
        assert_eq!(end, StreamEnd::ReceiverDropped);
    }

    #[tokio::test]
    async fn test_pump_cancelled_while_reading() {
        // The write half stays open, so the read never completes.
        let (reader, _writer) = tokio::io::duplex(64);
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { pump(reader, tx, "c1", &cancel).await })
        };
        cancel.cancel();

        assert_eq!(handle.await.unwrap(), StreamEnd::Cancelled);
    }

    #[tokio::test]
    async fn test_read_first_event() {
        let event = read_first_event("noise{\"type\":\"oom\",\"id\":\"x\"}".as_bytes(), "x")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.kind, EventKind::Oom);

        let none = read_first_event("   ".as_bytes(), "x").await.unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_pump_recovers_records_after_stray_quote() {
        let stream = concat!(
            r#"{"type":"stats","id":"a"}"#,
            "\n\"",
            r#"{"type":"stats","id":"b"}"#,
            "\n[",
            r#"{"type":"oom","id":"c"}"#,
        );
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let end = pump(stream.as_bytes(), tx, "c1", &CancellationToken::new()).await;
        assert_eq!(end, StreamEnd::Eof);

        let mut ids = Vec::new();
        while let Some(event) = rx.recv().await {
            ids.push(event.id);
        }
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
