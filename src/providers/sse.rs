//! Server-sent event plumbing shared by the streaming adapters.
//!
//! The transport hands us arbitrary byte chunks; `SseLineBuffer` turns them
//! into complete `data:` payloads, and `pump` drives a provider-specific
//! `StreamAssembler` on a background task, forwarding text to a channel.

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{ParleyError, Result};
use crate::session::Message;

use super::StreamEvent;

/// Channel capacity between the transport task and the consumer.
const STREAM_CHANNEL_CAPACITY: usize = 32;

/// What a single SSE payload meant to the assembler.
#[derive(Debug, PartialEq)]
pub(crate) enum Feed {
    /// Nothing to forward
    Continue,
    /// A text fragment for the caller
    Text(String),
    /// The provider signalled the end of the message
    Stop,
}

/// Provider-specific accumulation of one streamed reply.
pub(crate) trait StreamAssembler: Send + 'static {
    /// Consume one `data:` payload.
    fn feed(&mut self, data: &str) -> Result<Feed>;

    /// Build the final message from everything fed so far.
    fn finish(self) -> Result<Message>;
}

/// Splits a byte stream into SSE `data:` payloads.
///
/// Bytes are buffered raw and only complete lines are decoded, so a
/// multibyte character split across transport chunks survives intact.
#[derive(Debug, Default)]
pub(crate) struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    /// Append a chunk and return every complete data payload it closed.
    ///
    /// `event:` lines, comments and blank separators are dropped; a trailing
    /// partial line stays buffered until the next chunk.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let decoded = String::from_utf8_lossy(&raw[..newline_pos]);
            let line = decoded.trim();

            let data = line
                .strip_prefix("data: ")
                .or_else(|| line.strip_prefix("data:"));
            if let Some(data) = data {
                payloads.push(data.to_string());
            }
        }
        payloads
    }
}

/// Spawn a task that reads `response` as SSE and feeds `assembler`.
///
/// Dropping the returned receiver stops the task at the next send, which
/// abandons the underlying transport read.
pub(crate) fn pump<A: StreamAssembler>(
    response: reqwest::Response,
    mut assembler: A,
) -> mpsc::Receiver<StreamEvent> {
    let (tx, rx) = mpsc::channel::<StreamEvent>(STREAM_CHANNEL_CAPACITY);
    let byte_stream = response.bytes_stream();

    tokio::spawn(async move {
        let mut lines = SseLineBuffer::default();
        tokio::pin!(byte_stream);

        'read: while let Some(chunk_result) = byte_stream.next().await {
            let chunk = match chunk_result {
                Ok(bytes) => bytes,
                Err(e) => {
                    let _ = tx
                        .send(StreamEvent::Error(ParleyError::Provider(format!(
                            "Stream read error: {}",
                            e
                        ))))
                        .await;
                    return;
                }
            };

            for data in lines.push(&chunk) {
                if data == "[DONE]" {
                    break 'read;
                }
                match assembler.feed(&data) {
                    Ok(Feed::Continue) => {}
                    Ok(Feed::Text(text)) => {
                        if tx.send(StreamEvent::Delta(text)).await.is_err() {
                            debug!("Stream consumer went away");
                            return;
                        }
                    }
                    Ok(Feed::Stop) => break 'read,
                    Err(e) => {
                        let _ = tx.send(StreamEvent::Error(e)).await;
                        return;
                    }
                }
            }
        }

        let event = match assembler.finish() {
            Ok(message) => StreamEvent::Done(message),
            Err(e) => StreamEvent::Error(e),
        };
        let _ = tx.send(event).await;
    });

    rx
}
