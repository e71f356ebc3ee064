//! The stream multiplexer.
//!
//! All events a chat request sends to the client pass through one
//! `StreamWriter`, which assigns the strictly increasing `index` and owns the
//! terminal protocol: `Done` is emitted exactly once as the last event, and a
//! failure becomes `Error` followed by `Done`. After the client disconnects
//! or `Done` has gone out, every further emit is a silent no-op.

use quillpad_core::stream::{StreamEvent, StreamPayload};
use tokio::sync::mpsc;
use tracing::debug;

pub struct StreamWriter {
    tx: mpsc::Sender<StreamEvent>,
    next_index: u64,
    closed: bool,
    done_sent: bool,
}

impl StreamWriter {
    pub fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self {
            tx,
            next_index: 0,
            closed: false,
            done_sent: false,
        }
    }

    /// Emit one payload with the next index. Returns whether the event was
    /// accepted; `false` means the stream is finished or the client is gone.
    pub async fn emit(&mut self, payload: StreamPayload) -> bool {
        if self.closed || self.done_sent {
            return false;
        }

        let event = StreamEvent {
            index: self.next_index,
            payload,
        };

        if self.tx.send(event).await.is_err() {
            debug!("Stream receiver dropped, closing writer");
            self.closed = true;
            return false;
        }

        self.next_index += 1;
        true
    }

    /// Terminate the stream successfully. Idempotent.
    pub async fn finish(&mut self) {
        if self.done_sent {
            return;
        }
        self.emit(StreamPayload::Done).await;
        self.done_sent = true;
    }

    /// Terminate the stream with an error notice, then `Done`.
    pub async fn fail(&mut self, message: impl Into<String>) {
        if self.done_sent {
            return;
        }
        self.emit(StreamPayload::Error {
            message: message.into(),
        })
        .await;
        self.finish().await;
    }

    /// True once the receiver is gone or the stream has terminated.
    pub fn is_closed(&self) -> bool {
        self.closed || self.done_sent
    }

    /// Number of events emitted so far.
    pub fn emitted(&self) -> u64 {
        self.next_index
    }
}
