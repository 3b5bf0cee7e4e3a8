//! Where finished batches go.
//!
//! The aggregator calls its sink while holding the session lock, so batches
//! arrive in window order. Sinks must not call back into the aggregator.

use std::io::Write;

use log::warn;
use tokio::sync::mpsc;

use crate::error::EncodeError;
use crate::models::SensorKind;

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReady {
    pub session_id: String,
    pub kind: SensorKind,
    pub window_index: u64,
    pub sample_count: usize,
    pub payload: Vec<u8>,
}

pub trait BatchSink: Send + Sync {
    fn on_batch_ready(&self, batch: BatchReady);

    /// Called when a window's batch could not be serialized and was dropped.
    fn on_batch_failed(&self, _session_id: &str, _window_index: u64, _error: &EncodeError) {}
}

/// Prints every payload to stdout, one batch after another.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl BatchSink for StdoutSink {
    fn on_batch_ready(&self, batch: BatchReady) {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        if let Err(err) = out
            .write_all(&batch.payload)
            .and_then(|_| out.write_all(b"\n"))
            .and_then(|_| out.flush())
        {
            warn!("failed to write batch {} to stdout: {err}", batch.window_index);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Ready(BatchReady),
    Failed {
        session_id: String,
        window_index: u64,
        error: String,
    },
}

/// Queues batch events for a consumer running on another task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: SinkEvent) {
        if self.tx.send(event).is_err() {
            warn!("batch consumer has gone away; dropping event");
        }
    }
}

impl BatchSink for ChannelSink {
    fn on_batch_ready(&self, batch: BatchReady) {
        self.send(SinkEvent::Ready(batch));
    }

    fn on_batch_failed(&self, session_id: &str, window_index: u64, error: &EncodeError) {
        self.send(SinkEvent::Failed {
            session_id: session_id.to_string(),
            window_index,
            error: error.to_string(),
        });
    }
}
