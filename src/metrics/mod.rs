mod types;

pub use types::{BatchMetrics, MetricsSnapshot};

use std::collections::VecDeque;

const MAX_RECENT_BATCHES: usize = 20;

/// Counters for the running session. Lives under the aggregator's lock, so
/// it needs no synchronization of its own.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    recent_batches: VecDeque<BatchMetrics>,
    readings_seen: u64,
    admitted: u64,
    rejected: u64,
    expired: u64,
    batches_emitted: u64,
    encode_failures: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            recent_batches: VecDeque::with_capacity(MAX_RECENT_BATCHES),
            ..Default::default()
        }
    }

    pub fn record_reading(&mut self) {
        self.readings_seen += 1;
    }

    pub fn record_admitted(&mut self) {
        self.admitted += 1;
    }

    pub fn record_rejected(&mut self) {
        self.rejected += 1;
    }

    pub fn record_expired(&mut self) {
        self.expired += 1;
    }

    pub fn record_batch(&mut self, metrics: BatchMetrics) {
        self.batches_emitted += 1;
        self.recent_batches.push_back(metrics);

        if self.recent_batches.len() > MAX_RECENT_BATCHES {
            self.recent_batches.pop_front();
        }
    }

    pub fn record_encode_failure(&mut self) {
        self.encode_failures += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            readings_seen: self.readings_seen,
            admitted: self.admitted,
            rejected: self.rejected,
            expired: self.expired,
            batches_emitted: self.batches_emitted,
            encode_failures: self.encode_failures,
            recent_batches: self.recent_batches.iter().cloned().collect(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
