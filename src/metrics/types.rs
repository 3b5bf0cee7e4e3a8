use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchMetrics {
    pub window_index: u64,
    pub sample_count: usize,
    pub payload_bytes: usize,
    pub encode_micros: u64,
    pub emitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub readings_seen: u64,
    pub admitted: u64,
    pub rejected: u64,
    pub expired: u64,
    pub batches_emitted: u64,
    pub encode_failures: u64,
    pub recent_batches: Vec<BatchMetrics>,
}
