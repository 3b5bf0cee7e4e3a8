use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reading::SensorKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    Manual,
    DeadlineReached,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Manual => "Manual",
            StopReason::DeadlineReached => "DeadlineReached",
        }
    }
}

/// One bounded tracking run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub kind: SensorKind,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub sampling_interval_secs: f64,
    pub window_size: usize,
    pub stopped_at: Option<DateTime<Utc>>,
    pub stop_reason: Option<StopReason>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }
}
