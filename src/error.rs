use std::fmt;

use crate::models::SensorKind;

/// Why a sensor could not be used for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    NotAvailable,
    AuthorizationDenied,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::NotAvailable => f.write_str("not available on this device"),
            UnavailableReason::AuthorizationDenied => f.write_str("authorization denied"),
        }
    }
}

/// Errors returned by the aggregator's lifecycle operations. None of them
/// leave the aggregator in a broken state.
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("session {0} is already running")]
    AlreadyRunning(String),

    #[error("{kind} sensor unavailable: {reason}")]
    SensorUnavailable {
        kind: SensorKind,
        reason: UnavailableReason,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("sensor error: {0:#}")]
    Sensor(#[source] anyhow::Error),
}

/// A batch that could not be serialized. The batch is dropped; the session
/// carries on with the next window.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("sample {obj_num} has non-finite {field}")]
    NonFinite { obj_num: u64, field: &'static str },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
