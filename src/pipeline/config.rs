use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::encoding::{BatchEncoder, EncodingStrategy, OutputFormat};
use crate::error::AggregatorError;

/// Which readings take a sequence number and count toward a window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SequencePolicy {
    /// Only readings that pass the gate are numbered and counted, so the
    /// emitted numbers run `1..=N` without gaps.
    #[default]
    Admitted,
    /// Every in-deadline reading is numbered and counted. Gated readings
    /// leave gaps, and a window where nothing passed emits nothing.
    AllReadings,
}

/// Per-session tuning for the filter, gate, windowing and encoding stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    pub filter_enabled: bool,

    /// Filter coefficient. Falls back to the sampling interval in seconds.
    pub alpha: Option<f64>,

    /// Magnitude an axis must exceed for a reading to be kept; `None`
    /// disables gating.
    pub gate_threshold: Option<f64>,

    /// Samples per batch; `None` means one batch per second of cadence.
    pub window_size: Option<usize>,

    pub sequence_policy: SequencePolicy,
    pub encoding: EncodingStrategy,
    pub format: OutputFormat,

    /// Emit the trailing partial window when a session stops.
    pub flush_on_stop: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filter_enabled: false,
            alpha: None,
            gate_threshold: Some(0.3),
            window_size: None,
            sequence_policy: SequencePolicy::Admitted,
            encoding: EncodingStrategy::FlatArray,
            format: OutputFormat::SortedPretty,
            flush_on_stop: false,
        }
    }
}

/// Pipeline settings checked against a sampling interval.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedPipeline {
    pub alpha: Option<f64>,
    pub gate_threshold: Option<f64>,
    pub window_size: usize,
    pub sequence_policy: SequencePolicy,
    pub encoder: BatchEncoder,
    pub flush_on_stop: bool,
}

/// Largest window a session may use, explicit or derived from the cadence.
pub const MAX_WINDOW_SIZE: usize = 100_000;

/// One window per second of cadence, never less than one sample.
pub fn window_size_for(sampling_interval: Duration) -> usize {
    let per_second = 1.0 / sampling_interval.as_secs_f64();
    if per_second.is_finite() {
        per_second.round().max(1.0) as usize
    } else {
        1
    }
}

impl PipelineConfig {
    pub fn resolve(&self, sampling_interval: Duration) -> Result<ResolvedPipeline, AggregatorError> {
        if sampling_interval.is_zero() {
            return Err(AggregatorError::InvalidConfig(
                "sampling interval must be greater than zero".into(),
            ));
        }

        let alpha = if self.filter_enabled {
            let alpha = self.alpha.unwrap_or(sampling_interval.as_secs_f64());
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(AggregatorError::InvalidConfig(format!(
                    "filter alpha must be in (0, 1], got {alpha}"
                )));
            }
            Some(alpha)
        } else {
            None
        };

        if let Some(threshold) = self.gate_threshold {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(AggregatorError::InvalidConfig(format!(
                    "gate threshold must be a non-negative number, got {threshold}"
                )));
            }
        }

        let window_size = match self.window_size {
            Some(0) => {
                return Err(AggregatorError::InvalidConfig(
                    "window size must be greater than zero".into(),
                ))
            }
            Some(size) => size,
            None => window_size_for(sampling_interval),
        };
        if window_size > MAX_WINDOW_SIZE {
            return Err(AggregatorError::InvalidConfig(format!(
                "window size {window_size} exceeds the limit of {MAX_WINDOW_SIZE} samples"
            )));
        }

        Ok(ResolvedPipeline {
            alpha,
            gate_threshold: self.gate_threshold,
            window_size,
            sequence_policy: self.sequence_policy,
            encoder: BatchEncoder::new(self.encoding, self.format),
            flush_on_stop: self.flush_on_stop,
        })
    }
}
