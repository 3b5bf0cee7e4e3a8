use serde::{Deserialize, Serialize};

use super::reading::{RawReading, SensorKind};

/// A stamped, numbered reading. The JSON form is one flat object:
/// `objNum`, `timestamp`, then the reading's own fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub obj_num: u64,
    pub timestamp: String,
    #[serde(flatten)]
    pub reading: RawReading,
}

impl Sample {
    pub fn new(obj_num: u64, timestamp: String, reading: RawReading) -> Self {
        Self {
            obj_num,
            timestamp,
            reading,
        }
    }

    pub fn kind(&self) -> SensorKind {
        self.reading.kind()
    }
}

/// A completed window of samples in arrival order. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    window_index: u64,
    samples: Vec<Sample>,
}

impl Batch {
    pub(crate) fn new(window_index: u64, samples: Vec<Sample>) -> Self {
        Self {
            window_index,
            samples,
        }
    }

    /// 1-based index of the window this batch closed.
    pub fn window_index(&self) -> u64 {
        self.window_index
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MotionReading;

    #[test]
    fn sample_serializes_as_flat_object() {
        let sample = Sample::new(
            3,
            "2026-10-19T09:41:07.125Z".into(),
            RawReading::Motion(MotionReading {
                accel_user_x: 0.5,
                ..Default::default()
            }),
        );

        let value = serde_json::to_value(&sample).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object["objNum"], 3);
        assert_eq!(object["timestamp"], "2026-10-19T09:41:07.125Z");
        assert_eq!(object["accelUserX"], 0.5);
        assert_eq!(object.len(), 14);
    }

    #[test]
    fn heart_rate_sample_parses_back() {
        let json = r#"{"objNum":1,"timestamp":"2026-10-19T09:41:07.125Z","heartRate":64.0}"#;
        let sample: Sample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.kind(), SensorKind::HeartRate);
        assert_eq!(sample.reading, RawReading::heart_rate(64.0));
    }
}
