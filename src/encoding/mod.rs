//! Batch serialization.
//!
//! The default layout is a flat JSON array of samples. The timestamp-keyed
//! object is kept as an opt-in strategy for consumers of the old format; the
//! strategy is fixed when the encoder is built.

mod keyed;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EncodeError;
use crate::models::{Batch, Sample};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum EncodingStrategy {
    #[default]
    FlatArray,
    TimestampKeyed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum OutputFormat {
    Compact,
    Pretty,
    /// Pretty-printed with every object's keys in sorted order.
    #[default]
    SortedPretty,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchEncoder {
    strategy: EncodingStrategy,
    format: OutputFormat,
}

impl BatchEncoder {
    pub fn new(strategy: EncodingStrategy, format: OutputFormat) -> Self {
        Self { strategy, format }
    }

    pub fn encode(&self, batch: &Batch) -> Result<Vec<u8>, EncodeError> {
        ensure_finite(batch.samples())?;

        match self.strategy {
            EncodingStrategy::FlatArray => self.write(batch.samples()),
            EncodingStrategy::TimestampKeyed => self.write(&keyed::to_keyed_map(batch.samples())?),
        }
    }

    fn write<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, EncodeError> {
        let bytes = match self.format {
            OutputFormat::Compact => serde_json::to_vec(value)?,
            OutputFormat::Pretty => serde_json::to_vec_pretty(value)?,
            OutputFormat::SortedPretty => {
                let sorted = sort_keys(serde_json::to_value(value)?);
                serde_json::to_vec_pretty(&sorted)?
            }
        };
        Ok(bytes)
    }
}

/// Parses a payload produced by an encoder using `strategy`.
pub fn decode_batch(bytes: &[u8], strategy: EncodingStrategy) -> Result<Vec<Sample>, EncodeError> {
    match strategy {
        EncodingStrategy::FlatArray => Ok(serde_json::from_slice(bytes)?),
        EncodingStrategy::TimestampKeyed => {
            let map: Map<String, Value> = serde_json::from_slice(bytes)?;
            keyed::from_keyed_map(map)
        }
    }
}

// JSON has no representation for NaN or infinities; serde_json would
// silently write `null`, which does not parse back into a sample.
fn ensure_finite(samples: &[Sample]) -> Result<(), EncodeError> {
    for sample in samples {
        if let Some((field, _)) = sample
            .reading
            .fields()
            .into_iter()
            .find(|(_, value)| !value.is_finite())
        {
            return Err(EncodeError::NonFinite {
                obj_num: sample.obj_num,
                field,
            });
        }
    }
    Ok(())
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_keys(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MotionReading, RawReading};

    fn motion_batch() -> Batch {
        let samples = (1..=3)
            .map(|n| {
                Sample::new(
                    n,
                    format!("2026-10-19T09:41:07.{:03}Z", n * 31),
                    RawReading::Motion(MotionReading {
                        accel_user_x: 0.1 * n as f64,
                        accel_user_y: -0.333_333_333_333_333_3,
                        gravity_z: -0.98,
                        gyro_z: 1.0 / 3.0,
                        attitude_yaw: std::f64::consts::PI,
                        ..Default::default()
                    }),
                )
            })
            .collect();
        Batch::new(1, samples)
    }

    #[test]
    fn flat_array_round_trips_exactly() {
        let batch = motion_batch();
        for format in [OutputFormat::Compact, OutputFormat::Pretty, OutputFormat::SortedPretty] {
            let encoder = BatchEncoder::new(EncodingStrategy::FlatArray, format);
            let bytes = encoder.encode(&batch).unwrap();
            let decoded = decode_batch(&bytes, EncodingStrategy::FlatArray).unwrap();
            assert_eq!(decoded, batch.samples());
        }
    }

    #[test]
    fn keyed_round_trips_and_uses_timestamps_as_keys() {
        let batch = motion_batch();
        let encoder = BatchEncoder::new(EncodingStrategy::TimestampKeyed, OutputFormat::SortedPretty);
        let bytes = encoder.encode(&batch).unwrap();

        let value: Value = serde_json::from_slice(&bytes).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            vec![
                "2026-10-19T09:41:07.031Z",
                "2026-10-19T09:41:07.062Z",
                "2026-10-19T09:41:07.093Z"
            ]
        );
        assert_eq!(value["2026-10-19T09:41:07.062Z"]["objNum"], 2);

        let decoded = decode_batch(&bytes, EncodingStrategy::TimestampKeyed).unwrap();
        assert_eq!(decoded, batch.samples());
    }

    #[test]
    fn keyed_collision_keeps_later_sample() {
        let batch = Batch::new(
            1,
            vec![
                Sample::new(1, "2026-10-19T09:41:07.000Z".into(), RawReading::heart_rate(60.0)),
                Sample::new(2, "2026-10-19T09:41:07.000Z".into(), RawReading::heart_rate(61.0)),
            ],
        );
        let encoder = BatchEncoder::new(EncodingStrategy::TimestampKeyed, OutputFormat::Compact);
        let decoded =
            decode_batch(&encoder.encode(&batch).unwrap(), EncodingStrategy::TimestampKeyed).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].obj_num, 2);
    }

    #[test]
    fn sorted_pretty_orders_sample_fields() {
        let batch = Batch::new(
            1,
            vec![Sample::new(1, "2026-10-19T09:41:07.000Z".into(), RawReading::heart_rate(60.0))],
        );
        let sorted = BatchEncoder::default().encode(&batch).unwrap();
        let text = String::from_utf8(sorted).unwrap();
        let heart = text.find("\"heartRate\"").unwrap();
        let num = text.find("\"objNum\"").unwrap();
        let ts = text.find("\"timestamp\"").unwrap();
        assert!(heart < num && num < ts);
        assert!(text.contains('\n'));

        let compact = BatchEncoder::new(EncodingStrategy::FlatArray, OutputFormat::Compact)
            .encode(&batch)
            .unwrap();
        assert_eq!(
            String::from_utf8(compact).unwrap(),
            r#"[{"objNum":1,"timestamp":"2026-10-19T09:41:07.000Z","heartRate":60.0}]"#
        );
    }

    #[test]
    fn non_finite_values_fail_the_batch() {
        let batch = Batch::new(
            4,
            vec![Sample::new(9, "2026-10-19T09:41:07.000Z".into(), RawReading::heart_rate(f64::NAN))],
        );
        let err = BatchEncoder::default().encode(&batch).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::NonFinite {
                obj_num: 9,
                field: "heartRate"
            }
        ));
    }
}
