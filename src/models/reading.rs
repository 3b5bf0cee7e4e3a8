use std::{fmt, str::FromStr};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SensorKind {
    DeviceMotion,
    HeartRate,
    OxygenSaturation,
}

impl SensorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::DeviceMotion => "deviceMotion",
            SensorKind::HeartRate => "heartRate",
            SensorKind::OxygenSaturation => "oxygenSaturation",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "deviceMotion" => Ok(SensorKind::DeviceMotion),
            "heartRate" => Ok(SensorKind::HeartRate),
            "oxygenSaturation" => Ok(SensorKind::OxygenSaturation),
            other => Err(anyhow!("unknown sensor kind '{other}'")),
        }
    }
}

/// One device-motion update: user acceleration and gravity in g, rotation
/// rate in rad/s, attitude in radians.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MotionReading {
    pub accel_user_x: f64,
    pub accel_user_y: f64,
    pub accel_user_z: f64,
    pub gravity_x: f64,
    pub gravity_y: f64,
    pub gravity_z: f64,
    pub gyro_x: f64,
    pub gyro_y: f64,
    pub gyro_z: f64,
    pub attitude_pitch: f64,
    pub attitude_roll: f64,
    pub attitude_yaw: f64,
}

impl MotionReading {
    pub fn user_acceleration(&self) -> [f64; 3] {
        [self.accel_user_x, self.accel_user_y, self.accel_user_z]
    }

    pub fn rotation_rate(&self) -> [f64; 3] {
        [self.gyro_x, self.gyro_y, self.gyro_z]
    }

    pub fn with_user_acceleration(mut self, [x, y, z]: [f64; 3]) -> Self {
        self.accel_user_x = x;
        self.accel_user_y = y;
        self.accel_user_z = z;
        self
    }

    fn fields(&self) -> [(&'static str, f64); 12] {
        [
            ("accelUserX", self.accel_user_x),
            ("accelUserY", self.accel_user_y),
            ("accelUserZ", self.accel_user_z),
            ("gravityX", self.gravity_x),
            ("gravityY", self.gravity_y),
            ("gravityZ", self.gravity_z),
            ("gyroX", self.gyro_x),
            ("gyroY", self.gyro_y),
            ("gyroZ", self.gyro_z),
            ("attitudePitch", self.attitude_pitch),
            ("attitudeRoll", self.attitude_roll),
            ("attitudeYaw", self.attitude_yaw),
        ]
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeartRateReading {
    /// Beats per minute.
    pub heart_rate: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OxygenSaturationReading {
    /// Fraction in `0.0..=1.0`.
    pub oxygen_saturation: f64,
}

/// An instantaneous sensor value as delivered by the sensor collaborator,
/// before it is stamped and numbered.
///
/// Serialized without a tag: the field names identify the variant, which
/// keeps a sample's JSON object flat.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawReading {
    Motion(MotionReading),
    HeartRate(HeartRateReading),
    OxygenSaturation(OxygenSaturationReading),
}

impl RawReading {
    pub fn heart_rate(bpm: f64) -> Self {
        RawReading::HeartRate(HeartRateReading { heart_rate: bpm })
    }

    pub fn oxygen_saturation(fraction: f64) -> Self {
        RawReading::OxygenSaturation(OxygenSaturationReading {
            oxygen_saturation: fraction,
        })
    }

    pub fn kind(&self) -> SensorKind {
        match self {
            RawReading::Motion(_) => SensorKind::DeviceMotion,
            RawReading::HeartRate(_) => SensorKind::HeartRate,
            RawReading::OxygenSaturation(_) => SensorKind::OxygenSaturation,
        }
    }

    /// Axes inspected by the motion gate: user acceleration and rotation rate
    /// for motion, the value itself for scalar readings.
    pub fn gate_axes(&self) -> Vec<f64> {
        match self {
            RawReading::Motion(m) => {
                let mut axes = m.user_acceleration().to_vec();
                axes.extend_from_slice(&m.rotation_rate());
                axes
            }
            RawReading::HeartRate(r) => vec![r.heart_rate],
            RawReading::OxygenSaturation(r) => vec![r.oxygen_saturation],
        }
    }

    /// Channels run through the low-pass filter.
    pub fn smoothed_channels(&self) -> Vec<f64> {
        match self {
            RawReading::Motion(m) => m.user_acceleration().to_vec(),
            RawReading::HeartRate(r) => vec![r.heart_rate],
            RawReading::OxygenSaturation(r) => vec![r.oxygen_saturation],
        }
    }

    /// Replaces the smoothed channels; `values` must come from
    /// [`RawReading::smoothed_channels`] of the same variant.
    pub fn with_smoothed_channels(self, values: &[f64]) -> Self {
        match (self, values) {
            (RawReading::Motion(m), [x, y, z]) => RawReading::Motion(m.with_user_acceleration([*x, *y, *z])),
            (RawReading::HeartRate(_), [bpm]) => RawReading::heart_rate(*bpm),
            (RawReading::OxygenSaturation(_), [fraction]) => RawReading::oxygen_saturation(*fraction),
            (reading, _) => reading,
        }
    }

    /// Every numeric field with its wire name.
    pub fn fields(&self) -> Vec<(&'static str, f64)> {
        match self {
            RawReading::Motion(m) => m.fields().to_vec(),
            RawReading::HeartRate(r) => vec![("heartRate", r.heart_rate)],
            RawReading::OxygenSaturation(r) => vec![("oxygenSaturation", r.oxygen_saturation)],
        }
    }
}

impl From<MotionReading> for RawReading {
    fn from(reading: MotionReading) -> Self {
        RawReading::Motion(reading)
    }
}
