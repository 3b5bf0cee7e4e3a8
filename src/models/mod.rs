pub mod reading;
pub mod sample;
pub mod session;

pub use reading::{
    HeartRateReading, MotionReading, OxygenSaturationReading, RawReading, SensorKind,
};
pub use sample::{Batch, Sample};
pub use session::{Session, StopReason};
