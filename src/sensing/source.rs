use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::models::{RawReading, SensorKind};

/// Readings queued between the sensor and the aggregator before the sensor
/// starts dropping them.
pub const READING_QUEUE_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Authorization {
    #[default]
    Granted,
    Denied,
}

/// A live stream of readings. Dropping the receiver ends delivery; call
/// [`SensorSource::unsubscribe`] to release the sensor itself.
#[derive(Debug)]
pub struct Subscription {
    pub handle: SubscriptionHandle,
    pub readings: mpsc::Receiver<RawReading>,
}

/// The device's sensor framework, as seen by the aggregator.
pub trait SensorSource: Send + Sync {
    fn is_available(&self, kind: SensorKind) -> bool;

    /// Platform permission for `kind`. Sources without a permission model
    /// are always granted.
    fn authorize(&self, _kind: SensorKind) -> Authorization {
        Authorization::Granted
    }

    /// Starts delivering `kind` readings roughly every `interval`.
    fn subscribe(&self, kind: SensorKind, interval: Duration) -> Result<Subscription>;

    fn unsubscribe(&self, handle: SubscriptionHandle);
}
