use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

/// Source of wall-clock time for stamping samples and checking deadlines.
pub trait WallClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Useful for replaying recorded
/// streams and for tests.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut guard = self.lock();
        *guard += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        match self.now.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl WallClock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    pub sequence: u64,
    pub timestamp: String,
}

/// Millisecond-resolution RFC 3339 in UTC, e.g. `2026-10-19T09:41:07.125Z`.
/// Sorts lexicographically in time order.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Hands out the per-session sequence numbers and timestamps.
pub struct SampleClock {
    wall: Arc<dyn WallClock>,
    issued: u64,
}

impl SampleClock {
    pub fn new(wall: Arc<dyn WallClock>) -> Self {
        Self { wall, issued: 0 }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.wall.now()
    }

    /// Reads the wall clock and stamps the next sample.
    pub fn next_timestamp(&mut self) -> Stamp {
        let now = self.now();
        self.stamp(now)
    }

    /// Stamps a reading observed at `at`. Sequence numbers start at 1.
    pub fn stamp(&mut self, at: DateTime<Utc>) -> Stamp {
        self.issued += 1;
        Stamp {
            sequence: self.issued,
            timestamp: format_timestamp(at),
        }
    }

    /// Burns a sequence number without producing a stamp.
    pub fn skip(&mut self) {
        self.issued += 1;
    }

    /// Last sequence number handed out, 0 before the first.
    pub fn issued(&self) -> u64 {
        self.issued
    }

    pub fn reset(&mut self) {
        self.issued = 0;
    }
}
