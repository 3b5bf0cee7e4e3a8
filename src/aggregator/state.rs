use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Session, StopReason};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AggregatorStatus {
    Idle,
    Running,
    Stopped,
}

impl Default for AggregatorStatus {
    fn default() -> Self {
        AggregatorStatus::Idle
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorState {
    pub status: AggregatorStatus,
    /// The running session, or the last one once stopped.
    pub session: Option<Session>,
}

impl AggregatorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.status == AggregatorStatus::Running
    }

    pub fn running_session(&self) -> Option<&Session> {
        self.session.as_ref().filter(|_| self.is_running())
    }

    pub fn deadline_reached(&self, now: DateTime<Utc>) -> bool {
        self.running_session()
            .map(|session| session.is_expired_at(now))
            .unwrap_or(false)
    }

    /// Time left before the deadline; zero when not running or past it.
    pub fn remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        self.running_session()
            .map(|session| (session.deadline - now).max(TimeDelta::zero()))
            .unwrap_or_else(TimeDelta::zero)
    }

    pub fn begin_session(&mut self, session: Session) {
        *self = Self {
            status: AggregatorStatus::Running,
            session: Some(session),
        };
    }

    /// Marks the running session stopped and returns it. No-op when nothing
    /// is running.
    pub fn stop(&mut self, at: DateTime<Utc>, reason: StopReason) -> Option<Session> {
        if !self.is_running() {
            return None;
        }
        self.status = AggregatorStatus::Stopped;
        let session = self.session.as_mut()?;
        session.stopped_at = Some(at);
        session.stop_reason = Some(reason);
        Some(session.clone())
    }
}
