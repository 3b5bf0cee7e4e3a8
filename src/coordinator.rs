//! Runs several aggregators side by side as one logical session, e.g. motion
//! plus heart rate. Aggregators know nothing about each other.

use log::{info, warn};

use crate::aggregator::{Aggregator, StartRequest};
use crate::error::AggregatorError;
use crate::models::Session;

#[derive(Default)]
pub struct SessionCoordinator {
    members: Vec<(Aggregator, StartRequest)>,
}

impl SessionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, aggregator: Aggregator, request: StartRequest) -> &mut Self {
        self.members.push((aggregator, request));
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn aggregators(&self) -> impl Iterator<Item = &Aggregator> {
        self.members.iter().map(|(aggregator, _)| aggregator)
    }

    /// Starts every member in order. If one fails, the members already
    /// started are stopped again and the error is returned.
    pub async fn start_all(&self) -> Result<Vec<Session>, AggregatorError> {
        let mut sessions = Vec::with_capacity(self.members.len());

        for (index, (aggregator, request)) in self.members.iter().enumerate() {
            match aggregator.start(request.clone()).await {
                Ok(session) => sessions.push(session),
                Err(err) => {
                    warn!("starting {} failed: {err}; rolling back", request.kind);
                    for (started, _) in &self.members[..index] {
                        if let Err(stop_err) = started.stop().await {
                            warn!("rollback stop failed: {stop_err}");
                        }
                    }
                    return Err(err);
                }
            }
        }

        info!("started {} coordinated sessions", sessions.len());
        Ok(sessions)
    }

    /// Stops every member. Members that were not running are skipped; the
    /// first stop error is returned after all members were attempted.
    pub async fn stop_all(&self) -> Result<Vec<Session>, AggregatorError> {
        let mut stopped = Vec::new();
        let mut first_error = None;

        for (aggregator, _) in &self.members {
            match aggregator.stop().await {
                Ok(Some(session)) => stopped.push(session),
                Ok(None) => {}
                Err(err) => {
                    warn!("stop failed: {err}");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(stopped),
        }
    }

    pub async fn any_running(&self) -> bool {
        for (aggregator, _) in &self.members {
            if aggregator.is_running().await {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SensorKind;
    use crate::sensing::ChannelSensor;
    use crate::sink::ChannelSink;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn failed_member_rolls_back_started_ones() {
        let (sink, _events) = ChannelSink::new();
        let sink = Arc::new(sink);
        let motion_sensor = Arc::new(ChannelSensor::new([SensorKind::DeviceMotion]));
        let motion = Aggregator::new(motion_sensor.clone(), sink.clone());
        let heart = Aggregator::new(Arc::new(ChannelSensor::new([SensorKind::DeviceMotion])), sink);

        let mut coordinator = SessionCoordinator::new();
        coordinator
            .add(
                motion.clone(),
                StartRequest::new(SensorKind::DeviceMotion, Duration::from_secs(30), Duration::from_millis(100)),
            )
            .add(
                heart,
                StartRequest::new(SensorKind::HeartRate, Duration::from_secs(30), Duration::from_secs(5)),
            );

        let err = coordinator.start_all().await.unwrap_err();
        assert!(matches!(err, AggregatorError::SensorUnavailable { .. }));
        assert!(!motion.is_running().await);
        assert_eq!(motion_sensor.subscriber_count(), 0);
        assert!(!coordinator.any_running().await);
    }
}
