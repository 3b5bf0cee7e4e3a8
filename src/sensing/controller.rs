use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::aggregator::Aggregator;

use super::loop_worker::sensing_loop;
use super::source::{SensorSource, Subscription, SubscriptionHandle};

/// Owns the task that moves readings from a subscription into the
/// aggregator, plus the subscription it reads from.
pub struct SensingController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    subscription: Option<SubscriptionHandle>,
}

impl SensingController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
            subscription: None,
        }
    }

    /// Spawns the sensing loop for `session_id`. The loop stops the session
    /// itself once `run_for` has elapsed.
    pub fn start_sensing(
        &mut self,
        aggregator: Aggregator,
        session_id: String,
        subscription: Subscription,
        run_for: Duration,
    ) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if self.handle.take().is_some() {
            // An expired session's loop has already exited; nobody joined it.
            info!("detaching finished sensing loop from previous session");
        }

        let cancel_token = CancellationToken::new();
        let deadline = Instant::now().checked_add(run_for);
        if deadline.is_none() {
            warn!("session {session_id} runs too long for a timer; it will only stop on request");
        }

        let handle = tokio::spawn(sensing_loop(
            aggregator,
            session_id,
            subscription.readings,
            deadline,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.subscription = Some(subscription.handle);
    }

    /// Cancels the loop and releases the sensor. The task is left for
    /// [`SensingController::take_task`] so callers can join it without
    /// holding the session lock.
    pub fn release(&mut self, source: &dyn SensorSource) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if let Some(handle) = self.subscription.take() {
            source.unsubscribe(handle);
            info!("released sensor subscription {}", handle.id());
        }
    }

    pub fn take_task(&mut self) -> Option<JoinHandle<()>> {
        self.handle.take()
    }

    pub async fn join(handle: JoinHandle<()>) -> Result<()> {
        handle
            .await
            .context("sensing loop task failed to join")
    }
}

impl Default for SensingController {
    fn default() -> Self {
        Self::new()
    }
}
