use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard,
    },
    time::Duration,
};

use anyhow::{bail, Result};
use log::warn;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::models::{RawReading, SensorKind};

use super::source::{
    Authorization, SensorSource, Subscription, SubscriptionHandle, READING_QUEUE_DEPTH,
};

type Subscribers = HashMap<SubscriptionHandle, (SensorKind, mpsc::Sender<RawReading>)>;

/// A sensor fed by the host. Platform callbacks call [`ChannelSensor::push`]
/// from whatever thread they run on; the reading is forwarded to every
/// subscriber of its kind.
pub struct ChannelSensor {
    kinds: HashSet<SensorKind>,
    authorization: Authorization,
    next_handle: AtomicU64,
    subscribers: Mutex<Subscribers>,
}

impl ChannelSensor {
    pub fn new(kinds: impl IntoIterator<Item = SensorKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
            authorization: Authorization::Granted,
            next_handle: AtomicU64::new(1),
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_authorization(mut self, authorization: Authorization) -> Self {
        self.authorization = authorization;
        self
    }

    /// Forwards `reading` without blocking. Returns how many subscribers
    /// accepted it; a full or closed queue drops the reading for that
    /// subscriber.
    pub fn push(&self, reading: RawReading) -> usize {
        let kind = reading.kind();
        let mut delivered = 0;
        let mut closed = Vec::new();

        let mut subscribers = self.lock();
        for (handle, (subscribed_kind, tx)) in subscribers.iter() {
            if *subscribed_kind != kind {
                continue;
            }
            match tx.try_send(reading) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("reading queue full for subscription {}; dropping {kind} reading", handle.id())
                }
                Err(TrySendError::Closed(_)) => closed.push(*handle),
            }
        }
        for handle in closed {
            subscribers.remove(&handle);
        }

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl SensorSource for ChannelSensor {
    fn is_available(&self, kind: SensorKind) -> bool {
        self.kinds.contains(&kind)
    }

    fn authorize(&self, _kind: SensorKind) -> Authorization {
        self.authorization
    }

    fn subscribe(&self, kind: SensorKind, _interval: Duration) -> Result<Subscription> {
        if !self.is_available(kind) {
            bail!("{kind} is not provided by this sensor");
        }

        let handle = SubscriptionHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let (tx, readings) = mpsc::channel(READING_QUEUE_DEPTH);
        self.lock().insert(handle, (kind, tx));

        Ok(Subscription { handle, readings })
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.lock().remove(&handle);
    }
}
