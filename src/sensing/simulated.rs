use std::{
    collections::HashMap,
    f64::consts::TAU,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard,
    },
    time::Duration,
};

use anyhow::{bail, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::{
    sync::mpsc,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::models::{MotionReading, RawReading, SensorKind};

use super::source::{SensorSource, Subscription, SubscriptionHandle, READING_QUEUE_DEPTH};

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Every `BURST_PERIOD_SECS` the wrist flicks for `BURST_SECS`.
const BURST_PERIOD_SECS: f64 = 2.0;
const BURST_SECS: f64 = 0.3;

/// Synthetic readings on a tokio timer, for demos and tests. Motion is a
/// quiet baseline broken by short wrist-flick bursts; heart rate and oxygen
/// saturation drift around resting values.
pub struct SimulatedSensor {
    seed: u64,
    next_handle: AtomicU64,
    generators: Mutex<HashMap<SubscriptionHandle, CancellationToken>>,
}

impl SimulatedSensor {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            next_handle: AtomicU64::new(1),
            generators: Mutex::new(HashMap::new()),
        }
    }

    pub fn active_generators(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriptionHandle, CancellationToken>> {
        match self.generators.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl SensorSource for SimulatedSensor {
    fn is_available(&self, _kind: SensorKind) -> bool {
        true
    }

    fn subscribe(&self, kind: SensorKind, interval: Duration) -> Result<Subscription> {
        if interval.is_zero() {
            bail!("sampling interval must be greater than zero");
        }

        let handle = SubscriptionHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let (tx, readings) = mpsc::channel(READING_QUEUE_DEPTH);
        let cancel_token = CancellationToken::new();
        let rng = StdRng::seed_from_u64(self.seed ^ handle.id());

        tokio::spawn(generate(kind, interval, rng, tx, cancel_token.clone()));
        self.lock().insert(handle, cancel_token);

        log_info!("simulated {kind} sensor started every {}ms", interval.as_millis());
        Ok(Subscription { handle, readings })
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        if let Some(token) = self.lock().remove(&handle) {
            token.cancel();
        }
    }
}

async fn generate(
    kind: SensorKind,
    interval: Duration,
    mut rng: StdRng,
    tx: mpsc::Sender<RawReading>,
    cancel_token: CancellationToken,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tick: u64 = 0;

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => {
                let t = tick as f64 * interval.as_secs_f64();
                tick += 1;
                if tx.send(synthesize(kind, t, &mut rng)).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Reading of `kind` at `t` seconds into the stream.
pub fn synthesize(kind: SensorKind, t: f64, rng: &mut impl Rng) -> RawReading {
    match kind {
        SensorKind::DeviceMotion => RawReading::Motion(synthesize_motion(t, rng)),
        SensorKind::HeartRate => {
            RawReading::heart_rate(68.0 + 6.0 * (t / 30.0).sin() + rng.gen_range(-2.0..2.0_f64))
        }
        SensorKind::OxygenSaturation => {
            RawReading::oxygen_saturation((0.97 + rng.gen_range(-0.01..0.01_f64)).min(1.0))
        }
    }
}

fn synthesize_motion(t: f64, rng: &mut impl Rng) -> MotionReading {
    let in_burst = t % BURST_PERIOD_SECS < BURST_SECS;
    let (accel_amp, gyro_amp) = if in_burst { (0.8, 1.5) } else { (0.0, 0.0) };
    let phase = TAU * 4.0 * t;
    let mut noise = || rng.gen_range(-0.05..0.05_f64);

    MotionReading {
        accel_user_x: accel_amp * phase.sin() + noise(),
        accel_user_y: 0.5 * accel_amp * phase.cos() + noise(),
        accel_user_z: noise(),
        gravity_x: 0.05 * (t / 5.0).sin(),
        gravity_y: 0.05 * (t / 7.0).cos(),
        gravity_z: -0.99,
        gyro_x: gyro_amp * phase.cos() + noise(),
        gyro_y: noise(),
        gyro_z: 0.5 * gyro_amp * phase.sin() + noise(),
        attitude_pitch: 0.1 * (t / 3.0).sin(),
        attitude_roll: 0.1 * (t / 4.0).cos(),
        attitude_yaw: (t / 10.0) % TAU,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::gate::admit;

    #[test]
    fn quiet_motion_stays_under_default_gate() {
        let mut rng = StdRng::seed_from_u64(7);
        let quiet = synthesize(SensorKind::DeviceMotion, 1.0, &mut rng);
        assert!(!admit(&quiet, 0.3));

        let burst = (0..10)
            .map(|i| synthesize(SensorKind::DeviceMotion, 0.02 * i as f64, &mut rng))
            .any(|reading| admit(&reading, 0.3));
        assert!(burst);
    }

    #[test]
    fn scalar_readings_stay_plausible() {
        let mut rng = StdRng::seed_from_u64(1);
        for i in 0..100 {
            let RawReading::HeartRate(hr) = synthesize(SensorKind::HeartRate, i as f64 * 5.0, &mut rng) else {
                panic!("wrong kind");
            };
            assert!((55.0..80.0).contains(&hr.heart_rate));

            let RawReading::OxygenSaturation(o2) = synthesize(SensorKind::OxygenSaturation, 0.0, &mut rng) else {
                panic!("wrong kind");
            };
            assert!(o2.oxygen_saturation <= 1.0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribe_stops_the_stream() {
        let sensor = SimulatedSensor::new(42);
        let mut subscription = sensor
            .subscribe(SensorKind::HeartRate, Duration::from_secs(5))
            .unwrap();

        assert!(subscription.readings.recv().await.is_some());
        assert!(subscription.readings.recv().await.is_some());
        assert_eq!(sensor.active_generators(), 1);

        sensor.unsubscribe(subscription.handle);
        assert_eq!(sensor.active_generators(), 0);
        while subscription.readings.recv().await.is_some() {}
    }
}
