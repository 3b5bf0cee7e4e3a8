use crate::models::RawReading;

/// Exponential low-pass step: `alpha * raw + (1 - alpha) * previous`.
pub fn low_pass(previous: f64, raw: f64, alpha: f64) -> f64 {
    alpha * raw + (1.0 - alpha) * previous
}

/// Per-axis low-pass filter over a session's readings. A disabled filter
/// passes readings through untouched.
#[derive(Debug, Clone, Default)]
pub struct SmoothingFilter {
    alpha: Option<f64>,
    previous: Option<Vec<f64>>,
}

impl SmoothingFilter {
    pub fn new(alpha: Option<f64>) -> Self {
        Self {
            alpha,
            previous: None,
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn is_enabled(&self) -> bool {
        self.alpha.is_some()
    }

    pub fn apply(&mut self, reading: RawReading) -> RawReading {
        let Some(alpha) = self.alpha else {
            return reading;
        };

        let raw = reading.smoothed_channels();
        // Seed with the first value so the first output equals the input.
        let previous = match self.previous.take() {
            Some(previous) if previous.len() == raw.len() => previous,
            _ => raw.clone(),
        };

        let output: Vec<f64> = raw
            .iter()
            .zip(&previous)
            .map(|(raw, previous)| low_pass(*previous, *raw, alpha))
            .collect();

        let filtered = reading.with_smoothed_channels(&output);
        self.previous = Some(output);
        filtered
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MotionReading;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn low_pass_converges_toward_raw() {
        let first = low_pass(0.0, 1.0, 0.2);
        assert!(close(first, 0.2));
        let second = low_pass(first, 1.0, 0.2);
        assert!(close(second, 0.36));
    }

    #[test]
    fn first_reading_passes_through_then_smooths() {
        let mut filter = SmoothingFilter::new(Some(0.2));

        let first = filter.apply(RawReading::heart_rate(60.0));
        assert_eq!(first, RawReading::heart_rate(60.0));

        let RawReading::HeartRate(second) = filter.apply(RawReading::heart_rate(70.0)) else {
            panic!("variant changed");
        };
        assert!(close(second.heart_rate, 62.0));
    }

    #[test]
    fn only_acceleration_is_smoothed() {
        let mut filter = SmoothingFilter::new(Some(0.5));
        filter.apply(RawReading::Motion(MotionReading::default()));

        let reading = RawReading::Motion(MotionReading {
            accel_user_x: 1.0,
            gyro_x: 1.0,
            ..Default::default()
        });
        let RawReading::Motion(m) = filter.apply(reading) else {
            panic!("variant changed");
        };
        assert!(close(m.accel_user_x, 0.5));
        assert_eq!(m.gyro_x, 1.0);
    }

    #[test]
    fn disabled_is_identity_and_reset_reseeds() {
        let mut disabled = SmoothingFilter::disabled();
        assert!(!disabled.is_enabled());
        assert_eq!(disabled.apply(RawReading::heart_rate(80.0)), RawReading::heart_rate(80.0));

        let mut filter = SmoothingFilter::new(Some(0.2));
        filter.apply(RawReading::heart_rate(0.0));
        filter.reset();
        assert_eq!(filter.apply(RawReading::heart_rate(90.0)), RawReading::heart_rate(90.0));
    }
}
