use crate::models::RawReading;

/// True when any tracked axis of `reading` exceeds `threshold` in magnitude.
pub fn admit(reading: &RawReading, threshold: f64) -> bool {
    reading
        .gate_axes()
        .iter()
        .any(|value| value.abs() > threshold)
}

/// Drops readings too quiet to be worth keeping.
#[derive(Debug, Clone, Copy, Default)]
pub struct MotionGate {
    threshold: Option<f64>,
}

impl MotionGate {
    pub fn new(threshold: Option<f64>) -> Self {
        Self { threshold }
    }

    pub fn disabled() -> Self {
        Self { threshold: None }
    }

    pub fn admits(&self, reading: &RawReading) -> bool {
        match self.threshold {
            Some(threshold) => admit(reading, threshold),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MotionReading;

    fn motion(accel: [f64; 3], gyro: [f64; 3]) -> RawReading {
        RawReading::Motion(MotionReading {
            gyro_x: gyro[0],
            gyro_y: gyro[1],
            gyro_z: gyro[2],
            gravity_z: -1.0,
            ..MotionReading::default().with_user_acceleration(accel)
        })
    }

    #[test]
    fn any_axis_above_threshold_admits() {
        let gate = MotionGate::new(Some(0.3));
        assert!(gate.admits(&motion([0.0, 0.31, 0.0], [0.0; 3])));
        assert!(gate.admits(&motion([0.0; 3], [0.0, 0.0, -0.5])));
    }

    #[test]
    fn all_axes_at_or_below_threshold_reject() {
        let gate = MotionGate::new(Some(0.3));
        // gravity is not a tracked axis
        assert!(!gate.admits(&motion([0.3, -0.3, 0.1], [0.2, 0.0, -0.29])));
    }

    #[test]
    fn disabled_gate_admits_everything() {
        assert!(MotionGate::disabled().admits(&motion([0.0; 3], [0.0; 3])));
    }
}
