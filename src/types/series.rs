use serde::{Deserialize, Serialize};

/// Synthetic entries placed at the head of every series.
pub const SENTINEL_COUNT: usize = 3;

/// Index-aligned time / acceleration / velocity history.
///
/// Velocity is in g·s; convert with [`super::SpeedTrace::from_series`] before
/// peak detection. The first [`SENTINEL_COUNT`] entries are synthetic.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocitySeries {
    timestamps: Vec<u64>,
    acceleration: Vec<f64>,
    velocity: Vec<f64>,
}

impl VelocitySeries {
    /// Series seeded with zeroed sentinels stamped at `start_ns`.
    pub fn seeded(start_ns: u64) -> Self {
        let mut series = Self::with_capacity(SENTINEL_COUNT);
        for _ in 0..SENTINEL_COUNT {
            series.push(start_ns, 0.0, 0.0);
        }
        series
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            timestamps: Vec::with_capacity(capacity),
            acceleration: Vec::with_capacity(capacity),
            velocity: Vec::with_capacity(capacity),
        }
    }

    /// Append one aligned row. The only way the series grows.
    pub fn push(&mut self, timestamp_ns: u64, acceleration: f64, velocity: f64) {
        self.timestamps.push(timestamp_ns);
        self.acceleration.push(acceleration);
        self.velocity.push(velocity);
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Rows recorded from the sensor, excluding sentinels.
    pub fn measured_len(&self) -> usize {
        self.len().saturating_sub(SENTINEL_COUNT)
    }

    pub fn timestamps(&self) -> &[u64] {
        &self.timestamps
    }

    pub fn acceleration(&self) -> &[f64] {
        &self.acceleration
    }

    pub fn velocity(&self) -> &[f64] {
        &self.velocity
    }

    pub fn last_timestamp(&self) -> Option<u64> {
        self.timestamps.last().copied()
    }

    pub fn last_velocity(&self) -> Option<f64> {
        self.velocity.last().copied()
    }

    /// Consume into the raw `(timestamps, acceleration, velocity)` triple.
    pub fn into_parts(self) -> (Vec<u64>, Vec<f64>, Vec<f64>) {
        (self.timestamps, self.acceleration, self.velocity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_series() {
        let series = VelocitySeries::seeded(42);
        assert_eq!(series.len(), SENTINEL_COUNT);
        assert_eq!(series.measured_len(), 0);
        assert_eq!(series.timestamps(), &[42, 42, 42]);
        assert!(series.acceleration().iter().all(|&a| a == 0.0));
        assert!(series.velocity().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_push_keeps_alignment() {
        let mut series = VelocitySeries::seeded(0);
        series.push(10, 0.5, 0.1);
        assert_eq!(series.len(), 4);
        assert_eq!(series.acceleration().len(), series.velocity().len());
        assert_eq!(series.last_timestamp(), Some(10));
        assert_eq!(series.last_velocity(), Some(0.1));
    }
}
