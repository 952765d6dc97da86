//! Unit boundary between the integrator (g·s) and the rep detector (m/s).

use serde::{Deserialize, Serialize};

use super::VelocitySeries;

pub const GRAVITY: f64 = 9.81; // m/s² per g

/// Velocity trace in metres per second.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeedTrace(Vec<f64>);

impl SpeedTrace {
    /// Scale integrated g·s velocity into m/s.
    pub fn from_series(series: &VelocitySeries) -> Self {
        Self(series.velocity().iter().map(|v| v * GRAVITY).collect())
    }

    /// Wrap values that are already in m/s.
    pub fn from_meters_per_second(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_series_scales_by_gravity() {
        let mut series = VelocitySeries::seeded(0);
        series.push(1, 0.2, 0.1);
        let trace = SpeedTrace::from_series(&series);
        assert_eq!(trace.len(), 4);
        assert_eq!(trace.get(0), Some(0.0));
        assert!((trace.get(3).unwrap() - 0.981).abs() < 1e-12);
    }
}
