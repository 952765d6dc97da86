pub mod series;
pub mod units;

pub use series::*;
pub use units::*;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// One triaxial accelerometer reading, in g.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccelSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AccelSample {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Euclidean norm of the three axes.
    pub fn magnitude(&self) -> f64 {
        self.vector().norm()
    }
}

/// At-rest magnitude subtracted from every reading while recording.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationFactor {
    pub value: f64,
    /// Samples that decoded successfully during the warm-up window.
    pub accepted: usize,
    pub requested: usize,
}

impl CalibrationFactor {
    pub fn new(value: f64, accepted: usize, requested: usize) -> Self {
        Self {
            value,
            accepted,
            requested,
        }
    }

    /// Gravity-corrected magnitude for a sample.
    pub fn correct(&self, sample: &AccelSample) -> f64 {
        sample.magnitude() - self.value
    }
}

/// A detected rep: index into the series plus its half-prominence width.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub index: usize,
    pub width: f64,
}

/// Peak indices and widths as parallel ascending sequences.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RepSummary {
    pub peaks: Vec<usize>,
    pub widths: Vec<f64>,
}

impl RepSummary {
    pub fn rep_count(&self) -> usize {
        self.peaks.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Peak> + '_ {
        self.peaks
            .iter()
            .zip(self.widths.iter())
            .map(|(&index, &width)| Peak { index, width })
    }
}

impl FromIterator<Peak> for RepSummary {
    fn from_iter<I: IntoIterator<Item = Peak>>(iter: I) -> Self {
        let mut summary = RepSummary::default();
        for peak in iter {
            summary.peaks.push(peak.index);
            summary.widths.push(peak.width);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accel_magnitude() {
        let accel = AccelSample::new(3.0, 4.0, 0.0);
        assert_eq!(accel.magnitude(), 5.0);
    }

    #[test]
    fn test_calibration_correct() {
        let factor = CalibrationFactor::new(1.0, 10, 10);
        let sample = AccelSample::new(0.0, 0.0, 1.25);
        assert!((factor.correct(&sample) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_summary_roundtrip_through_peaks() {
        let summary: RepSummary = vec![
            Peak { index: 4, width: 2.5 },
            Peak { index: 30, width: 3.0 },
        ]
        .into_iter()
        .collect();

        assert_eq!(summary.rep_count(), 2);
        assert_eq!(summary.peaks, vec![4, 30]);
        let back: Vec<Peak> = summary.iter().collect();
        assert_eq!(back[1], Peak { index: 30, width: 3.0 });
    }
}
