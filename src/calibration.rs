//! Gravity/bias calibration while the sensor is held still.

use crate::device::SensorDevice;
use crate::error::{Result, TrackerError};
use crate::transport::SampleSource;
use crate::types::{AccelSample, CalibrationFactor};

pub const DEFAULT_WINDOW_LENGTH: usize = 100;

/// Running arithmetic mean of sample magnitudes.
///
/// Incremental update keeps a run of identical magnitudes exactly equal to
/// that magnitude, which a sum-then-divide would not guarantee.
#[derive(Debug, Clone, Default)]
pub struct MagnitudeMean {
    mean: f64,
    count: usize,
}

impl MagnitudeMean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: &AccelSample) {
        self.count += 1;
        let magnitude = sample.magnitude();
        self.mean += (magnitude - self.mean) / self.count as f64;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }
}

pub struct Calibrator {
    window_length: usize,
}

impl Calibrator {
    pub fn new(window_length: usize) -> Self {
        Self { window_length }
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    /// Request `window_length` samples and average their magnitudes.
    ///
    /// The caller must keep the sensor stationary. Dropped samples shrink the
    /// effective window; if none decode the phase fails.
    pub fn calibrate<S: SampleSource>(
        &self,
        device: &mut SensorDevice<S>,
    ) -> Result<CalibrationFactor> {
        log::info!("Calibrating over {} samples, hold the sensor still", self.window_length);

        let mut mean = MagnitudeMean::new();
        for i in 0..self.window_length {
            if let Some(sample) = device.next_sample()? {
                mean.push(&sample);
            }
            log::debug!("calibration: {} samples remaining", self.window_length - i);
        }

        let factor = self.finish(mean)?;
        log::info!(
            "Calibration complete: factor {:.4} g ({}/{} samples)",
            factor.value,
            factor.accepted,
            factor.requested
        );
        Ok(factor)
    }

    /// Calibrate from samples already in hand.
    pub fn from_samples<'a, I>(&self, samples: I) -> Result<CalibrationFactor>
    where
        I: IntoIterator<Item = &'a AccelSample>,
    {
        let mut mean = MagnitudeMean::new();
        for sample in samples {
            mean.push(sample);
        }
        self.finish(mean)
    }

    fn finish(&self, mean: MagnitudeMean) -> Result<CalibrationFactor> {
        let value = mean.mean().ok_or(TrackerError::InsufficientCalibrationData {
            requested: self.window_length,
        })?;
        if mean.count() < self.window_length {
            log::warn!(
                "Calibration used {} of {} requested samples",
                mean.count(),
                self.window_length
            );
        }
        Ok(CalibrationFactor::new(value, mean.count(), self.window_length))
    }
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_LENGTH)
    }
}
