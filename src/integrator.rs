//! Noise-gated integration of acceleration magnitude into velocity.
//!
//! Each accepted sample is gravity-corrected, gated against a noise floor,
//! and integrated with forward Euler over the measured inter-sample time.
//! Three consecutive gated-to-zero accelerations force velocity back to zero,
//! which removes drift accumulated while the bar is at rest.

use std::cell::Cell;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::device::SensorDevice;
use crate::error::{Result, TrackerError};
use crate::transport::SampleSource;
use crate::types::{AccelSample, CalibrationFactor, VelocitySeries, SENTINEL_COUNT};

pub const DEFAULT_NOISE_THRESHOLD: f64 = 0.03; // g
pub const DEFAULT_SAMPLE_COUNT: usize = 500;

/// Source of nanosecond timestamps for the series.
pub trait Clock {
    fn now_ns(&self) -> u64;
}

/// Wall-clock nanoseconds since the Unix epoch, advanced monotonically.
pub struct SystemClock {
    epoch_ns: u64,
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        let epoch_ns = Utc::now()
            .timestamp_nanos_opt()
            .map(|ns| ns.max(0) as u64)
            .unwrap_or_default();
        Self {
            epoch_ns,
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ns(&self) -> u64 {
        self.epoch_ns + self.origin.elapsed().as_nanos() as u64
    }
}

/// Deterministic clock: each read returns the previous value plus a fixed step.
#[derive(Debug)]
pub struct FixedStepClock {
    next: Cell<u64>,
    step_ns: u64,
}

impl FixedStepClock {
    pub fn new(start_ns: u64, step_ns: u64) -> Self {
        Self {
            next: Cell::new(start_ns),
            step_ns,
        }
    }

    /// Clock starting at zero that advances by `period` seconds per read.
    pub fn from_period_secs(period: f64) -> Result<Self> {
        if !(period.is_finite() && period > 0.0) {
            return Err(TrackerError::InvalidParameters(format!(
                "sample period must be positive, got {}",
                period
            )));
        }
        Ok(Self::new(0, (period * 1e9).round() as u64))
    }
}

impl Clock for FixedStepClock {
    fn now_ns(&self) -> u64 {
        let now = self.next.get();
        self.next.set(now + self.step_ns);
        now
    }
}

/// The last three gated accelerations, held apart from the full series.
#[derive(Debug, Clone, Default)]
struct StillnessWindow {
    slots: [f64; SENTINEL_COUNT],
    head: usize,
}

impl StillnessWindow {
    fn push(&mut self, value: f64) {
        self.slots[self.head] = value;
        self.head = (self.head + 1) % self.slots.len();
    }

    fn is_still(&self) -> bool {
        self.slots.iter().all(|&a| a == 0.0)
    }
}

/// What one accepted sample contributed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntegrationStep {
    pub timestamp_ns: u64,
    pub acceleration: f64,
    pub velocity: f64,
    pub dt: f64,
    /// Velocity was forced to zero by the stillness rule.
    pub zeroed: bool,
}

/// Counts from one recording run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordStats {
    pub requested: usize,
    pub accepted: usize,
    pub zero_velocity_resets: usize,
}

impl RecordStats {
    pub fn dropped(&self) -> usize {
        self.requested - self.accepted
    }
}

pub struct VelocityIntegrator {
    factor: CalibrationFactor,
    noise_threshold: f64,
    series: VelocitySeries,
    window: StillnessWindow,
}

impl VelocityIntegrator {
    /// New integrator whose series starts with sentinels stamped `start_ns`.
    pub fn new(factor: CalibrationFactor, noise_threshold: f64, start_ns: u64) -> Self {
        Self {
            factor,
            noise_threshold,
            series: VelocitySeries::seeded(start_ns),
            window: StillnessWindow::default(),
        }
    }

    /// Corrected magnitude, or exactly zero inside the noise band.
    pub fn gate(&self, sample: &AccelSample) -> f64 {
        let corrected = self.factor.correct(sample);
        if corrected.abs() < self.noise_threshold {
            0.0
        } else {
            corrected
        }
    }

    /// Integrate one decoded sample read at `now_ns`.
    pub fn push_sample(&mut self, sample: &AccelSample, now_ns: u64) -> IntegrationStep {
        let acceleration = self.gate(sample);
        self.window.push(acceleration);

        let last_ns = self.series.last_timestamp().unwrap_or(now_ns);
        let dt = now_ns.saturating_sub(last_ns) as f64 * 1e-9;

        let zeroed = self.window.is_still();
        let velocity = if zeroed {
            0.0
        } else {
            acceleration * dt + self.series.last_velocity().unwrap_or(0.0)
        };

        self.series.push(now_ns, acceleration, velocity);

        IntegrationStep {
            timestamp_ns: now_ns,
            acceleration,
            velocity,
            dt,
            zeroed,
        }
    }

    /// Run `count` request/decode/integrate iterations against the device.
    ///
    /// Iterations whose sample is dropped leave the series untouched.
    pub fn record<S: SampleSource, C: Clock>(
        &mut self,
        device: &mut SensorDevice<S>,
        clock: &C,
        count: usize,
    ) -> Result<RecordStats> {
        let mut stats = RecordStats {
            requested: count,
            ..RecordStats::default()
        };

        for i in 0..count {
            if let Some(sample) = device.next_sample()? {
                let step = self.push_sample(&sample, clock.now_ns());
                stats.accepted += 1;
                if step.zeroed {
                    stats.zero_velocity_resets += 1;
                }
            }
            log::debug!("recording: {} samples remaining", count - i);
        }

        if stats.dropped() > 0 {
            log::warn!("Dropped {} of {} samples while recording", stats.dropped(), count);
        }
        Ok(stats)
    }

    pub fn series(&self) -> &VelocitySeries {
        &self.series
    }

    pub fn into_series(self) -> VelocitySeries {
        self.series
    }
}

/// Record a full velocity series from a calibrated device.
pub fn integrate<S: SampleSource, C: Clock>(
    device: &mut SensorDevice<S>,
    factor: CalibrationFactor,
    noise_threshold: f64,
    count: usize,
    clock: &C,
) -> Result<VelocitySeries> {
    let mut integrator = VelocityIntegrator::new(factor, noise_threshold, clock.now_ns());
    integrator.record(device, clock, count)?;
    Ok(integrator.into_series())
}
