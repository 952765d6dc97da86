use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::calibration::Calibrator;
use crate::config::TrackerConfig;
use crate::detector::RepDetector;
use crate::device::SensorDevice;
use crate::error::{Result, TrackerError};
use crate::integrator::{Clock, RecordStats, VelocityIntegrator};
use crate::report::RepReport;
use crate::transport::SampleSource;
use crate::types::{CalibrationFactor, RepSummary, SpeedTrace, VelocitySeries};

/// Session state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Created, nothing measured yet
    Idle,
    /// Sampling the sensor at rest
    Calibrating,
    /// Integrating the live set
    Recording,
    /// Series recorded and reps detected
    Complete,
}

/// Session metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub start_time: String,
    /// Clock reading when the session was created; used in export file names.
    pub start_ns: u64,
    pub state: SessionState,
    pub calibration: Option<CalibrationFactor>,
    pub record_stats: Option<RecordStats>,
    pub rep_count: usize,
}

/// Everything a completed session hands to its sinks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub metadata: SessionMetadata,
    pub series: VelocitySeries,
    pub speed: SpeedTrace,
    pub summary: RepSummary,
    pub report: RepReport,
}

/// One set: calibrate at rest, record, then count reps.
///
/// Phases run strictly in sequence over a single exclusively-held device.
pub struct Session {
    config: TrackerConfig,
    metadata: SessionMetadata,
}

impl Session {
    pub fn new<C: Clock>(config: TrackerConfig, clock: &C) -> Self {
        let now = Utc::now();
        let metadata = SessionMetadata {
            session_id: format!("session_{}", now.timestamp_millis()),
            start_time: now.to_rfc3339(),
            start_ns: clock.now_ns(),
            state: SessionState::Idle,
            calibration: None,
            record_stats: None,
            rep_count: 0,
        };
        Self { config, metadata }
    }

    pub fn state(&self) -> SessionState {
        self.metadata.state
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    fn transition(&mut self, from: SessionState, to: SessionState) -> Result<()> {
        if self.metadata.state != from {
            return Err(TrackerError::InvalidState(format!(
                "cannot enter {:?} from {:?}",
                to, self.metadata.state
            )));
        }
        log::info!("Session {}: {:?} -> {:?}", self.metadata.session_id, from, to);
        self.metadata.state = to;
        Ok(())
    }

    /// Idle → Calibrating → (ready to record). Back to Idle on failure.
    pub fn calibrate<S: SampleSource>(
        &mut self,
        device: &mut SensorDevice<S>,
    ) -> Result<CalibrationFactor> {
        self.transition(SessionState::Idle, SessionState::Calibrating)?;

        let calibrator = Calibrator::new(self.config.calibration.window_length);
        match calibrator.calibrate(device) {
            Ok(factor) => {
                self.metadata.calibration = Some(factor);
                Ok(factor)
            }
            Err(e) => {
                log::error!("Calibration failed: {}", e);
                self.metadata.state = SessionState::Idle;
                Err(e)
            }
        }
    }

    /// Calibrating → Recording → (ready to analyse). Back to Idle on failure.
    pub fn record<S: SampleSource, C: Clock>(
        &mut self,
        device: &mut SensorDevice<S>,
        clock: &C,
    ) -> Result<VelocitySeries> {
        let factor = self.metadata.calibration.ok_or_else(|| {
            TrackerError::InvalidState("recording requires a calibration factor".to_string())
        })?;
        self.transition(SessionState::Calibrating, SessionState::Recording)?;

        let integration = &self.config.integration;
        let mut integrator =
            VelocityIntegrator::new(factor, integration.noise_threshold, clock.now_ns());
        match integrator.record(device, clock, integration.sample_count) {
            Ok(stats) => {
                self.metadata.record_stats = Some(stats);
                Ok(integrator.into_series())
            }
            Err(e) => {
                log::error!("Recording failed: {}", e);
                self.metadata.state = SessionState::Idle;
                Err(e)
            }
        }
    }

    /// Recording → Complete: convert units, detect reps, build the report.
    pub fn analyse(&mut self, series: VelocitySeries) -> Result<SessionOutcome> {
        self.transition(SessionState::Recording, SessionState::Complete)?;

        let speed = SpeedTrace::from_series(&series);
        let summary = RepDetector::new(self.config.detection).detect(&speed);
        let report = RepReport::build(&speed, &summary, self.config.report.goal_velocity);
        self.metadata.rep_count = summary.rep_count();

        log::info!(
            "Session {}: {} reps, {} on target ({:.2} m/s goal)",
            self.metadata.session_id,
            report.rep_count(),
            report.reps_on_target(),
            report.goal_velocity
        );

        Ok(SessionOutcome {
            metadata: self.metadata.clone(),
            series,
            speed,
            summary,
            report,
        })
    }

    /// Calibrate, record and analyse in one call.
    pub fn run<S: SampleSource, C: Clock>(
        &mut self,
        device: &mut SensorDevice<S>,
        clock: &C,
    ) -> Result<SessionOutcome> {
        self.calibrate(device)?;
        let series = self.record(device, clock)?;
        self.analyse(series)
    }
}
