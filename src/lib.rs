// Rep Tracker Library
// Bar-velocity tracking from a serial accelerometer: calibrate, integrate, count reps

pub mod calibration;
pub mod config;
pub mod decoder;
pub mod detector;
pub mod device;
pub mod error;
pub mod export;
pub mod integrator;
pub mod logging;
pub mod report;
pub mod session;
pub mod transport;
pub mod types;

pub use calibration::Calibrator;
pub use config::TrackerConfig;
pub use detector::{RepDetector, RepDetectorConfig};
pub use device::SensorDevice;
pub use error::{DecodeError, Result, TrackerError};
pub use export::SessionExport;
pub use integrator::{integrate, Clock, FixedStepClock, SystemClock, VelocityIntegrator};
pub use report::RepReport;
pub use session::{Session, SessionMetadata, SessionOutcome, SessionState};
pub use transport::{SampleSource, ScriptedSource, SerialSource};
pub use types::{
    AccelSample, CalibrationFactor, Peak, RepSummary, SpeedTrace, VelocitySeries, GRAVITY,
};
