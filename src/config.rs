use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::calibration::DEFAULT_WINDOW_LENGTH;
use crate::detector::RepDetectorConfig;
use crate::device::DEFAULT_BACKOFF;
use crate::error::{Result, TrackerError};
use crate::integrator::{DEFAULT_NOISE_THRESHOLD, DEFAULT_SAMPLE_COUNT};
use crate::report::DEFAULT_GOAL_VELOCITY;

/// Settings for one tracking session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub serial: SerialConfig,
    pub calibration: CalibrationConfig,
    pub integration: IntegrationConfig,
    pub detection: RepDetectorConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub window_length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    pub noise_threshold: f64,
    pub sample_count: usize,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub goal_velocity: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            calibration: CalibrationConfig::default(),
            integration: IntegrationConfig::default(),
            detection: RepDetectorConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "COM4".to_string(),
            baud_rate: 115_200,
            timeout_ms: 100,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            window_length: DEFAULT_WINDOW_LENGTH,
        }
    }
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            noise_threshold: DEFAULT_NOISE_THRESHOLD,
            sample_count: DEFAULT_SAMPLE_COUNT,
            retry_backoff_ms: DEFAULT_BACKOFF.as_millis() as u64,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            goal_velocity: DEFAULT_GOAL_VELOCITY,
        }
    }
}

impl SerialConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl IntegrationConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl TrackerConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: TrackerConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(TrackerError::Config(msg.to_string()));

        if self.serial.baud_rate == 0 {
            return invalid("Baud rate must be positive");
        }
        if self.serial.timeout_ms == 0 {
            return invalid("Serial timeout must be positive");
        }
        if self.calibration.window_length == 0 {
            return invalid("Calibration window must hold at least one sample");
        }
        if !(self.integration.noise_threshold > 0.0) {
            return invalid("Noise threshold must be positive");
        }
        if self.integration.sample_count == 0 {
            return invalid("Sample count must be positive");
        }
        if !(self.detection.min_height > 0.0 && self.detection.min_height.is_finite()) {
            return invalid("Peak height threshold must be positive");
        }
        if self.detection.min_distance == 0 {
            return invalid("Peak distance must be at least one sample");
        }
        if !(self.detection.rel_height > 0.0 && self.detection.rel_height <= 1.0) {
            return invalid("Relative width height must be in (0, 1]");
        }
        if !(self.report.goal_velocity > 0.0) {
            return invalid("Goal velocity must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TrackerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.calibration.window_length, 100);
        assert_eq!(config.integration.sample_count, 500);
        assert_eq!(config.integration.noise_threshold, 0.03);
        assert_eq!(config.integration.retry_backoff(), Duration::from_millis(50));
        assert_eq!(config.detection.min_distance, 15);
        assert_eq!(config.serial.timeout(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "serial": { "port": "/dev/rfcomm0" }, "integration": { "sample_count": 250 } }"#;
        let config: TrackerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.serial.port, "/dev/rfcomm0");
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.integration.sample_count, 250);
        assert_eq!(config.integration.noise_threshold, 0.03);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = TrackerConfig::default();
        config.detection.rel_height = 1.5;
        assert!(matches!(config.validate(), Err(TrackerError::Config(_))));

        let mut config = TrackerConfig::default();
        config.calibration.window_length = 0;
        assert!(config.validate().is_err());

        let mut config = TrackerConfig::default();
        config.integration.noise_threshold = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = TrackerConfig::default();
        config.detection.min_height = -1.0;
        assert!(matches!(config.validate(), Err(TrackerError::Config(_))));

        let mut config = TrackerConfig::default();
        config.detection.min_height = 0.0;
        assert!(config.validate().is_err());

        let mut config = TrackerConfig::default();
        config.serial.timeout_ms = 0;
        assert!(matches!(config.validate(), Err(TrackerError::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "rep_tracker_config_{}.json",
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let mut config = TrackerConfig::default();
        config.report.goal_velocity = 0.9;
        config.save_to_file(&path).unwrap();

        let loaded = TrackerConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_file(path);
    }
}
