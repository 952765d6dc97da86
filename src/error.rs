use thiserror::Error;

/// Why a raw device line could not be turned into a sample.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Expected at least {expected} fields, found {found}")]
    TooFewFields { expected: usize, found: usize },

    #[error("Field {index} is not a number: {token:?}")]
    InvalidNumber { index: usize, token: String },

    #[error("Field {index} is not finite")]
    NonFinite { index: usize },

    #[error("Line is not valid UTF-8")]
    InvalidUtf8,
}

/// Rep tracker error types
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Timed out waiting for sensor reply")]
    Timeout,

    #[error("No sample decoded during calibration ({requested} requested)")]
    InsufficientCalibrationData { requested: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TrackerError {
    /// Per-sample conditions that the acquisition loops skip after a backoff.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TrackerError::Decode(_) | TrackerError::Timeout)
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(TrackerError::Timeout.is_recoverable());
        assert!(TrackerError::Decode(DecodeError::InvalidUtf8).is_recoverable());
        assert!(!TrackerError::InsufficientCalibrationData { requested: 10 }.is_recoverable());
        assert!(!TrackerError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
            .is_recoverable());
    }

    #[test]
    fn test_decode_error_message() {
        let err = TrackerError::from(DecodeError::TooFewFields {
            expected: 3,
            found: 1,
        });
        assert_eq!(
            err.to_string(),
            "Decode failed: Expected at least 3 fields, found 1"
        );
    }
}
