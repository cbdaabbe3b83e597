use thiserror::Error;

/// Errors raised by the detector. Empty and zero-variance windows are not errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectError {
    #[error("Invalid reading at index {index}: value {value} is not finite")]
    InvalidReading { index: usize, value: f64 },

    #[error("Invalid threshold {0}: must be finite and non-negative")]
    InvalidThreshold(f64),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}
