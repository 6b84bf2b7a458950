//! Error types for spectral-fx

use thiserror::Error;

/// Core error type
///
/// Audio-rate processing never fails; these errors only surface on
/// configuration paths (sample-rate validation, preset loading).
#[derive(Error, Debug)]
pub enum DspError {
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f32),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for DspError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias
pub type DspResult<T> = Result<T, DspError>;
