use thiserror::Error;

use crate::observation::ObservationError;
use crate::simulator::SimulatorError;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("Invalid configuration {key}={value}: {reason}")]
    Config { key: String, value: String, reason: String },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Simulator error: {0}")]
    Simulator(#[from] SimulatorError),

    #[error("Observation error: {0}")]
    Observation(#[from] ObservationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl EnvError {
    pub fn config(key: impl Into<String>, value: impl ToString, reason: impl Into<String>) -> Self {
        EnvError::Config { key: key.into(), value: value.to_string(), reason: reason.into() }
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        EnvError::InvariantViolation(msg.into())
    }

    pub fn is_config(&self) -> bool {
        matches!(self, EnvError::Config { .. })
    }

    /// Offending key for configuration errors
    pub fn config_key(&self) -> Option<&str> {
        match self {
            EnvError::Config { key, .. } => Some(key),
            _ => None,
        }
    }
}

pub type EnvResult<T> = std::result::Result<T, EnvError>;
