//! Error types for the workout_core library.

use crate::types::Step;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for workout_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// An action was attempted in a step that does not allow it, or its
    /// precondition was not met. Session state is left untouched.
    #[error("Invalid transition from {step:?}: {reason}")]
    InvalidTransition { step: Step, reason: String },

    /// A planned exercise does not match the session's muscle group or environment
    #[error("Plan filter violation: {0}")]
    PlanFilter(String),

    /// Storage collaborator error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn transition(step: Step, reason: impl Into<String>) -> Self {
        Error::InvalidTransition {
            step,
            reason: reason.into(),
        }
    }
}
