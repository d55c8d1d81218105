//! Error type for the timetabling engine.
//!
//! Contention between courses is never an error: it is reported as
//! [`Conflict`](crate::models::Conflict)s. Errors cover malformed
//! configuration, parsing failures and faults inside the pipeline, which the
//! solver converts into an unsuccessful outcome instead of propagating.

use thiserror::Error;

/// Errors raised by the timetabling engine.
#[derive(Error, Debug)]
pub enum TimetableError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Booking guard failure: {0}")]
    Guard(String),
    #[error("Pipeline failure in {stage}: {message}")]
    Pipeline { stage: String, message: String },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TimetableError {
    /// Creates a pipeline error tagged with the stage that raised it.
    pub fn pipeline(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pipeline {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = TimetableError> = std::result::Result<T, E>;
