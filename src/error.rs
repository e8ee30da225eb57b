//! Error types for the release trigger.
//!
//! Synchronous failures (`Configuration`, `JobNotFound`, `Scheduling`,
//! `InvalidParameters`) are returned directly from `ReleaseExecution::start` before
//! any correlation token can be matched by an event. `Aborted` and `BuildFailed`
//! arrive asynchronously through the continuation, and `EngineCancelled` is what
//! `ReleaseExecution::stop` delivers.

use thiserror::Error;

use crate::models::{RunReference, RunResult};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReleaseError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No parametrized job named {job_name} found")]
    JobNotFound { job_name: String },

    #[error("Failed to trigger build of {job_name}")]
    Scheduling { job_name: String },

    #[error("Invalid parameters for {job_name}: {reason} ({names:?})")]
    InvalidParameters {
        job_name: String,
        names: Vec<String>,
        reason: String,
    },

    #[error("Build of {job_name} was cancelled")]
    Aborted { job_name: String },

    #[error("Build {run} finished with result {result}")]
    BuildFailed {
        job_name: String,
        run: RunReference,
        result: RunResult,
    },

    #[error("Release of {job_name} was stopped: {reason}")]
    EngineCancelled { job_name: String, reason: String },

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),
}

impl ReleaseError {
    /// Name of the downstream job the failure concerns, when there is one
    pub fn job_name(&self) -> Option<&str> {
        match self {
            Self::JobNotFound { job_name }
            | Self::Scheduling { job_name }
            | Self::InvalidParameters { job_name, .. }
            | Self::Aborted { job_name }
            | Self::BuildFailed { job_name, .. }
            | Self::EngineCancelled { job_name, .. } => Some(job_name),
            Self::Configuration(_) | Self::ConfigLoad(_) => None,
        }
    }

    /// Whether the error is raised from `start()` rather than through the continuation
    pub fn is_synchronous(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::JobNotFound { .. }
                | Self::Scheduling { .. }
                | Self::InvalidParameters { .. }
                | Self::ConfigLoad(_)
        )
    }
}

impl From<config::ConfigError> for ReleaseError {
    fn from(err: config::ConfigError) -> Self {
        ReleaseError::ConfigLoad(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReleaseError>;
