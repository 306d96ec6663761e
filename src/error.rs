//! Error types for the geotally system.

use crate::messaging::MessagingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeotallyError {
    #[error("Failed to create record: {0}")]
    Create(String),
    #[error("Failed to read record: {0}")]
    Read(String),
    #[error("Failed to update record: {0}")]
    Update(String),
    #[error("Results for job {job_id} are not ready")]
    NotReady { job_id: String },
    #[error("Malformed message: {0}")]
    MalformedMessage(String),
    #[error("Unknown task '{task}'")]
    UnknownTask { task: String },
    #[error("Unknown {family} variant '{variant}'")]
    UnknownVariant { family: String, variant: String },
    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),
    #[error("Data source error: {0}")]
    DataSource(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl GeotallyError {
    pub fn not_ready(job_id: impl Into<String>) -> Self {
        Self::NotReady {
            job_id: job_id.into(),
        }
    }

    pub fn unknown_task(task: impl Into<String>) -> Self {
        Self::UnknownTask { task: task.into() }
    }

    pub fn unknown_variant(family: impl Into<String>, variant: impl Into<String>) -> Self {
        Self::UnknownVariant {
            family: family.into(),
            variant: variant.into(),
        }
    }

    /// Whether a later attempt at the same operation can reasonably succeed.
    ///
    /// Loop drivers never stop on an error either way; this only decides how
    /// the failure is logged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Create(_)
            | Self::Read(_)
            | Self::Update(_)
            | Self::NotReady { .. }
            | Self::DataSource(_) => true,
            Self::Messaging(e) => e.is_retryable(),
            Self::MalformedMessage(_)
            | Self::UnknownTask { .. }
            | Self::UnknownVariant { .. }
            | Self::Validation(_)
            | Self::Configuration(_)
            | Self::InvalidState(_) => false,
        }
    }
}

impl From<serde_json::Error> for GeotallyError {
    fn from(error: serde_json::Error) -> Self {
        GeotallyError::Validation(format!("JSON serialization error: {error}"))
    }
}

pub type Result<T> = std::result::Result<T, GeotallyError>;
