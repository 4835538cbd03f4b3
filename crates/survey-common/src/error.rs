//! Error types shared across the survey workspace

use thiserror::Error;

/// Result type alias for survey operations
pub type Result<T> = std::result::Result<T, SurveyError>;

/// Main error type for the survey workspace
#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
