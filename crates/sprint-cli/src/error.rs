//! CLI error types

use sprint_index::IndexError;
use sprint_verify::VerifyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Build error: {0}")]
    Index(#[from] IndexError),

    #[error("Verify error: {0}")]
    Verify(#[from] VerifyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<config::ConfigError> for CliError {
    fn from(e: config::ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;
