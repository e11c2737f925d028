use std::path::PathBuf;

use thiserror::Error;

/// Failures of the verifier itself. Contract violations in the verified tree
/// are reported through the verdict, never through this type.
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("cannot write verdict at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for VerifyError {
    fn from(e: serde_json::Error) -> Self {
        VerifyError::Serialization(e.to_string())
    }
}

pub type VerifyResult<T> = Result<T, VerifyError>;
