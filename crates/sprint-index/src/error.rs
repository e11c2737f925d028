use std::path::PathBuf;

use sprint_types::Phase;
use thiserror::Error;

/// Errors that abort a build. Conditions the pipeline tolerates (unreadable
/// source directories, corrupt ledger or snapshot documents) never surface
/// here.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("output root has no usable directory name: {0}")]
    InvalidOutputRoot(PathBuf),

    #[error("no previous generation to restore at {0}")]
    NoPreviousGeneration(PathBuf),

    #[error("phase {0} selects no layout")]
    NoLayout(Phase),
}

impl From<serde_json::Error> for IndexError {
    fn from(e: serde_json::Error) -> Self {
        IndexError::Serialization(e.to_string())
    }
}

pub type IndexResult<T> = Result<T, IndexError>;

/// Attach the offending path to an I/O error.
pub(crate) trait IoContext<T> {
    fn at(self, path: impl Into<PathBuf>) -> IndexResult<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, path: impl Into<PathBuf>) -> IndexResult<T> {
        self.map_err(|source| IndexError::Io {
            path: path.into(),
            source,
        })
    }
}
