//! Published layout generations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::{BLOB_VERSION, FLAT_VERSION, TREE_VERSION};

/// Layout generation to build or verify.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Phase {
    /// `1`: copied run trees with per-prompt state files.
    Tree,
    /// `2`: flattened artifact blobs with per-prompt logs.
    Blob,
    /// `3`: flat append-only index.
    #[default]
    Flat,
    /// Every phase in turn.
    All,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown phase {0:?} (expected 1, 2, 3 or all)")]
pub struct UnknownPhase(pub String);

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Tree => "1",
            Phase::Blob => "2",
            Phase::Flat => "3",
            Phase::All => "all",
        }
    }

    /// Concrete layouts covered, in build order.
    pub fn layouts(self) -> &'static [Phase] {
        match self {
            Phase::Tree => &[Phase::Tree],
            Phase::Blob => &[Phase::Blob],
            Phase::Flat => &[Phase::Flat],
            Phase::All => &[Phase::Tree, Phase::Blob, Phase::Flat],
        }
    }

    /// Version tag declared by the layout's schema and summary; `None` for
    /// [`Phase::All`].
    pub fn version(self) -> Option<&'static str> {
        match self {
            Phase::Tree => Some(TREE_VERSION),
            Phase::Blob => Some(BLOB_VERSION),
            Phase::Flat => Some(FLAT_VERSION),
            Phase::All => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Phase::Tree),
            "2" => Ok(Phase::Blob),
            "3" => Ok(Phase::Flat),
            "all" => Ok(Phase::All),
            other => Err(UnknownPhase(other.to_string())),
        }
    }
}

impl TryFrom<String> for Phase {
    type Error = UnknownPhase;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Phase> for String {
    fn from(phase: Phase) -> Self {
        phase.as_str().to_string()
    }
}
