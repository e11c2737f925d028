//! File names and version tags of the flat published layout.

use serde::{Deserialize, Serialize};

/// Version tag declared by `schema.json`, `catalog.json` and `SUMMARY.json`.
pub const FLAT_VERSION: &str = "v4-flat";

/// Version tag of the copied-tree layout.
pub const TREE_VERSION: &str = "v1";

/// Version tag of the flattened-blob layout.
pub const BLOB_VERSION: &str = "v2";

/// Human description of the run id scheme, published in `schema.json`.
pub const SHORT_RUN_ID_FORMAT: &str = "rNNNN (per prompt sequence)";

pub const STATE_LATEST_FILE: &str = "state.latest.json";
pub const CATALOG_FILE: &str = "catalog.json";
pub const SCHEMA_FILE: &str = "schema.json";
pub const SUMMARY_FILE: &str = "SUMMARY.json";
pub const README_FILE: &str = "README.md";
pub const SNAPSHOT_FILE: &str = "source_snapshot.json";
pub const VERDICT_FILE: &str = "verify.result.json";
pub const HELPERS_MANIFEST_FILE: &str = "helpers.manifest.json";

/// The four append-only logs of a generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Runs,
    State,
    History,
    Artifacts,
}

impl LogKind {
    pub const ALL: [LogKind; 4] = [
        LogKind::Runs,
        LogKind::State,
        LogKind::History,
        LogKind::Artifacts,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            LogKind::Runs => "runs.jsonl",
            LogKind::State => "state.jsonl",
            LogKind::History => "history.jsonl",
            LogKind::Artifacts => "artifacts.jsonl",
        }
    }

    /// Logical name used in `schema.json` layout and `catalog.json` file maps.
    pub fn layout_key(self) -> &'static str {
        match self {
            LogKind::Runs => "runs_log",
            LogKind::State => "state_log",
            LogKind::History => "history_log",
            LogKind::Artifacts => "artifact_index",
        }
    }
}

/// Files a complete flat generation must contain, non-empty.
pub const FLAT_REQUIRED_FILES: [&str; 9] = [
    "state.jsonl",
    STATE_LATEST_FILE,
    "history.jsonl",
    "runs.jsonl",
    "artifacts.jsonl",
    CATALOG_FILE,
    SCHEMA_FILE,
    SUMMARY_FILE,
    README_FILE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_log_is_required() {
        for kind in LogKind::ALL {
            assert!(FLAT_REQUIRED_FILES.contains(&kind.file_name()));
        }
    }
}
