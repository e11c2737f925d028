//! Documents of the two earlier published layouts.
//!
//! The copied-tree layout (`v1`) keeps each run's files under
//! `runs/<run_key>/` with per-prompt state files; the blob layout (`v2`)
//! flattens artifacts into `blobs/<prompt_slug>/` with per-prompt logs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::layout::{BLOB_VERSION, TREE_VERSION};
use crate::run::AssignedRun;

/// `catalog/schema.json` of a legacy layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegacySchemaDoc {
    pub version: String,
    pub created_utc: String,
    pub layout: BTreeMap<String, String>,
    pub notes: Vec<String>,
}

impl LegacySchemaDoc {
    pub fn tree(created_utc: impl Into<String>) -> Self {
        Self::new(
            TREE_VERSION,
            created_utc,
            &[
                ("runs", "runs/<prompt-slug>--<rNNNN>/"),
                ("prompt_state", "prompts/<prompt-slug>/state.json"),
                ("prompt_history", "prompts/<prompt-slug>/history.jsonl"),
                ("global_run_log", "catalog/runs.jsonl"),
            ],
            &[
                "Short run ids replace timestamp folder names.",
                "Prompt state and history are machine-readable append targets.",
            ],
        )
    }

    pub fn blob(created_utc: impl Into<String>) -> Self {
        Self::new(
            BLOB_VERSION,
            created_utc,
            &[
                ("state_log", "state/<prompt-slug>.jsonl"),
                ("state_latest", "state/<prompt-slug>.latest.json"),
                ("history", "history/<prompt-slug>.jsonl"),
                ("global_history", "history/all-runs.jsonl"),
                ("run_summary", "runs/<prompt-slug>--<rNNNN>.json"),
                ("blobs", "blobs/<prompt-slug>/<rNNNN>__<artifact-file>"),
            ],
            &[
                "Run metadata is append-only JSONL.",
                "Artifacts are flattened to one prompt folder with run-id prefixes.",
            ],
        )
    }

    fn new(
        version: &str,
        created_utc: impl Into<String>,
        layout: &[(&str, &str)],
        notes: &[&str],
    ) -> Self {
        Self {
            version: version.to_string(),
            created_utc: created_utc.into(),
            layout: layout
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            notes: notes.iter().map(|n| n.to_string()).collect(),
        }
    }
}

/// Run identity and source fields shared by both legacy run records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegacyRunFields {
    pub prompt_slug: String,
    pub run_id: String,
    pub run_seq: u32,
    pub run_key: String,
    pub source_family: String,
    pub source_prompt_label: String,
    pub source_run_label: String,
    pub source_run_path: String,
    pub file_count: usize,
    pub total_bytes: u64,
}

impl From<&AssignedRun> for LegacyRunFields {
    fn from(run: &AssignedRun) -> Self {
        Self {
            prompt_slug: run.prompt_slug().to_string(),
            run_id: run.run_id.to_string(),
            run_seq: run.run_seq,
            run_key: run.run_key.clone(),
            source_family: run.run.source_family.clone(),
            source_prompt_label: run.run.source_prompt_label.clone(),
            source_run_label: run.run.source_run_label.clone(),
            source_run_path: run.run.source_run_path.clone(),
            file_count: run.run.file_count(),
            total_bytes: run.run.total_bytes,
        }
    }
}

/// Copied-tree run record: a line of `catalog/runs.jsonl` and of the
/// prompt's `history.jsonl`, and the prompt's `state.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeRunRecord {
    #[serde(flatten)]
    pub run: LegacyRunFields,
    pub target_run_path: String,
    pub indexed_utc: String,
}

/// `catalog/prompts.json` of the copied-tree layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreePromptCatalog {
    pub created_utc: String,
    pub prompt_count: usize,
    pub run_count: usize,
    pub runs_per_prompt: BTreeMap<String, usize>,
}

/// One copied artifact of a blob-layout run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobEntry {
    /// File name under `blobs/<prompt_slug>/`.
    pub name: String,
    pub source_rel: String,
    pub bytes: u64,
}

/// Blob-layout run record, appended to the history and state logs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlobRunRecord {
    #[serde(flatten)]
    pub run: LegacyRunFields,
    pub blob_count: usize,
    pub blob_collision_count: usize,
    pub indexed_utc: String,
}

/// `runs/<run_key>.json`: the run record plus its blob listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlobRunSummary {
    #[serde(flatten)]
    pub record: BlobRunRecord,
    pub blobs: Vec<BlobEntry>,
}

/// Per-prompt totals of the blob layout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobPromptStats {
    pub prompt_slug: String,
    pub run_count: usize,
    pub total_files: usize,
    pub total_bytes: u64,
    pub last_run_id: String,
}

/// `catalog/prompts.json` of the blob layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlobPromptCatalog {
    pub created_utc: String,
    pub prompt_count: usize,
    pub run_count: usize,
    pub prompts: Vec<BlobPromptStats>,
}
