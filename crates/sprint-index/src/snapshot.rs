//! Snapshot gate for incremental rebuilds.
//!
//! A snapshot projects each run onto its count, size and timestamp. Content
//! edits that keep all three unchanged are not detected.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sprint_types::layout::{FLAT_REQUIRED_FILES, SNAPSHOT_FILE};
use sprint_types::AssignedRun;
use tracing::debug;

pub const SNAPSHOT_VERSION: &str = "v1";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub prompt_slug: String,
    pub source_family: String,
    pub source_run_path: String,
    pub source_run_label: String,
    pub file_count: usize,
    pub total_bytes: u64,
    pub sort_epoch: f64,
}

/// Deterministic projection of a discovered run set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceSnapshot {
    pub version: String,
    pub run_count: usize,
    pub runs: Vec<SnapshotRow>,
}

impl SourceSnapshot {
    pub fn from_runs(runs: &[AssignedRun]) -> Self {
        let mut rows: Vec<SnapshotRow> = runs
            .iter()
            .map(|r| SnapshotRow {
                prompt_slug: r.run.prompt_slug.clone(),
                source_family: r.run.source_family.clone(),
                source_run_path: r.run.source_run_path.clone(),
                source_run_label: r.run.source_run_label.clone(),
                file_count: r.run.file_count(),
                total_bytes: r.run.total_bytes,
                sort_epoch: r.run.sort_epoch,
            })
            .collect();
        rows.sort_by(|a, b| {
            (&a.prompt_slug, &a.source_family, &a.source_run_path, &a.source_run_label).cmp(&(
                &b.prompt_slug,
                &b.source_family,
                &b.source_run_path,
                &b.source_run_label,
            ))
        });
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            run_count: rows.len(),
            runs: rows,
        }
    }
}

fn non_empty_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// True when `published_root` holds a complete generation whose persisted
/// snapshot deep-equals `snapshot`.
pub fn should_skip(published_root: &Path, snapshot: &SourceSnapshot) -> bool {
    if let Some(missing) = FLAT_REQUIRED_FILES
        .iter()
        .find(|name| !non_empty_file(&published_root.join(name)))
    {
        debug!(file = missing, "published generation incomplete, rebuilding");
        return false;
    }
    let path = published_root.join(SNAPSHOT_FILE);
    let previous: Value = match std::fs::read_to_string(&path)
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok())
    {
        Some(value) => value,
        None => {
            debug!(path = %path.display(), "no usable previous snapshot, rebuilding");
            return false;
        }
    };
    match serde_json::to_value(snapshot) {
        Ok(current) => current == previous,
        Err(_) => false,
    }
}
