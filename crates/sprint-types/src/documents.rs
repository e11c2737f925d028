//! Derived documents rewritten on every build.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::layout::{LogKind, CATALOG_FILE, FLAT_VERSION, SHORT_RUN_ID_FORMAT, STATE_LATEST_FILE};
use crate::rows::StateRow;
use crate::run::RunStatus;

/// `state.latest.json`: the newest state row per prompt slug.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateLatest {
    pub updated_utc: String,
    pub prompts: BTreeMap<String, StateRow>,
}

/// Running aggregate for one prompt, published in `catalog.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromptAggregate {
    pub prompt_slug: String,
    pub run_count: u64,
    pub total_files: u64,
    pub total_bytes: u64,
    pub last_run_id: String,
    pub last_status: RunStatus,
    /// Serialized as a sorted list.
    pub source_families: BTreeSet<String>,
}

impl PromptAggregate {
    pub fn new(prompt_slug: impl Into<String>) -> Self {
        Self {
            prompt_slug: prompt_slug.into(),
            run_count: 0,
            total_files: 0,
            total_bytes: 0,
            last_run_id: String::new(),
            last_status: RunStatus::Unknown,
            source_families: BTreeSet::new(),
        }
    }

    /// Fold one run into the aggregate. Runs must arrive in assignment order
    /// for `last_*` to describe the newest run.
    pub fn record(
        &mut self,
        run_id: &str,
        status: RunStatus,
        source_family: &str,
        file_count: u64,
        total_bytes: u64,
    ) {
        self.run_count += 1;
        self.total_files += file_count;
        self.total_bytes += total_bytes;
        self.last_run_id = run_id.to_string();
        self.last_status = status;
        self.source_families.insert(source_family.to_string());
    }
}

/// `catalog.json`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub version: String,
    pub created_utc: String,
    pub prompt_count: usize,
    pub run_count: usize,
    pub indexed_artifacts: usize,
    pub prompts: Vec<PromptAggregate>,
    pub files: BTreeMap<String, String>,
}

impl Catalog {
    /// Logical file name map shared by every flat generation.
    pub fn file_map() -> BTreeMap<String, String> {
        let mut files: BTreeMap<String, String> = LogKind::ALL
            .iter()
            .map(|k| (k.layout_key().to_string(), k.file_name().to_string()))
            .collect();
        files.insert("state_latest".into(), STATE_LATEST_FILE.into());
        files
    }
}

/// `schema.json`: machine-readable layout contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaDoc {
    pub version: String,
    pub created_utc: String,
    pub short_run_id_format: String,
    pub layout: BTreeMap<String, String>,
}

impl SchemaDoc {
    pub fn flat(created_utc: impl Into<String>) -> Self {
        let mut layout = Catalog::file_map();
        layout.insert("catalog".into(), CATALOG_FILE.into());
        Self {
            version: FLAT_VERSION.to_string(),
            created_utc: created_utc.into(),
            short_run_id_format: SHORT_RUN_ID_FORMAT.to_string(),
            layout,
        }
    }
}

/// Footprint statistics of a generated tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeMetrics {
    pub dirs: u64,
    pub files: u64,
    pub small_files_le_120b: u64,
    pub max_depth: u64,
}

/// `SUMMARY.json`; also what a build reports, including incremental skips
/// (which are not written to disk).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub evolution: String,
    pub created_utc: String,
    pub source_run_count: usize,
    pub source_prompt_count: usize,
    pub indexed_artifacts: usize,
    /// Files copied into the generation; set by the copying layouts only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copied_files: Option<usize>,
    #[serde(default)]
    pub skipped_no_changes: bool,
    pub output_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_index_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_metrics: Option<TreeMetrics>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_tracks_last_run_and_families() {
        let mut agg = PromptAggregate::new("demo");
        agg.record("r0001", RunStatus::Success, "prism", 2, 10);
        agg.record("r0002", RunStatus::Failed, "codex", 3, 5);
        agg.record("r0003", RunStatus::Unknown, "codex", 0, 0);

        assert_eq!(agg.run_count, 3);
        assert_eq!(agg.total_files, 5);
        assert_eq!(agg.total_bytes, 15);
        assert_eq!(agg.last_run_id, "r0003");
        assert_eq!(agg.last_status, RunStatus::Unknown);

        let json = serde_json::to_value(&agg).unwrap();
        assert_eq!(json["source_families"], serde_json::json!(["codex", "prism"]));
    }

    #[test]
    fn schema_layout_names_every_file() {
        let schema = SchemaDoc::flat("2025-01-01T00:00:00Z");
        assert_eq!(schema.version, "v4-flat");
        assert_eq!(schema.layout["runs_log"], "runs.jsonl");
        assert_eq!(schema.layout["artifact_index"], "artifacts.jsonl");
        assert_eq!(schema.layout["state_latest"], "state.latest.json");
        assert_eq!(schema.layout["catalog"], "catalog.json");
        assert_eq!(schema.layout.len(), 6);
    }

    #[test]
    fn skip_summary_omits_build_only_fields() {
        let summary = GenerationSummary {
            evolution: FLAT_VERSION.into(),
            created_utc: "t".into(),
            source_run_count: 1,
            source_prompt_count: 1,
            indexed_artifacts: 3,
            copied_files: None,
            skipped_no_changes: true,
            output_path: "/out".into(),
            artifact_index_path: None,
            output_metrics: None,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("output_metrics").is_none());
        assert!(json.get("copied_files").is_none());
        assert_eq!(json["skipped_no_changes"], true);
    }
}
