//! Rows of the four append-only logs.
//!
//! Every row carries `run_key` and `run_ref`; the verifier checks both against
//! `runs.jsonl`. Rows are written once and never rewritten.

use serde::{Deserialize, Serialize};

use crate::layout::LogKind;
use crate::run::{AssignedRun, RunStatus};

/// History event tag for a run entering the index.
pub const RUN_INDEXED_EVENT: &str = "run_indexed";

/// One line of `runs.jsonl`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummaryRow {
    pub prompt_slug: String,
    pub run_id: String,
    pub run_seq: u32,
    pub run_key: String,
    pub run_ref: String,
    pub status: RunStatus,
    pub source_family: String,
    pub source_prompt_label: String,
    pub source_run_label: String,
    pub source_run_path: String,
    pub file_count: usize,
    pub total_bytes: u64,
    pub indexed_utc: String,
}

impl RunSummaryRow {
    pub fn new(run: &AssignedRun, status: RunStatus, indexed_utc: &str) -> Self {
        Self {
            prompt_slug: run.run.prompt_slug.clone(),
            run_id: run.run_id.to_string(),
            run_seq: run.run_seq,
            run_key: run.run_key.clone(),
            run_ref: run.run_ref(),
            status,
            source_family: run.run.source_family.clone(),
            source_prompt_label: run.run.source_prompt_label.clone(),
            source_run_label: run.run.source_run_label.clone(),
            source_run_path: run.run.source_run_path.clone(),
            file_count: run.run.file_count(),
            total_bytes: run.run.total_bytes,
            indexed_utc: indexed_utc.to_string(),
        }
    }
}

/// One line of `state.jsonl`; also the value type of `state.latest.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateRow {
    pub prompt_slug: String,
    pub run_id: String,
    pub run_seq: u32,
    pub run_key: String,
    pub run_ref: String,
    pub status: RunStatus,
    pub indexed_utc: String,
}

impl From<&RunSummaryRow> for StateRow {
    fn from(summary: &RunSummaryRow) -> Self {
        Self {
            prompt_slug: summary.prompt_slug.clone(),
            run_id: summary.run_id.clone(),
            run_seq: summary.run_seq,
            run_key: summary.run_key.clone(),
            run_ref: summary.run_ref.clone(),
            status: summary.status,
            indexed_utc: summary.indexed_utc.clone(),
        }
    }
}

/// One line of `history.jsonl`: a run summary tagged with an event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub event: String,
    #[serde(flatten)]
    pub run: RunSummaryRow,
}

impl HistoryRow {
    pub fn run_indexed(run: RunSummaryRow) -> Self {
        Self {
            event: RUN_INDEXED_EVENT.to_string(),
            run,
        }
    }
}

/// One line of `artifacts.jsonl`. Artifacts are referenced in place, not copied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRow {
    pub prompt_slug: String,
    pub run_id: String,
    pub run_seq: u32,
    pub run_key: String,
    pub run_ref: String,
    pub file_name: String,
    pub rel_path: String,
    pub source_abs: String,
    pub bytes: u64,
    pub sha256: String,
    pub indexed_utc: String,
}

/// Closed set of log rows.
#[derive(Clone, Debug, PartialEq)]
pub enum IndexRow {
    Run(RunSummaryRow),
    State(StateRow),
    History(HistoryRow),
    Artifact(ArtifactRow),
}

impl IndexRow {
    pub fn kind(&self) -> LogKind {
        match self {
            IndexRow::Run(_) => LogKind::Runs,
            IndexRow::State(_) => LogKind::State,
            IndexRow::History(_) => LogKind::History,
            IndexRow::Artifact(_) => LogKind::Artifacts,
        }
    }

    pub fn run_key(&self) -> &str {
        match self {
            IndexRow::Run(r) => &r.run_key,
            IndexRow::State(r) => &r.run_key,
            IndexRow::History(r) => &r.run.run_key,
            IndexRow::Artifact(r) => &r.run_key,
        }
    }

    /// Serialize as one JSONL line (no trailing newline) with keys sorted.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        // Going through `Value` sorts object keys (BTreeMap-backed map).
        let value = match self {
            IndexRow::Run(r) => serde_json::to_value(r)?,
            IndexRow::State(r) => serde_json::to_value(r)?,
            IndexRow::History(r) => serde_json::to_value(r)?,
            IndexRow::Artifact(r) => serde_json::to_value(r)?,
        };
        serde_json::to_string(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::RunId;
    use crate::run::LegacyRun;

    fn assigned() -> AssignedRun {
        AssignedRun::new(
            LegacyRun {
                source_family: "prism".into(),
                source_root: "/r".into(),
                source_prompt_label: "prism".into(),
                source_run_label: "run-a".into(),
                source_run_path: "/r/run-a".into(),
                prompt_slug: "prompt-13".into(),
                sort_epoch: 0.0,
                files: vec!["events.ndjson".into()],
                total_bytes: 5,
            },
            RunId::from_seq(1),
        )
    }

    #[test]
    fn history_row_flattens_summary() {
        let summary = RunSummaryRow::new(&assigned(), RunStatus::Success, "2025-01-01T00:00:00Z");
        let line = IndexRow::History(HistoryRow::run_indexed(summary)).to_json_line().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["event"], "run_indexed");
        assert_eq!(value["run_key"], "prompt-13--r0001");
        assert_eq!(value["status"], "success");
        assert!(value.get("run").is_none());
    }

    #[test]
    fn json_lines_have_sorted_keys() {
        let summary = RunSummaryRow::new(&assigned(), RunStatus::Unknown, "t");
        let line = IndexRow::State(StateRow::from(&summary)).to_json_line().unwrap();
        assert!(line.starts_with("{\"indexed_utc\""));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn state_row_mirrors_summary_identity() {
        let summary = RunSummaryRow::new(&assigned(), RunStatus::Failed, "t");
        let state = StateRow::from(&summary);
        assert_eq!(state.run_ref, summary.run_ref);
        assert_eq!(state.run_seq, 1);
        assert_eq!(state.status, RunStatus::Failed);
        assert_eq!(IndexRow::State(state).kind(), LogKind::State);
    }
}
