use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{run_key, run_ref, RunId};

/// One run directory found under a legacy evidence root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegacyRun {
    /// Layout family the run was found in (`codex`, `prism`, ...).
    pub source_family: String,
    /// Evidence root that was scanned.
    pub source_root: String,
    /// Prompt label as it appeared on disk (or the family's fixed label).
    pub source_prompt_label: String,
    /// Run directory name.
    pub source_run_label: String,
    /// Absolute run directory path.
    pub source_run_path: String,
    pub prompt_slug: String,
    /// UTC seconds from the label's timestamp token, else directory mtime, else 0.
    pub sort_epoch: f64,
    /// Relative POSIX paths of every file in the run, in path order.
    pub files: Vec<String>,
    /// Sum of file sizes that could be stat'ed.
    pub total_bytes: u64,
}

impl LegacyRun {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// A run with its ledger-assigned identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssignedRun {
    #[serde(flatten)]
    pub run: LegacyRun,
    pub run_seq: u32,
    pub run_id: RunId,
    pub run_key: String,
}

impl AssignedRun {
    pub fn new(run: LegacyRun, run_id: RunId) -> Self {
        let run_key = run_key(&run.prompt_slug, &run_id);
        Self {
            run_seq: run_id.seq(),
            run_id,
            run_key,
            run,
        }
    }

    pub fn run_ref(&self) -> String {
        run_ref(&self.run_key)
    }

    pub fn prompt_slug(&self) -> &str {
        &self.run.prompt_slug
    }
}

/// Best-effort run outcome inferred from literal markers in run evidence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
    Blocked,
    #[default]
    Unknown,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
            RunStatus::Blocked => "blocked",
            RunStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy(slug: &str) -> LegacyRun {
        LegacyRun {
            source_family: "codex".into(),
            source_root: "/repo/temp/codex/evidence".into(),
            source_prompt_label: slug.into(),
            source_run_label: "20250101T000000Z".into(),
            source_run_path: format!("/repo/temp/codex/evidence/{slug}/20250101T000000Z"),
            prompt_slug: slug.into(),
            sort_epoch: 1_735_689_600.0,
            files: vec!["a.txt".into(), "logs/b.txt".into()],
            total_bytes: 10,
        }
    }

    #[test]
    fn assigned_run_derives_key_and_ref() {
        let run = AssignedRun::new(legacy("demo"), RunId::from_seq(2));
        assert_eq!(run.run_seq, 2);
        assert_eq!(run.run_key, "demo--r0002");
        assert_eq!(run.run_ref(), "runs.jsonl#demo--r0002");
        assert_eq!(run.run.file_count(), 2);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RunStatus::Blocked).unwrap(), "\"blocked\"");
        assert_eq!(RunStatus::default(), RunStatus::Unknown);
        assert_eq!(RunStatus::Failed.to_string(), "failed");
    }
}
