//! JSON and JSONL writers for generation files.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sprint_types::{IndexRow, LogKind};

use crate::error::{IndexResult, IoContext};

/// Write pretty JSON (2-space indent) with a trailing newline.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> IndexResult<()> {
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');
    std::fs::write(path, body).at(path)
}

/// Like [`write_json`], but lands the file with a rename so readers never see
/// a half-written document.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> IndexResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).at(parent)?;
        }
    }
    let tmp_path = path.with_extension("tmp");
    write_json(&tmp_path, value)?;
    std::fs::rename(&tmp_path, path).at(path)
}

/// Append one compact JSON line to `path`, creating the file if needed.
pub fn append_jsonl<T: Serialize + ?Sized>(path: &Path, value: &T) -> IndexResult<()> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .at(path)?;
    file.write_all(line.as_bytes()).at(path)
}

/// The four append-only logs of one generation, opened for appending.
pub struct IndexLogs {
    runs: LogFile,
    state: LogFile,
    history: LogFile,
    artifacts: LogFile,
}

struct LogFile {
    path: PathBuf,
    writer: BufWriter<File>,
    rows: usize,
}

impl LogFile {
    fn open(root: &Path, kind: LogKind) -> IndexResult<Self> {
        let path = root.join(kind.file_name());
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .at(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            rows: 0,
        })
    }
}

impl IndexLogs {
    /// Open (creating if needed) every log under `root`.
    pub fn open(root: &Path) -> IndexResult<Self> {
        Ok(Self {
            runs: LogFile::open(root, LogKind::Runs)?,
            state: LogFile::open(root, LogKind::State)?,
            history: LogFile::open(root, LogKind::History)?,
            artifacts: LogFile::open(root, LogKind::Artifacts)?,
        })
    }

    fn log_mut(&mut self, kind: LogKind) -> &mut LogFile {
        match kind {
            LogKind::Runs => &mut self.runs,
            LogKind::State => &mut self.state,
            LogKind::History => &mut self.history,
            LogKind::Artifacts => &mut self.artifacts,
        }
    }

    /// Append one row to the log matching its kind.
    pub fn append(&mut self, row: &IndexRow) -> IndexResult<()> {
        let mut line = row.to_json_line()?;
        line.push('\n');
        let log = self.log_mut(row.kind());
        log.writer.write_all(line.as_bytes()).at(&log.path)?;
        log.rows += 1;
        Ok(())
    }

    /// Rows appended to `kind` through this handle.
    pub fn rows(&self, kind: LogKind) -> usize {
        match kind {
            LogKind::Runs => self.runs.rows,
            LogKind::State => self.state.rows,
            LogKind::History => self.history.rows,
            LogKind::Artifacts => self.artifacts.rows,
        }
    }

    /// Flush and fsync every log.
    pub fn finish(mut self) -> IndexResult<()> {
        for kind in LogKind::ALL {
            let log = self.log_mut(kind);
            log.writer.flush().at(&log.path)?;
            log.writer.get_ref().sync_all().at(&log.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprint_types::{AssignedRun, LegacyRun, RunId, RunStatus, RunSummaryRow, StateRow};

    fn summary() -> RunSummaryRow {
        let run = AssignedRun::new(
            LegacyRun {
                source_family: "codex".into(),
                source_root: "/r".into(),
                source_prompt_label: "Demo".into(),
                source_run_label: "one".into(),
                source_run_path: "/r/Demo/one".into(),
                prompt_slug: "demo".into(),
                sort_epoch: 1.0,
                files: vec![],
                total_bytes: 0,
            },
            RunId::from_seq(1),
        );
        RunSummaryRow::new(&run, RunStatus::Success, "2025-01-01T00:00:00Z")
    }

    #[test]
    fn logs_append_one_line_per_row() {
        let dir = tempfile::tempdir().unwrap();
        let mut logs = IndexLogs::open(dir.path()).unwrap();
        let row = summary();
        logs.append(&IndexRow::Run(row.clone())).unwrap();
        logs.append(&IndexRow::State(StateRow::from(&row))).unwrap();
        logs.append(&IndexRow::State(StateRow::from(&row))).unwrap();
        assert_eq!(logs.rows(LogKind::State), 2);
        logs.finish().unwrap();

        let runs = std::fs::read_to_string(dir.path().join("runs.jsonl")).unwrap();
        let state = std::fs::read_to_string(dir.path().join("state.jsonl")).unwrap();
        assert_eq!(runs.lines().count(), 1);
        assert_eq!(state.lines().count(), 2);
        // Untouched logs still exist.
        assert!(dir.path().join("artifacts.jsonl").is_file());

        let parsed: RunSummaryRow = serde_json::from_str(runs.lines().next().unwrap()).unwrap();
        assert_eq!(parsed, row);
    }

    #[test]
    fn jsonl_appends_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        append_jsonl(&path, &serde_json::json!({"n": 1})).unwrap();
        append_jsonl(&path, &serde_json::json!({"n": 2})).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"n\":1}\n{\"n\":2}\n");
    }

    #[test]
    fn atomic_json_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.json");
        write_json_atomic(&path, &serde_json::json!({"a": 1})).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.ends_with("}\n"));
        assert!(!path.with_extension("tmp").exists());
    }
}
