//! Flat index builder.
//!
//! Writes one complete generation into an isolated directory: four
//! append-only logs plus the derived views rewritten on every build.
//! Artifacts are indexed by reference; source bytes are hashed, never copied.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sprint_types::layout::{
    CATALOG_FILE, README_FILE, SCHEMA_FILE, SNAPSHOT_FILE, STATE_LATEST_FILE, SUMMARY_FILE,
};
use sprint_types::{
    now_utc_iso, sha256_file, ArtifactRow, AssignedRun, Catalog, GenerationSummary, HistoryRow,
    IndexRow, LogKind, PromptAggregate, RunSummaryRow, SchemaDoc, StateLatest, StateRow,
    FLAT_VERSION,
};
use tracing::{debug, info};

use crate::error::{IndexResult, IoContext};
use crate::io::{write_json, IndexLogs};
use crate::metrics::tree_metrics;
use crate::snapshot::SourceSnapshot;
use crate::status::detect_status;

/// Published `README.md` when no reference document is available.
pub const README_FALLBACK: &str = "\
# Sprint evidence index (flat layout)

Compact machine-readable index over legacy sprint evidence.

Core files:
- `state.jsonl`: append-only state rows, one per run
- `state.latest.json`: latest state row per prompt slug
- `history.jsonl`: append-only history events
- `runs.jsonl`: append-only run summaries
- `artifacts.jsonl`: append-only artifact index (`sha256`, size, source path)
- `catalog.json`: prompt/run catalog and file map
- `schema.json`: machine-readable layout contract
- `SUMMARY.json`: latest generation summary

Every row carries `run_key` (`<prompt_slug>--<run_id>`) and
`run_ref` (`runs.jsonl#<run_key>`). Rebuild with `sprint build`; check with
`sprint verify`.
";

/// Builds a flat generation into `root`.
#[derive(Clone, Debug)]
pub struct IndexBuilder {
    root: PathBuf,
    published: PathBuf,
    reference_doc: Option<PathBuf>,
}

impl IndexBuilder {
    /// `root` is where files are written; `published` is the path the
    /// generation will be served from, recorded in `SUMMARY.json`.
    pub fn new(root: impl Into<PathBuf>, published: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            published: published.into(),
            reference_doc: None,
        }
    }

    /// Canonical README copied into the generation when it exists.
    pub fn with_reference_doc(mut self, doc: Option<PathBuf>) -> Self {
        self.reference_doc = doc;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write every file of the generation. `runs` must be in assignment order.
    pub fn build(
        &self,
        runs: &[AssignedRun],
        snapshot: &SourceSnapshot,
    ) -> IndexResult<GenerationSummary> {
        std::fs::create_dir_all(&self.root).at(&self.root)?;
        self.write_readme()?;
        write_json(&self.root.join(SCHEMA_FILE), &SchemaDoc::flat(now_utc_iso()))?;

        let mut logs = IndexLogs::open(&self.root)?;
        let mut latest: BTreeMap<String, StateRow> = BTreeMap::new();
        let mut aggregates: BTreeMap<String, PromptAggregate> = BTreeMap::new();

        for run in runs {
            let run_dir = Path::new(&run.run.source_run_path);
            let status = detect_status(run_dir);
            let indexed_utc = now_utc_iso();
            let summary = RunSummaryRow::new(run, status, &indexed_utc);
            let state = StateRow::from(&summary);

            logs.append(&IndexRow::Run(summary.clone()))?;
            logs.append(&IndexRow::History(HistoryRow::run_indexed(summary)))?;
            logs.append(&IndexRow::State(state.clone()))?;
            latest.insert(run.prompt_slug().to_string(), state);

            for rel in &run.run.files {
                let row = artifact_row(run, run_dir, rel, &indexed_utc)?;
                logs.append(&IndexRow::Artifact(row))?;
            }

            aggregates
                .entry(run.prompt_slug().to_string())
                .or_insert_with(|| PromptAggregate::new(run.prompt_slug()))
                .record(
                    run.run_id.as_str(),
                    status,
                    &run.run.source_family,
                    run.run.file_count() as u64,
                    run.run.total_bytes,
                );
            debug!(run_key = %run.run_key, status = %status, files = run.run.file_count(), "run indexed");
        }

        let run_count = logs.rows(LogKind::Runs);
        let indexed_artifacts = logs.rows(LogKind::Artifacts);
        logs.finish()?;

        write_json(
            &self.root.join(STATE_LATEST_FILE),
            &StateLatest {
                updated_utc: now_utc_iso(),
                prompts: latest,
            },
        )?;

        let prompts: Vec<PromptAggregate> = aggregates.into_values().collect();
        let catalog = Catalog {
            version: FLAT_VERSION.to_string(),
            created_utc: now_utc_iso(),
            prompt_count: prompts.len(),
            run_count,
            indexed_artifacts,
            prompts,
            files: Catalog::file_map(),
        };
        write_json(&self.root.join(CATALOG_FILE), &catalog)?;

        let summary = GenerationSummary {
            evolution: FLAT_VERSION.to_string(),
            created_utc: now_utc_iso(),
            source_run_count: run_count,
            source_prompt_count: catalog.prompt_count,
            indexed_artifacts,
            copied_files: None,
            skipped_no_changes: false,
            output_path: self.published.to_string_lossy().into_owned(),
            artifact_index_path: Some(
                self.published
                    .join(LogKind::Artifacts.file_name())
                    .to_string_lossy()
                    .into_owned(),
            ),
            output_metrics: Some(tree_metrics(&self.root)),
        };
        write_json(&self.root.join(SUMMARY_FILE), &summary)?;
        write_json(&self.root.join(SNAPSHOT_FILE), snapshot)?;

        info!(
            runs = run_count,
            prompts = catalog.prompt_count,
            artifacts = indexed_artifacts,
            root = %self.root.display(),
            "generation written"
        );
        Ok(summary)
    }

    fn write_readme(&self) -> IndexResult<()> {
        let target = self.root.join(README_FILE);
        match &self.reference_doc {
            Some(doc) if doc.is_file() => {
                std::fs::copy(doc, &target).at(doc)?;
            }
            _ => {
                debug!("reference document unavailable, writing built-in README");
                std::fs::write(&target, README_FALLBACK).at(&target)?;
            }
        }
        Ok(())
    }
}

fn artifact_row(
    run: &AssignedRun,
    run_dir: &Path,
    rel: &str,
    indexed_utc: &str,
) -> IndexResult<ArtifactRow> {
    let source = run_dir.join(rel);
    let bytes = std::fs::metadata(&source).at(&source)?.len();
    let sha256 = sha256_file(&source).at(&source)?;
    let file_name = Path::new(rel)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| rel.to_string());
    Ok(ArtifactRow {
        prompt_slug: run.prompt_slug().to_string(),
        run_id: run.run_id.to_string(),
        run_seq: run.run_seq,
        run_key: run.run_key.clone(),
        run_ref: run.run_ref(),
        file_name,
        rel_path: rel.to_string(),
        source_abs: source.to_string_lossy().into_owned(),
        bytes,
        sha256,
        indexed_utc: indexed_utc.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{discover, SourceLayout};
    use crate::ledger::assign_sequential;
    use serde_json::Value;

    fn fixture_runs(repo: &Path) -> Vec<AssignedRun> {
        let base = repo.join("temp/codex/evidence");
        for (prompt, run, body) in [
            ("Demo", "20250101T000000Z", "status=success\n"),
            ("Demo", "20250102T000000Z", "status=failed\n"),
            ("Other", "20250101T000000Z", "status=blocked\n"),
        ] {
            let dir = base.join(prompt).join(run);
            std::fs::create_dir_all(dir.join("logs")).unwrap();
            std::fs::write(dir.join("manifest.txt"), body).unwrap();
            std::fs::write(dir.join("logs/out.txt"), "abc").unwrap();
        }
        assign_sequential(discover(repo, &SourceLayout::defaults()))
    }

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn writes_complete_generation() {
        let repo = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let runs = fixture_runs(repo.path());
        let snapshot = SourceSnapshot::from_runs(&runs);

        let summary = IndexBuilder::new(out.path(), "/published/index")
            .build(&runs, &snapshot)
            .unwrap();
        assert_eq!(summary.source_run_count, 3);
        assert_eq!(summary.source_prompt_count, 2);
        assert_eq!(summary.indexed_artifacts, 6);
        assert_eq!(summary.output_path, "/published/index");

        for name in sprint_types::layout::FLAT_REQUIRED_FILES {
            let meta = std::fs::metadata(out.path().join(name)).unwrap();
            assert!(meta.len() > 0, "{name} is empty");
        }
        let readme = std::fs::read_to_string(out.path().join(README_FILE)).unwrap();
        assert_eq!(readme, README_FALLBACK);

        let artifacts = read_lines(&out.path().join("artifacts.jsonl"));
        assert_eq!(artifacts.len(), 6);
        let out_txt = artifacts.iter().find(|a| a["rel_path"] == "logs/out.txt").unwrap();
        assert_eq!(out_txt["file_name"], "out.txt");
        assert_eq!(out_txt["bytes"], 3);
        assert_eq!(
            out_txt["sha256"],
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );

        let history = read_lines(&out.path().join("history.jsonl"));
        assert!(history.iter().all(|h| h["event"] == "run_indexed"));
    }

    #[test]
    fn latest_state_and_catalog_follow_assignment_order() {
        let repo = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let runs = fixture_runs(repo.path());
        IndexBuilder::new(out.path(), out.path())
            .build(&runs, &SourceSnapshot::from_runs(&runs))
            .unwrap();

        let latest: StateLatest = serde_json::from_str(
            &std::fs::read_to_string(out.path().join(STATE_LATEST_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(latest.prompts["demo"].run_id, "r0002");
        assert_eq!(latest.prompts["demo"].status.as_str(), "failed");
        assert_eq!(latest.prompts["other"].status.as_str(), "blocked");

        let catalog: Catalog =
            serde_json::from_str(&std::fs::read_to_string(out.path().join(CATALOG_FILE)).unwrap())
                .unwrap();
        assert_eq!(catalog.run_count, 3);
        assert_eq!(catalog.prompt_count, 2);
        assert_eq!(catalog.prompts[0].prompt_slug, "demo");
        assert_eq!(catalog.prompts[0].run_count, 2);
        assert_eq!(catalog.prompts[0].total_files, 4);
        assert_eq!(catalog.prompts[0].last_run_id, "r0002");
        assert_eq!(catalog.files["runs_log"], "runs.jsonl");
    }

    #[test]
    fn reference_doc_is_copied_verbatim() {
        let repo = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let doc = repo.path().join("README.md");
        std::fs::write(&doc, "# canonical\n").unwrap();

        IndexBuilder::new(out.path(), out.path())
            .with_reference_doc(Some(doc))
            .build(&[], &SourceSnapshot::from_runs(&[]))
            .unwrap();
        let readme = std::fs::read_to_string(out.path().join(README_FILE)).unwrap();
        assert_eq!(readme, "# canonical\n");
    }

    #[test]
    fn vanished_artifact_aborts_build() {
        let repo = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let runs = fixture_runs(repo.path());
        std::fs::remove_file(
            repo.path().join("temp/codex/evidence/Other/20250101T000000Z/logs/out.txt"),
        )
        .unwrap();

        let err = IndexBuilder::new(out.path(), out.path())
            .build(&runs, &SourceSnapshot::from_runs(&runs))
            .unwrap_err();
        assert!(err.to_string().contains("out.txt"));
    }
}
