//! End-to-end build: discover → assign → gate → stage → build → promote.
//!
//! Each layout of the requested [`Phase`] is staged and promoted in turn, so
//! `Phase::All` ends with the flat layout published and the blob layout in
//! the backup slot. The incremental gate applies to the flat layout only.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use sprint_types::{now_utc_iso, AssignedRun, GenerationSummary, Phase, FLAT_VERSION};
use tracing::info;

use crate::builder::IndexBuilder;
use crate::discovery::{discover, SourceLayout};
use crate::error::{IndexError, IndexResult};
use crate::legacy::{BlobBuilder, TreeBuilder};
use crate::ledger::{assign, RunIdLedger};
use crate::promote::{discard, prepare_staging, promote};
use crate::snapshot::{should_skip, SourceSnapshot};

/// Inputs of one build.
#[derive(Clone, Debug)]
pub struct BuildOptions {
    pub repo_root: PathBuf,
    /// Published root.
    pub out_root: PathBuf,
    /// Run-id ledger; `None` assigns stateless ids.
    pub ledger_path: Option<PathBuf>,
    /// Skip the build when the source snapshot is unchanged.
    pub incremental: bool,
    /// Canonical README copied into each generation.
    pub reference_doc: Option<PathBuf>,
    pub layouts: Vec<SourceLayout>,
    /// Published layout(s) to build.
    pub phase: Phase,
}

impl BuildOptions {
    /// Incremental build with the ledger beside `out_root` and the default
    /// source layouts.
    pub fn new(repo_root: impl Into<PathBuf>, out_root: impl Into<PathBuf>) -> IndexResult<Self> {
        let out_root = out_root.into();
        Ok(Self {
            repo_root: repo_root.into(),
            ledger_path: Some(default_ledger_path(&out_root)?),
            out_root,
            incremental: true,
            reference_doc: None,
            layouts: SourceLayout::defaults(),
            phase: Phase::default(),
        })
    }
}

/// `<parent>/<name>.run_id_ledger.json` for a published root.
pub fn default_ledger_path(out_root: &Path) -> IndexResult<PathBuf> {
    let name = out_root
        .file_name()
        .ok_or_else(|| IndexError::InvalidOutputRoot(out_root.to_path_buf()))?
        .to_string_lossy();
    let parent = out_root.parent().unwrap_or_else(|| Path::new("."));
    Ok(parent.join(format!("{name}.run_id_ledger.json")))
}

/// Discover and assign without touching any persisted state.
pub fn preview_runs(repo_root: &Path, layouts: &[SourceLayout]) -> Vec<AssignedRun> {
    let (runs, _) = assign(discover(repo_root, layouts), None);
    runs
}

/// Run one build and return the summary of the last layout written.
/// The published root is replaced only after a generation is completely
/// written; on any error it is left as it was.
pub fn build(options: &BuildOptions) -> IndexResult<GenerationSummary> {
    let mut summaries = build_phases(options)?;
    summaries.pop().ok_or(IndexError::NoLayout(options.phase))
}

/// Run one build, returning one summary per layout in build order.
pub fn build_phases(options: &BuildOptions) -> IndexResult<Vec<GenerationSummary>> {
    let discovered = discover(&options.repo_root, &options.layouts);
    let ledger = options.ledger_path.as_deref().map(RunIdLedger::load);
    let (runs, mut ledger) = assign(discovered, ledger);
    info!(
        runs = runs.len(),
        stable_ids = ledger.is_some(),
        phase = %options.phase,
        "runs discovered and assigned"
    );

    let mut summaries = Vec::new();
    for &layout in options.phase.layouts() {
        let summary = build_layout(options, layout, &runs)?;
        persist_ledger(ledger.as_mut(), options.ledger_path.as_deref())?;
        summaries.push(summary);
    }
    Ok(summaries)
}

fn build_layout(
    options: &BuildOptions,
    layout: Phase,
    runs: &[AssignedRun],
) -> IndexResult<GenerationSummary> {
    let out_root = &options.out_root;
    let snapshot = SourceSnapshot::from_runs(runs);
    if layout == Phase::Flat && options.incremental && should_skip(out_root, &snapshot) {
        info!(path = %out_root.display(), "no source changes detected, reusing published generation");
        return Ok(skipped_summary(runs, out_root));
    }

    let staging = prepare_staging(out_root)?;
    let written = match layout {
        Phase::Tree => TreeBuilder::new(&staging, out_root).build(runs),
        Phase::Blob => BlobBuilder::new(&staging, out_root).build(runs),
        Phase::Flat | Phase::All => IndexBuilder::new(&staging, out_root)
            .with_reference_doc(options.reference_doc.clone())
            .build(runs, &snapshot),
    };
    let summary = written
        .and_then(|summary| promote(&staging, out_root).map(|()| summary))
        .inspect_err(|_| discard(&staging))?;

    info!(
        phase = %layout,
        runs = summary.source_run_count,
        artifacts = summary.indexed_artifacts,
        path = %out_root.display(),
        "build complete"
    );
    Ok(summary)
}

fn persist_ledger(ledger: Option<&mut RunIdLedger>, path: Option<&Path>) -> IndexResult<()> {
    match (ledger, path) {
        (Some(ledger), Some(path)) => ledger.persist(path),
        _ => Ok(()),
    }
}

fn skipped_summary(runs: &[AssignedRun], out_root: &Path) -> GenerationSummary {
    let prompts: BTreeSet<&str> = runs.iter().map(|r| r.prompt_slug()).collect();
    GenerationSummary {
        evolution: FLAT_VERSION.to_string(),
        created_utc: now_utc_iso(),
        source_run_count: runs.len(),
        source_prompt_count: prompts.len(),
        indexed_artifacts: runs.iter().map(|r| r.run.file_count()).sum(),
        copied_files: None,
        skipped_no_changes: true,
        output_path: out_root.to_string_lossy().into_owned(),
        artifact_index_path: None,
        output_metrics: None,
    }
}
