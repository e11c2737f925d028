//! Builders for the two copying layouts.
//!
//! Both copy every run file into the generation, unlike the flat builder
//! which only references source bytes:
//! - [`TreeBuilder`] (`v1`): run trees under `runs/<run_key>/`, per-prompt
//!   `state.json` and `history.jsonl`, a global `catalog/runs.jsonl`
//! - [`BlobBuilder`] (`v2`): artifacts flattened into `blobs/<prompt_slug>/`
//!   with run-id prefixes, append-only state and history logs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use sprint_types::layout::SUMMARY_FILE;
use sprint_types::{
    now_utc_iso, AssignedRun, BlobEntry, BlobPromptCatalog, BlobPromptStats, BlobRunRecord,
    BlobRunSummary, GenerationSummary, LegacyRunFields, LegacySchemaDoc, TreePromptCatalog,
    TreeRunRecord, BLOB_VERSION, TREE_VERSION,
};
use tracing::{debug, info};

use crate::error::{IndexResult, IoContext};
use crate::io::{append_jsonl, write_json};
use crate::metrics::tree_metrics;

const CATALOG_DIR: &str = "catalog";
const SCHEMA_DOC: &str = "catalog/schema.json";
const PROMPTS_DOC: &str = "catalog/prompts.json";
const TREE_RUN_LOG: &str = "catalog/runs.jsonl";
const BLOB_GLOBAL_HISTORY: &str = "history/all-runs.jsonl";
const FALLBACK_BLOB_NAME: &str = "artifact.bin";

/// Builds a copied-tree generation into `root`.
#[derive(Clone, Debug)]
pub struct TreeBuilder {
    root: PathBuf,
    published: PathBuf,
}

impl TreeBuilder {
    /// `root` is where files are written; `published` is the path the
    /// generation will be served from.
    pub fn new(root: impl Into<PathBuf>, published: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            published: published.into(),
        }
    }

    /// Copy every run and write the catalog documents. `runs` must be in
    /// assignment order.
    pub fn build(&self, runs: &[AssignedRun]) -> IndexResult<GenerationSummary> {
        for dir in [CATALOG_DIR, "prompts", "runs"] {
            let path = self.root.join(dir);
            std::fs::create_dir_all(&path).at(&path)?;
        }
        write_json(&self.root.join(SCHEMA_DOC), &LegacySchemaDoc::tree(now_utc_iso()))?;

        let mut runs_per_prompt: BTreeMap<String, usize> = BTreeMap::new();
        let mut copied_files = 0;
        for run in runs {
            let target = self.root.join("runs").join(&run.run_key);
            copied_files += copy_run_tree(run, &target)?;

            let record = TreeRunRecord {
                run: LegacyRunFields::from(run),
                target_run_path: self
                    .published
                    .join("runs")
                    .join(&run.run_key)
                    .to_string_lossy()
                    .into_owned(),
                indexed_utc: now_utc_iso(),
            };
            let prompt_dir = self.root.join("prompts").join(run.prompt_slug());
            std::fs::create_dir_all(&prompt_dir).at(&prompt_dir)?;
            append_jsonl(&self.root.join(TREE_RUN_LOG), &record)?;
            append_jsonl(&prompt_dir.join("history.jsonl"), &record)?;
            write_json(&prompt_dir.join("state.json"), &record)?;

            *runs_per_prompt.entry(run.prompt_slug().to_string()).or_default() += 1;
            debug!(run_key = %run.run_key, files = run.run.file_count(), "run tree copied");
        }

        // Empty sources still publish a (blank) run log.
        let run_log = self.root.join(TREE_RUN_LOG);
        if !run_log.exists() {
            std::fs::write(&run_log, "").at(&run_log)?;
        }

        let catalog = TreePromptCatalog {
            created_utc: now_utc_iso(),
            prompt_count: runs_per_prompt.len(),
            run_count: runs.len(),
            runs_per_prompt,
        };
        write_json(&self.root.join(PROMPTS_DOC), &catalog)?;

        let summary = legacy_summary(
            TREE_VERSION,
            &self.root,
            &self.published,
            runs.len(),
            catalog.prompt_count,
            copied_files,
        )?;
        info!(
            runs = runs.len(),
            files = copied_files,
            root = %self.root.display(),
            "copied-tree generation written"
        );
        Ok(summary)
    }
}

/// Builds a blob generation into `root`.
#[derive(Clone, Debug)]
pub struct BlobBuilder {
    root: PathBuf,
    published: PathBuf,
}

impl BlobBuilder {
    pub fn new(root: impl Into<PathBuf>, published: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            published: published.into(),
        }
    }

    /// Flatten every run into prompt blob folders and write the logs.
    /// `runs` must be in assignment order.
    pub fn build(&self, runs: &[AssignedRun]) -> IndexResult<GenerationSummary> {
        for dir in ["state", "history", "blobs", "runs", CATALOG_DIR] {
            let path = self.root.join(dir);
            std::fs::create_dir_all(&path).at(&path)?;
        }
        write_json(&self.root.join(SCHEMA_DOC), &LegacySchemaDoc::blob(now_utc_iso()))?;

        let mut prompts: BTreeMap<String, BlobPromptStats> = BTreeMap::new();
        let mut copied_files = 0;
        for run in runs {
            let slug = run.prompt_slug();
            let blob_dir = self.root.join("blobs").join(slug);
            std::fs::create_dir_all(&blob_dir).at(&blob_dir)?;

            let (blobs, collisions) = copy_run_blobs(run, &blob_dir)?;
            copied_files += blobs.len();

            let record = BlobRunRecord {
                run: LegacyRunFields::from(run),
                blob_count: blobs.len(),
                blob_collision_count: collisions,
                indexed_utc: now_utc_iso(),
            };
            write_json(
                &self.root.join("runs").join(format!("{}.json", run.run_key)),
                &BlobRunSummary {
                    record: record.clone(),
                    blobs,
                },
            )?;
            append_jsonl(&self.root.join(BLOB_GLOBAL_HISTORY), &record)?;
            append_jsonl(&self.root.join("history").join(format!("{slug}.jsonl")), &record)?;
            append_jsonl(&self.root.join("state").join(format!("{slug}.jsonl")), &record)?;
            write_json(
                &self.root.join("state").join(format!("{slug}.latest.json")),
                &record,
            )?;

            let stats = prompts.entry(slug.to_string()).or_insert_with(|| BlobPromptStats {
                prompt_slug: slug.to_string(),
                ..BlobPromptStats::default()
            });
            stats.run_count += 1;
            stats.total_files += run.run.file_count();
            stats.total_bytes += run.run.total_bytes;
            stats.last_run_id = run.run_id.to_string();
            debug!(run_key = %run.run_key, blobs = record.blob_count, collisions, "run flattened");
        }

        let global_history = self.root.join(BLOB_GLOBAL_HISTORY);
        if !global_history.exists() {
            std::fs::write(&global_history, "").at(&global_history)?;
        }

        let prompts: Vec<BlobPromptStats> = prompts.into_values().collect();
        let catalog = BlobPromptCatalog {
            created_utc: now_utc_iso(),
            prompt_count: prompts.len(),
            run_count: runs.len(),
            prompts,
        };
        write_json(&self.root.join(PROMPTS_DOC), &catalog)?;

        let summary = legacy_summary(
            BLOB_VERSION,
            &self.root,
            &self.published,
            runs.len(),
            catalog.prompt_count,
            copied_files,
        )?;
        info!(
            runs = runs.len(),
            files = copied_files,
            root = %self.root.display(),
            "blob generation written"
        );
        Ok(summary)
    }
}

/// Copy a run's files under `target`, keeping relative paths.
fn copy_run_tree(run: &AssignedRun, target: &Path) -> IndexResult<usize> {
    let source = Path::new(&run.run.source_run_path);
    std::fs::create_dir_all(target).at(target)?;
    for rel in &run.run.files {
        let dst = target.join(rel);
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent).at(parent)?;
        }
        let src = source.join(rel);
        std::fs::copy(&src, &dst).at(&src)?;
    }
    Ok(run.run.files.len())
}

/// Copy a run's files into `blob_dir` as `<run_id>__<name>`, returning the
/// entries and how many names had to be disambiguated.
fn copy_run_blobs(run: &AssignedRun, blob_dir: &Path) -> IndexResult<(Vec<BlobEntry>, usize)> {
    let source = Path::new(&run.run.source_run_path);
    let mut entries = Vec::with_capacity(run.run.files.len());
    let mut collisions = 0;
    for rel in &run.run.files {
        let base = safe_blob_name(rel);
        let mut name = format!("{}__{base}", run.run_id);
        let mut suffix = 1;
        while blob_dir.join(&name).exists() {
            collisions += 1;
            name = format!("{}__{suffix:02}__{base}", run.run_id);
            suffix += 1;
        }
        let src = source.join(rel);
        let bytes = std::fs::copy(&src, blob_dir.join(&name)).at(&src)?;
        entries.push(BlobEntry {
            name,
            source_rel: rel.clone(),
            bytes,
        });
    }
    Ok((entries, collisions))
}

fn unsafe_run() -> Option<&'static Regex> {
    static UNSAFE: OnceLock<Option<Regex>> = OnceLock::new();
    UNSAFE
        .get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").ok())
        .as_ref()
}

/// Single-segment file name for a relative artifact path: separators become
/// `__`, other unsafe runs become `-`, edge dashes are trimmed.
pub fn safe_blob_name(rel: &str) -> String {
    let joined = rel.replace('/', "__");
    let cleaned = match unsafe_run() {
        Some(re) => re.replace_all(&joined, "-").into_owned(),
        None => joined,
    };
    let trimmed = cleaned.trim_matches('-');
    if trimmed.is_empty() {
        FALLBACK_BLOB_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

fn legacy_summary(
    evolution: &str,
    root: &Path,
    published: &Path,
    run_count: usize,
    prompt_count: usize,
    copied_files: usize,
) -> IndexResult<GenerationSummary> {
    let summary = GenerationSummary {
        evolution: evolution.to_string(),
        created_utc: now_utc_iso(),
        source_run_count: run_count,
        source_prompt_count: prompt_count,
        indexed_artifacts: copied_files,
        copied_files: Some(copied_files),
        skipped_no_changes: false,
        output_path: published.to_string_lossy().into_owned(),
        artifact_index_path: None,
        output_metrics: Some(tree_metrics(root)),
    };
    write_json(&root.join(SUMMARY_FILE), &summary)?;
    Ok(summary)
}
