//! Run discovery over legacy evidence roots.
//!
//! Two layouts are understood:
//!
//! - [`SourceLayout::PromptRuns`]: `<root>/<prompt-label>/<run-label>/`, one run
//!   per run-label directory, slug taken from the prompt label.
//! - [`SourceLayout::FlatRuns`]: `<root>/<run-label>/`, slug inferred from the
//!   first lines of the run's event log.
//!
//! Discovery never fails: missing or unreadable directories are skipped.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::UNIX_EPOCH;

use chrono::{NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sprint_types::{prompt_slug_from_value, slugify, LegacyRun};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Number of leading event-log lines searched for a prompt field.
pub const SLUG_PROBE_LINES: usize = 24;

/// Event fields that may name the prompt, in lookup order.
const PROMPT_FIELDS: [&str; 2] = ["prompt_name", "prompt"];

/// One configured evidence layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceLayout {
    /// `<root>/<prompt-label>/<run-label>/`
    PromptRuns {
        family: String,
        /// Roots relative to the repository root (absolute paths are kept).
        roots: Vec<PathBuf>,
    },
    /// `<root>/<run-label>/` with the prompt inferred per run.
    FlatRuns {
        family: String,
        root: PathBuf,
        /// Label recorded as `source_prompt_label` for every run.
        prompt_label: String,
        /// Slug used when the event log names no prompt.
        fallback_slug: String,
        /// Event log file name inside each run directory.
        event_log: String,
    },
}

impl SourceLayout {
    /// Legacy evidence roots produced by earlier tooling generations.
    pub fn defaults() -> Vec<SourceLayout> {
        vec![
            SourceLayout::PromptRuns {
                family: "codex".into(),
                roots: vec![
                    PathBuf::from("temp/codex/evidence"),
                    PathBuf::from("temp/codex/codex/evidence"),
                ],
            },
            SourceLayout::FlatRuns {
                family: "prism".into(),
                root: PathBuf::from("temp/.artifacts/prism/evidence"),
                prompt_label: "prism".into(),
                fallback_slug: "prism".into(),
                event_log: "events.ndjson".into(),
            },
        ]
    }

    pub fn family(&self) -> &str {
        match self {
            SourceLayout::PromptRuns { family, .. } | SourceLayout::FlatRuns { family, .. } => {
                family
            }
        }
    }
}

/// Discover every run under `repo_root` for the given layouts, in the
/// canonical order `(prompt_slug, sort_epoch, source_run_label, source_run_path)`.
pub fn discover(repo_root: &Path, layouts: &[SourceLayout]) -> Vec<LegacyRun> {
    let mut runs = Vec::new();
    for layout in layouts {
        match layout {
            SourceLayout::PromptRuns { family, roots } => {
                for root in roots {
                    scan_prompt_runs(&repo_root.join(root), family, &mut runs);
                }
            }
            SourceLayout::FlatRuns {
                family,
                root,
                prompt_label,
                fallback_slug,
                event_log,
            } => {
                let root = repo_root.join(root);
                for run_dir in sorted_subdirs(&root) {
                    let slug = infer_prompt_slug(&run_dir, event_log, fallback_slug);
                    runs.push(legacy_run(family, &root, prompt_label, slug, &run_dir));
                }
            }
        }
    }
    sort_runs(&mut runs);
    debug!(runs = runs.len(), "discovery complete");
    runs
}

fn scan_prompt_runs(root: &Path, family: &str, runs: &mut Vec<LegacyRun>) {
    for prompt_dir in sorted_subdirs(root) {
        let prompt_label = dir_name(&prompt_dir);
        let slug = slugify(&prompt_label);
        for run_dir in sorted_subdirs(&prompt_dir) {
            runs.push(legacy_run(family, root, &prompt_label, slug.clone(), &run_dir));
        }
    }
}

fn legacy_run(
    family: &str,
    root: &Path,
    prompt_label: &str,
    prompt_slug: String,
    run_dir: &Path,
) -> LegacyRun {
    let run_label = dir_name(run_dir);
    let (files, total_bytes) = list_files(run_dir);
    LegacyRun {
        source_family: family.to_string(),
        source_root: root.to_string_lossy().into_owned(),
        source_prompt_label: prompt_label.to_string(),
        sort_epoch: sort_epoch(&run_label, run_dir),
        source_run_label: run_label,
        source_run_path: run_dir.to_string_lossy().into_owned(),
        prompt_slug,
        files,
        total_bytes,
    }
}

/// Apply the discovery ordering contract.
pub fn sort_runs(runs: &mut [LegacyRun]) {
    runs.sort_by(|a, b| {
        a.prompt_slug
            .cmp(&b.prompt_slug)
            .then(a.sort_epoch.total_cmp(&b.sort_epoch))
            .then_with(|| a.source_run_label.cmp(&b.source_run_label))
            .then_with(|| a.source_run_path.cmp(&b.source_run_path))
    });
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Immediate subdirectories of `dir` in name order; empty when `dir` is
/// missing or unreadable.
fn sorted_subdirs(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "skipping unreadable evidence directory");
            return Vec::new();
        }
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    dirs
}

/// Every file under `run_dir` as a relative POSIX path, in path-component
/// order, plus the summed size of the files that could be stat'ed.
pub fn list_files(run_dir: &Path) -> (Vec<String>, u64) {
    let mut files = Vec::new();
    let mut total = 0u64;
    for entry in WalkDir::new(run_dir).min_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(path = %run_dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Ok(rel) = path.strip_prefix(run_dir) else {
            continue;
        };
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push(rel);
        match fs::metadata(path) {
            Ok(meta) => total += meta.len(),
            Err(e) => debug!(path = %path.display(), error = %e, "size not counted"),
        }
    }
    (files, total)
}

fn timestamp_token() -> Option<&'static Regex> {
    static TOKEN: OnceLock<Option<Regex>> = OnceLock::new();
    TOKEN
        .get_or_init(|| Regex::new(r"[0-9]{8}T[0-9]{6}Z?").ok())
        .as_ref()
}

/// UTC seconds of the first compact timestamp token (`YYYYMMDDTHHMMSS[Z]`)
/// in `label`, if it parses.
pub fn label_epoch(label: &str) -> Option<f64> {
    let token = timestamp_token()?.find(label)?.as_str();
    let token = token.strip_suffix('Z').unwrap_or(token);
    let naive = NaiveDateTime::parse_from_str(token, "%Y%m%dT%H%M%S").ok()?;
    Some(Utc.from_utc_datetime(&naive).timestamp() as f64)
}

/// Label timestamp, else directory mtime, else 0.
pub fn sort_epoch(label: &str, run_dir: &Path) -> f64 {
    if let Some(epoch) = label_epoch(label) {
        return epoch;
    }
    fs::metadata(run_dir)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|mtime| mtime.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Prompt slug for a single-level run, read from the first
/// [`SLUG_PROBE_LINES`] lines of its event log.
///
/// Lines that do not start with `{` are skipped; the first line that fails to
/// parse ends the search.
pub fn infer_prompt_slug(run_dir: &Path, event_log: &str, fallback: &str) -> String {
    let path = run_dir.join(event_log);
    if !path.is_file() {
        return fallback.to_string();
    }
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "event log unreadable");
            return fallback.to_string();
        }
    };
    let text = String::from_utf8_lossy(&bytes);
    for line in text.lines().take(SLUG_PROBE_LINES) {
        if !line.trim().starts_with('{') {
            continue;
        }
        let event: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(_) => break,
        };
        for field in PROMPT_FIELDS {
            if let Some(slug) = event.get(field).and_then(prompt_slug_from_value) {
                return slug;
            }
        }
    }
    fallback.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, body: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn label_epoch_parses_compact_tokens() {
        assert_eq!(label_epoch("run-20250102T030405Z"), Some(1_735_787_045.0));
        assert_eq!(label_epoch("20250102T030405-retry"), Some(1_735_787_045.0));
        assert_eq!(label_epoch("no-timestamp"), None);
        // Month 13 matches the token shape but does not parse.
        assert_eq!(label_epoch("20251301T000000Z"), None);
    }

    #[test]
    fn sort_epoch_falls_back_to_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let epoch = sort_epoch("plain", dir.path());
        assert!(epoch > 0.0);
        assert_eq!(sort_epoch("plain", &dir.path().join("missing")), 0.0);
    }

    #[test]
    fn list_files_orders_by_path_components() {
        let dir = tempfile::tempdir().unwrap();
        let run = dir.path();
        write(&run.join("b.txt"), "bb");
        write(&run.join("a/z.txt"), "z");
        write(&run.join("a-c.txt"), "ccc");
        write(&run.join("a/b/deep.txt"), "dddd");

        let (files, total) = list_files(run);
        assert_eq!(files, vec!["a/b/deep.txt", "a/z.txt", "a-c.txt", "b.txt"]);
        assert_eq!(total, 10);
    }

    #[test]
    fn slug_inference_reads_prompt_fields() {
        let dir = tempfile::tempdir().unwrap();
        let run = dir.path();
        write(
            &run.join("events.ndjson"),
            "not json\n{\"type\":\"start\"}\n{\"prompt_name\":\"13\"}\n",
        );
        assert_eq!(infer_prompt_slug(run, "events.ndjson", "prism"), "prompt-13");

        write(&run.join("events.ndjson"), "{\"prompt\":\"Dash Board Fix\"}\n");
        assert_eq!(infer_prompt_slug(run, "events.ndjson", "prism"), "dash-board-fix");
    }

    #[test]
    fn slug_inference_stops_at_corrupt_line() {
        let dir = tempfile::tempdir().unwrap();
        let run = dir.path();
        write(&run.join("events.ndjson"), "{broken\n{\"prompt\":\"late\"}\n");
        assert_eq!(infer_prompt_slug(run, "events.ndjson", "prism"), "prism");
    }

    #[test]
    fn slug_inference_only_probes_leading_lines() {
        let dir = tempfile::tempdir().unwrap();
        let run = dir.path();
        let mut body = "{\"type\":\"tick\"}\n".repeat(SLUG_PROBE_LINES);
        body.push_str("{\"prompt\":\"too-late\"}\n");
        write(&run.join("events.ndjson"), &body);
        assert_eq!(infer_prompt_slug(run, "events.ndjson", "prism"), "prism");
        assert_eq!(infer_prompt_slug(&run.join("nope"), "events.ndjson", "prism"), "prism");
    }

    #[test]
    fn discover_normalizes_both_layouts() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path();
        write(&repo.join("temp/codex/evidence/Demo Prompt/20250102T000000Z/out.log"), "x");
        write(&repo.join("temp/codex/evidence/Demo Prompt/20250101T000000Z/out.log"), "yy");
        write(
            &repo.join("temp/.artifacts/prism/evidence/run-20250103T000000Z/events.ndjson"),
            "{\"prompt_name\":\"demo prompt\"}\n",
        );
        // Stray file at the prompt level is ignored.
        write(&repo.join("temp/codex/evidence/README"), "ignore me");

        let runs = discover(repo, &SourceLayout::defaults());
        assert_eq!(runs.len(), 3);
        assert!(runs.iter().all(|r| r.prompt_slug == "demo-prompt"));

        let labels: Vec<_> = runs.iter().map(|r| r.source_run_label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["20250101T000000Z", "20250102T000000Z", "run-20250103T000000Z"]
        );
        assert_eq!(runs[0].source_family, "codex");
        assert_eq!(runs[0].source_prompt_label, "Demo Prompt");
        assert_eq!(runs[0].total_bytes, 2);
        assert_eq!(runs[2].source_family, "prism");
        assert_eq!(runs[2].source_prompt_label, "prism");
        assert_eq!(runs[2].files, vec!["events.ndjson"]);
    }

    #[test]
    fn discover_tolerates_missing_roots() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(dir.path(), &SourceLayout::defaults()).is_empty());
    }
}
