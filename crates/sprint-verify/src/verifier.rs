//! Fail-closed verification of a published index.
//!
//! Every check runs; violations are collected into the verdict and never
//! abort the pass.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use sprint_types::layout::{
    CATALOG_FILE, FLAT_REQUIRED_FILES, HELPERS_MANIFEST_FILE, README_FILE, SCHEMA_FILE,
    STATE_LATEST_FILE, SUMMARY_FILE,
};
use sprint_types::{run_ref, sha256_file, LogKind, Phase, FLAT_VERSION};
use tracing::{debug, info, warn};

use crate::contract::{rules_for, validate_row};
use crate::error::VerifyResult;
use crate::guard::DriftGuard;
use crate::verdict::{Findings, Verdict};

/// Allowlist of synced helper files, expected beside the reference document.
pub const SYNC_ALLOWLIST_FILE: &str = "sync.allowlist";

const TREE_REQUIRED: [&str; 6] = [
    "catalog/schema.json",
    "catalog/runs.jsonl",
    "catalog/prompts.json",
    "SUMMARY.json",
    "prompts",
    "runs",
];

const BLOB_REQUIRED: [&str; 7] = [
    "catalog/schema.json",
    "catalog/prompts.json",
    "history/all-runs.jsonl",
    "runs",
    "state",
    "blobs",
    "SUMMARY.json",
];

/// Verifies one published root.
#[derive(Clone, Debug)]
pub struct Verifier {
    root: PathBuf,
    phase: Phase,
    reference_doc: PathBuf,
    guard: DriftGuard,
}

impl Verifier {
    /// `reference_doc` is the canonical README; its directory is the
    /// development directory searched by the drift guardrails.
    pub fn new(root: impl Into<PathBuf>, reference_doc: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            phase: Phase::default(),
            reference_doc: reference_doc.into(),
            guard: DriftGuard::default(),
        }
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_guard(mut self, guard: DriftGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run every check for the configured phase.
    pub fn run(&self) -> Verdict {
        let mut findings = Findings::default();
        match self.phase {
            Phase::Tree => self.verify_tree(&mut findings),
            Phase::Blob => self.verify_blob(&mut findings),
            Phase::Flat => self.verify_flat(&mut findings),
            Phase::All => {
                self.verify_tree(&mut findings);
                self.verify_blob(&mut findings);
                self.verify_flat(&mut findings);
            }
        }
        let verdict = findings.into_verdict(self.phase, &self.root);
        info!(
            ok = verdict.ok,
            phase = %self.phase,
            checks = verdict.checks_run,
            errors = verdict.errors.len(),
            warnings = verdict.warnings.len(),
            "verification finished"
        );
        verdict
    }

    /// Run and write `verify.result.json` under the root.
    pub fn run_and_record(&self) -> VerifyResult<(Verdict, PathBuf)> {
        let verdict = self.run();
        let path = verdict.write(&self.root)?;
        Ok((verdict, path))
    }

    fn dev_dir(&self) -> PathBuf {
        self.reference_doc
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn verify_tree(&self, findings: &mut Findings) {
        self.check_required(&TREE_REQUIRED, findings);
        self.check_legacy_schema(Phase::Tree, findings);
    }

    fn verify_blob(&self, findings: &mut Findings) {
        self.check_required(&BLOB_REQUIRED, findings);
        self.check_legacy_schema(Phase::Blob, findings);
    }

    fn check_legacy_schema(&self, phase: Phase, findings: &mut Findings) {
        findings.check();
        let Some(version) = phase.version() else {
            return;
        };
        let path = self.root.join("catalog/schema.json");
        if !path.is_file() {
            return;
        }
        let doc = read_doc(&path, findings);
        if declared(&doc, "version") != Some(version) {
            findings.error(format!("phase {phase} schema version mismatch: expected {version}"));
        }
    }

    fn check_required(&self, rels: &[&str], findings: &mut Findings) {
        for rel in rels {
            findings.check();
            let path = self.root.join(rel);
            let Ok(meta) = std::fs::metadata(&path) else {
                findings.error(format!("missing required path: {}", path.display()));
                continue;
            };
            if meta.is_file() && meta.len() == 0 {
                findings.error(format!("required file is empty: {}", path.display()));
            }
            findings.note(format!("exists::{rel}"), true);
        }
    }

    fn verify_flat(&self, findings: &mut Findings) {
        let mut required: Vec<&str> = FLAT_REQUIRED_FILES.to_vec();
        required.push(HELPERS_MANIFEST_FILE);
        self.check_required(&required, findings);
        self.check_readme_drift(findings);

        let logs: BTreeMap<LogKind, Vec<Map<String, Value>>> = LogKind::ALL
            .into_iter()
            .map(|kind| (kind, self.read_log(kind, findings)))
            .collect();
        for kind in LogKind::ALL {
            findings.note(
                format!("{}_count", log_label(kind)),
                logs.get(&kind).map_or(0, Vec::len),
            );
        }
        let runs = logs.get(&LogKind::Runs).map(Vec::as_slice).unwrap_or_default();

        let catalog = self.check_versions(findings);
        let index = RunIndex::build(runs, findings);
        for kind in [LogKind::State, LogKind::History, LogKind::Artifacts] {
            let rows = logs.get(&kind).map(Vec::as_slice).unwrap_or_default();
            index.check_references(kind, rows, findings);
        }
        self.check_latest_state(&index, findings);
        check_catalog_counts(
            catalog.as_ref(),
            runs.len(),
            logs.get(&LogKind::Artifacts).map_or(0, Vec::len),
            findings,
        );
        self.check_manifest(findings);
        self.check_guardrails(findings);
    }

    fn check_readme_drift(&self, findings: &mut Findings) {
        findings.check();
        let published = self.root.join(README_FILE);
        if !self.reference_doc.is_file() {
            findings.warn(format!(
                "canonical reference document missing: {}",
                self.reference_doc.display()
            ));
            return;
        }
        if !published.is_file() {
            return;
        }
        match (sha256_file(&self.reference_doc), sha256_file(&published)) {
            (Ok(reference), Ok(out)) => {
                if reference != out {
                    findings.error(format!(
                        "README drift detected: {} does not match {}",
                        published.display(),
                        self.reference_doc.display()
                    ));
                }
                findings.note("readme_reference_sha256", reference);
                findings.note("readme_out_sha256", out);
            }
            (Err(e), _) | (_, Err(e)) => {
                findings.error(format!("README drift check could not read documents: {e}"));
            }
        }
    }

    /// Parse one log. Rows that are not objects are reported and dropped;
    /// a line that fails to parse is reported and reading continues.
    fn read_log(&self, kind: LogKind, findings: &mut Findings) -> Vec<Map<String, Value>> {
        let name = kind.file_name();
        let path = self.root.join(name);
        let text = match std::fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "log not readable");
                return Vec::new();
            }
        };
        let rules = rules_for(kind);
        let mut rows = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            findings.check();
            let line_no = idx + 1;
            let row = match serde_json::from_str::<Value>(line) {
                Ok(Value::Object(row)) => row,
                Ok(_) => {
                    findings.error(format!("{name} line {line_no}: row is not an object"));
                    continue;
                }
                Err(e) => {
                    findings.error(format!("{name} line {line_no}: invalid JSON: {e}"));
                    continue;
                }
            };
            for violation in validate_row(&row, rules) {
                findings.error(format!("{name} line {line_no}: {violation}"));
            }
            rows.push(row);
        }
        rows
    }

    /// Version tags of schema, summary and catalog; returns the catalog.
    fn check_versions(&self, findings: &mut Findings) -> Option<Value> {
        let tags = [
            (SCHEMA_FILE, "version"),
            (SUMMARY_FILE, "evolution"),
            (CATALOG_FILE, "version"),
        ];
        let mut catalog = None;
        for (file, field) in tags {
            findings.check();
            let doc = read_doc(&self.root.join(file), findings);
            if declared(&doc, field) != Some(FLAT_VERSION) {
                findings.error(format!("{file} {field} mismatch: expected {FLAT_VERSION}"));
            }
            if file == CATALOG_FILE {
                catalog = doc;
            }
        }
        catalog
    }

    fn check_latest_state(&self, index: &RunIndex, findings: &mut Findings) {
        findings.check();
        let doc = read_doc(&self.root.join(STATE_LATEST_FILE), findings);
        let prompts = match doc.as_ref().and_then(|d| d.get("prompts")) {
            None => return,
            Some(Value::Object(prompts)) => prompts,
            Some(_) => {
                findings.error(format!("{STATE_LATEST_FILE} invalid: `prompts` must be an object"));
                return;
            }
        };
        for (slug, row) in prompts {
            let Some(row) = row.as_object() else {
                findings.error(format!("{STATE_LATEST_FILE} prompt={slug}: row is not an object"));
                continue;
            };
            let run_key = key_of(row);
            if !index.keys.contains(&run_key) {
                findings.error(format!(
                    "{STATE_LATEST_FILE} prompt={slug} references unknown run_key={run_key}"
                ));
                continue;
            }
            let seq = row.get("run_seq").and_then(Value::as_i64);
            if seq.is_none() || seq != index.max_seq.get(slug.as_str()).copied() {
                findings.error(format!(
                    "{STATE_LATEST_FILE} prompt={slug} run_seq does not match max observed sequence"
                ));
            }
        }
    }

    fn check_manifest(&self, findings: &mut Findings) {
        findings.check();
        let path = self.root.join(HELPERS_MANIFEST_FILE);
        let doc = if path.is_file() {
            read_doc(&path, findings)
        } else {
            Some(Value::Object(Map::new()))
        };
        let Some(Value::Object(manifest)) = doc else {
            findings.error(format!("{HELPERS_MANIFEST_FILE} must be an object"));
            return;
        };
        let Some(files) = manifest.get("files").and_then(Value::as_array) else {
            findings.error(format!("{HELPERS_MANIFEST_FILE} missing `files` list"));
            return;
        };

        let mut names = BTreeSet::new();
        for row in files {
            let Some(row) = row.as_object() else {
                findings.error(format!("{HELPERS_MANIFEST_FILE} has non-object file row"));
                continue;
            };
            let name = match row.get("name").and_then(Value::as_str) {
                Some(name) if !name.is_empty() => name,
                _ => {
                    findings.error(format!("{HELPERS_MANIFEST_FILE} file row missing valid `name`"));
                    continue;
                }
            };
            if !self.root.join(name).is_file() {
                findings.error(format!(
                    "{HELPERS_MANIFEST_FILE} references missing synced file: {name}"
                ));
            }
            names.insert(name.to_string());
        }

        let allowlist_path = self.dev_dir().join(SYNC_ALLOWLIST_FILE);
        let allowlist = match std::fs::read_to_string(&allowlist_path) {
            Ok(text) => text,
            Err(_) => {
                findings.warn(format!("sync allowlist not found: {}", allowlist_path.display()));
                return;
            }
        };
        let expected: BTreeSet<String> = allowlist
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();
        findings.note("allowlist_path", allowlist_path.to_string_lossy().into_owned());
        findings.note("allowlist_expected_count", expected.len());
        let missing: Vec<&String> = expected.difference(&names).collect();
        let extra: Vec<&String> = names.difference(&expected).collect();
        if !missing.is_empty() {
            findings.error(format!(
                "{HELPERS_MANIFEST_FILE} missing allowlisted entries: {missing:?}"
            ));
        }
        if !extra.is_empty() {
            findings.error(format!(
                "{HELPERS_MANIFEST_FILE} has non-allowlisted entries: {extra:?}"
            ));
        }
    }

    fn check_guardrails(&self, findings: &mut Findings) {
        let dev_dir = self.dev_dir();

        findings.check();
        for (label, dir) in [("development directory", &dev_dir), ("published root", &self.root)] {
            let scripts = self.guard.deprecated_scripts(dir);
            if !scripts.is_empty() {
                findings.error(format!(
                    "deprecated build scripts present in {label}: {scripts:?}"
                ));
            }
        }

        findings.check();
        let script = dev_dir.join(&self.guard.scheduler_script);
        match std::fs::read(&script) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                for violation in self.guard.scheduler_violations(&text) {
                    findings.error(violation);
                }
            }
            Err(_) => findings.warn(format!(
                "{} not found for drift check: {}",
                self.guard.scheduler_script,
                script.display()
            )),
        }
    }
}

/// Keys and per-prompt maximum sequence of `runs.jsonl`.
struct RunIndex {
    keys: HashSet<String>,
    max_seq: BTreeMap<String, i64>,
}

impl RunIndex {
    fn build(runs: &[Map<String, Value>], findings: &mut Findings) -> Self {
        findings.check();
        let mut keys = HashSet::with_capacity(runs.len());
        let mut duplicates = BTreeSet::new();
        let mut max_seq: BTreeMap<String, i64> = BTreeMap::new();
        for row in runs {
            let run_key = key_of(row);
            if row.get("run_ref").and_then(Value::as_str) != Some(run_ref(&run_key).as_str()) {
                findings.error(format!("run_ref mismatch for run_key={run_key}"));
            }
            let seq = row.get("run_seq").and_then(Value::as_i64).unwrap_or(0);
            if seq <= 0 {
                findings.error(format!("non-positive run_seq for run_key={run_key}"));
            }
            let prompt = row
                .get("prompt_slug")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let max = max_seq.entry(prompt).or_insert(0);
            *max = (*max).max(seq);
            if !keys.insert(run_key.clone()) {
                duplicates.insert(run_key);
            }
        }
        if !duplicates.is_empty() {
            warn!(count = duplicates.len(), "duplicate run keys");
            findings.error(format!(
                "runs.jsonl contains duplicate run_key values: {:?}",
                duplicates
            ));
        }
        Self { keys, max_seq }
    }

    fn check_references(&self, kind: LogKind, rows: &[Map<String, Value>], findings: &mut Findings) {
        findings.check();
        let label = row_label(kind);
        for row in rows {
            let run_key = key_of(row);
            if !self.keys.contains(&run_key) {
                findings.error(format!("{label} row references unknown run_key={run_key}"));
            }
            if row.get("run_ref").and_then(Value::as_str) != Some(run_ref(&run_key).as_str()) {
                findings.error(format!("{label} run_ref mismatch for run_key={run_key}"));
            }
        }
    }
}

fn check_catalog_counts(
    catalog: Option<&Value>,
    run_rows: usize,
    artifact_rows: usize,
    findings: &mut Findings,
) {
    findings.check();
    let Some(catalog) = catalog.and_then(Value::as_object) else {
        return;
    };
    let count = |field: &str| catalog.get(field).and_then(Value::as_u64);
    if count("run_count") != Some(run_rows as u64) {
        findings.error("catalog.json run_count does not match runs.jsonl row count");
    }
    if count("indexed_artifacts") != Some(artifact_rows as u64) {
        findings.error("catalog.json indexed_artifacts does not match artifacts.jsonl row count");
    }
    match catalog.get("prompts").and_then(Value::as_array) {
        Some(prompts) => {
            if count("prompt_count") != Some(prompts.len() as u64) {
                findings.error("catalog.json prompt_count does not match prompts list length");
            }
        }
        None => findings.error("catalog.json `prompts` must be a list"),
    }
}

/// Parse a JSON document. A missing file yields `None` silently (the
/// required-file check reports it); invalid JSON is recorded.
fn read_doc(path: &Path, findings: &mut Findings) -> Option<Value> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(e) => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            findings.error(format!("{name}: invalid JSON: {e}"));
            None
        }
    }
}

fn declared<'a>(doc: &'a Option<Value>, field: &str) -> Option<&'a str> {
    doc.as_ref()?.get(field)?.as_str()
}

/// `run_key` as text; non-string keys are stringified the way they serialize.
fn key_of(row: &Map<String, Value>) -> String {
    match row.get("run_key") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn log_label(kind: LogKind) -> &'static str {
    match kind {
        LogKind::Runs => "runs",
        LogKind::State => "state",
        LogKind::History => "history",
        LogKind::Artifacts => "artifacts",
    }
}

fn row_label(kind: LogKind) -> &'static str {
    match kind {
        LogKind::Runs => "run",
        LogKind::State => "state",
        LogKind::History => "history",
        LogKind::Artifacts => "artifact",
    }
}
