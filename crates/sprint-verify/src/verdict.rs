use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sprint_types::layout::VERDICT_FILE;
use sprint_types::Phase;

use crate::error::{VerifyError, VerifyResult};

/// Outcome of one verification pass. `ok` holds iff `errors` is empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub ok: bool,
    pub phase: Phase,
    pub root: String,
    pub checks_run: u64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub summary: BTreeMap<String, Value>,
}

impl Verdict {
    /// Write the verdict as sorted-key pretty JSON to `<root>/verify.result.json`.
    pub fn write(&self, root: &Path) -> VerifyResult<PathBuf> {
        std::fs::create_dir_all(root).map_err(|source| VerifyError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        let path = root.join(VERDICT_FILE);
        let mut body = serde_json::to_string_pretty(&serde_json::to_value(self)?)?;
        body.push('\n');
        std::fs::write(&path, body).map_err(|source| VerifyError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// Accumulates findings while checks run.
#[derive(Debug, Default)]
pub(crate) struct Findings {
    pub checks_run: u64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub summary: BTreeMap<String, Value>,
}

impl Findings {
    pub fn check(&mut self) {
        self.checks_run += 1;
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn note(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.summary.insert(key.into(), value.into());
    }

    pub fn into_verdict(self, phase: Phase, root: &Path) -> Verdict {
        Verdict {
            ok: self.errors.is_empty(),
            phase,
            root: root.to_string_lossy().into_owned(),
            checks_run: self.checks_run,
            errors: self.errors,
            warnings: self.warnings,
            summary: self.summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_file_has_sorted_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut findings = Findings::default();
        findings.check();
        findings.note("zeta", 1);
        findings.note("alpha", "x");
        findings.error("boom");
        let verdict = findings.into_verdict(Phase::Flat, dir.path());
        assert!(!verdict.ok);

        let path = verdict.write(&dir.path().join("fresh")).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        let keys: Vec<usize> = ["checks_run", "errors", "ok", "phase", "root", "summary", "warnings"]
            .iter()
            .map(|k| body.find(&format!("\"{k}\"")).unwrap())
            .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert!(body.contains("\"phase\": \"3\""));

        let parsed: Verdict = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed, verdict);
    }
}
