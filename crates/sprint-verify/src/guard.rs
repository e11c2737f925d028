//! Structural drift guardrails.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Names the retired builders and the canonical one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftGuard {
    /// File-name prefix of retired per-phase build scripts.
    pub deprecated_prefix: String,
    /// Text a scheduling script must contain.
    pub canonical_builder: String,
    /// Scheduling script looked up in the development directory.
    pub scheduler_script: String,
}

impl Default for DriftGuard {
    fn default() -> Self {
        Self {
            deprecated_prefix: "evolve_v".into(),
            canonical_builder: "sprint build".into(),
            scheduler_script: "run_evolutions.sh".into(),
        }
    }
}

impl DriftGuard {
    /// Sorted names of deprecated build scripts directly inside `dir`.
    pub fn deprecated_scripts(&self, dir: &Path) -> Vec<String> {
        if self.deprecated_prefix.is_empty() {
            return Vec::new();
        }
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(&self.deprecated_prefix))
            .collect();
        names.sort();
        names
    }

    /// Problems with a scheduling script's content.
    pub fn scheduler_violations(&self, script: &str) -> Vec<String> {
        let mut violations = Vec::new();
        if !self.deprecated_prefix.is_empty() && script.contains(&self.deprecated_prefix) {
            violations.push(format!(
                "{} still references deprecated {}* scripts",
                self.scheduler_script, self.deprecated_prefix
            ));
        }
        if !script.contains(&self.canonical_builder) {
            violations.push(format!(
                "{} does not reference the canonical builder `{}`",
                self.scheduler_script, self.canonical_builder
            ));
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_deprecated_scripts_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["evolve_v2.py", "evolve_v1.py", "evolve.py", "notes.md"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        std::fs::create_dir(dir.path().join("evolve_v9")).unwrap();
        let guard = DriftGuard::default();
        assert_eq!(
            guard.deprecated_scripts(dir.path()),
            vec!["evolve_v1.py", "evolve_v2.py"]
        );
        assert!(guard.deprecated_scripts(&dir.path().join("missing")).is_empty());
    }

    #[test]
    fn scheduler_must_use_canonical_builder() {
        let guard = DriftGuard::default();
        assert!(guard.scheduler_violations("#!/bin/sh\nsprint build --out idx\n").is_empty());
        assert_eq!(guard.scheduler_violations("python3 evolve_v3.py").len(), 2);
    }
}
