//! Best-effort run status from literal markers.
//!
//! Sources are consulted in order and the first marker found decides. A
//! source without any marker defers to the next one.

use std::path::Path;

use sprint_types::RunStatus;
use tracing::debug;

pub const MANIFEST_MARKER_FILE: &str = "manifest.txt";
pub const EVENT_LOG_FILE: &str = "events.ndjson";

struct MarkerSource {
    file: &'static str,
    rules: &'static [(&'static str, RunStatus)],
}

const MARKER_SOURCES: [MarkerSource; 2] = [
    MarkerSource {
        file: MANIFEST_MARKER_FILE,
        rules: &[
            ("status=success", RunStatus::Success),
            ("status=failed", RunStatus::Failed),
            ("FAILED:", RunStatus::Failed),
            ("status=blocked", RunStatus::Blocked),
        ],
    },
    MarkerSource {
        file: EVENT_LOG_FILE,
        rules: &[
            ("\"type\":\"fail\"", RunStatus::Failed),
            ("\"type\":\"pass\"", RunStatus::Success),
        ],
    },
];

pub fn detect_status(run_dir: &Path) -> RunStatus {
    for source in &MARKER_SOURCES {
        let path = run_dir.join(source.file);
        if !path.is_file() {
            continue;
        }
        let text = match std::fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "marker file unreadable");
                continue;
            }
        };
        if let Some((_, status)) = source.rules.iter().find(|(marker, _)| text.contains(marker)) {
            return *status;
        }
    }
    RunStatus::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_with(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            std::fs::write(dir.path().join(name), body).unwrap();
        }
        dir
    }

    #[test]
    fn manifest_beats_event_log() {
        let dir = run_with(&[
            (MANIFEST_MARKER_FILE, "phase=3\nstatus=failed\n"),
            (EVENT_LOG_FILE, "{\"type\":\"pass\"}\n"),
        ]);
        assert_eq!(detect_status(dir.path()), RunStatus::Failed);
    }

    #[test]
    fn manifest_without_marker_defers_to_event_log() {
        let dir = run_with(&[
            (MANIFEST_MARKER_FILE, "nothing here\n"),
            (EVENT_LOG_FILE, "{\"type\":\"pass\"}\n"),
        ]);
        assert_eq!(detect_status(dir.path()), RunStatus::Success);
    }

    #[test]
    fn manifest_markers() {
        let blocked = run_with(&[(MANIFEST_MARKER_FILE, "status=blocked")]);
        assert_eq!(detect_status(blocked.path()), RunStatus::Blocked);
        let failed = run_with(&[(MANIFEST_MARKER_FILE, "FAILED: lint")]);
        assert_eq!(detect_status(failed.path()), RunStatus::Failed);
        let ok = run_with(&[(MANIFEST_MARKER_FILE, "status=success\nFAILED: retried")]);
        assert_eq!(detect_status(ok.path()), RunStatus::Success);
    }

    #[test]
    fn event_log_markers() {
        let fail = run_with(&[(EVENT_LOG_FILE, "{\"type\":\"pass\"}\n{\"type\":\"fail\"}\n")]);
        assert_eq!(detect_status(fail.path()), RunStatus::Failed);
        let pass = run_with(&[(EVENT_LOG_FILE, "{\"type\":\"pass\"}\n")]);
        assert_eq!(detect_status(pass.path()), RunStatus::Success);
        // Spaced JSON does not match the literal marker.
        let spaced = run_with(&[(EVENT_LOG_FILE, "{\"type\": \"pass\"}\n")]);
        assert_eq!(detect_status(spaced.path()), RunStatus::Unknown);
    }

    #[test]
    fn empty_run_is_unknown() {
        let dir = run_with(&[]);
        assert_eq!(detect_status(dir.path()), RunStatus::Unknown);
    }
}
