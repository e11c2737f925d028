//! Run identifiers.
//!
//! - `run_id`: `r` + zero-padded 4-digit sequence, scoped to one prompt slug
//! - `run_key`: `<prompt_slug>--<run_id>`, unique across a build
//! - `run_ref`: `runs.jsonl#<run_key>`, the back-reference carried by every row
//! - identity key: `<prompt_slug>|<source_family>|<source_run_path>`, the ledger key

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::layout::LogKind;

/// Short per-prompt run identifier.
///
/// Ids minted here are always canonical (`rNNNN`); ids reloaded from a
/// persisted ledger are kept verbatim so a hand-edited entry still round-trips.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Mint the id for a 1-based sequence number.
    pub fn from_seq(seq: u32) -> Self {
        Self(format!("r{seq:04}"))
    }

    /// Wrap an id read back from persisted state.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Sequence number encoded in the id, or 0 when the id is not of the
    /// form `r` followed by at least four digits.
    pub fn seq(&self) -> u32 {
        parse_run_seq(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn parse_run_seq(raw: &str) -> u32 {
    match raw.strip_prefix('r') {
        Some(digits) if digits.len() >= 4 && digits.chars().all(|c| c.is_ascii_digit()) => {
            digits.parse().unwrap_or(0)
        }
        _ => 0,
    }
}

/// `<prompt_slug>--<run_id>`
pub fn run_key(prompt_slug: &str, run_id: &RunId) -> String {
    format!("{prompt_slug}--{run_id}")
}

/// `runs.jsonl#<run_key>`
pub fn run_ref(run_key: &str) -> String {
    format!("{}#{run_key}", LogKind::Runs.file_name())
}

/// Ledger identity of a run; stable as long as the run stays at the same path.
pub fn identity_key(prompt_slug: &str, source_family: &str, source_run_path: &str) -> String {
    format!("{prompt_slug}|{source_family}|{source_run_path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn minted_ids_are_zero_padded() {
        assert_eq!(RunId::from_seq(1).as_str(), "r0001");
        assert_eq!(RunId::from_seq(42).as_str(), "r0042");
        assert_eq!(RunId::from_seq(9999).as_str(), "r9999");
    }

    #[test]
    fn stored_ids_parse_their_sequence() {
        assert_eq!(RunId::from_stored("r0007").seq(), 7);
        assert_eq!(RunId::from_stored("r12345").seq(), 12345);
        assert_eq!(RunId::from_stored("r7").seq(), 0);
        assert_eq!(RunId::from_stored("x0007").seq(), 0);
        assert_eq!(RunId::from_stored("r00a7").seq(), 0);
    }

    #[test]
    fn key_and_ref_formats() {
        let id = RunId::from_seq(3);
        let key = run_key("demo", &id);
        assert_eq!(key, "demo--r0003");
        assert_eq!(run_ref(&key), "runs.jsonl#demo--r0003");
        assert_eq!(
            identity_key("demo", "codex", "/repo/temp/codex/evidence/demo/run-1"),
            "demo|codex|/repo/temp/codex/evidence/demo/run-1"
        );
    }

    #[test]
    fn run_id_serializes_as_plain_string() {
        let id = RunId::from_seq(12);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"r0012\"");
    }

    proptest! {
        #[test]
        fn seq_round_trips(seq in 1u32..100_000) {
            prop_assert_eq!(RunId::from_seq(seq).seq(), seq);
        }
    }
}
