//! Identity ledger: durable per-prompt run ids.
//!
//! The ledger is an explicit document. A build loads it, threads it through
//! [`assign`], and persists the returned copy; nothing here is global.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sprint_types::{identity_key, now_utc_iso, AssignedRun, LegacyRun, RunId};
use tracing::{debug, warn};

use crate::error::IndexResult;
use crate::io::write_json_atomic;

pub const LEDGER_VERSION: &str = "v1";

/// Ids issued for one prompt slug.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptLedger {
    /// Sequence number the next unseen run receives.
    pub next_seq: u32,
    /// identity key → run id
    pub entries: BTreeMap<String, String>,
}

impl Default for PromptLedger {
    fn default() -> Self {
        Self {
            next_seq: 1,
            entries: BTreeMap::new(),
        }
    }
}

impl PromptLedger {
    /// Id for `identity`, minting the next one if the identity is new.
    fn id_for(&mut self, identity: String) -> RunId {
        if let Some(stored) = self.entries.get(&identity) {
            return RunId::from_stored(stored.clone());
        }
        let run_id = RunId::from_seq(self.next_seq);
        self.next_seq = self.next_seq.saturating_add(1);
        self.entries.insert(identity, run_id.to_string());
        run_id
    }
}

/// The persisted run-id ledger document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdLedger {
    pub version: String,
    pub updated_utc: String,
    pub prompts: BTreeMap<String, PromptLedger>,
}

impl Default for RunIdLedger {
    fn default() -> Self {
        Self::empty()
    }
}

impl RunIdLedger {
    pub fn empty() -> Self {
        Self {
            version: LEDGER_VERSION.to_string(),
            updated_utc: String::new(),
            prompts: BTreeMap::new(),
        }
    }

    /// Load the ledger at `path`. A missing, unreadable or malformed document
    /// yields an empty ledger.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "no run-id ledger yet");
            return Self::empty();
        }
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "run-id ledger unreadable, starting empty");
                return Self::empty();
            }
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "run-id ledger is not valid JSON, starting empty");
                Self::empty()
            }
        }
    }

    /// Normalize an arbitrary JSON value into a ledger.
    ///
    /// Non-object prompts and non-string entries are dropped. `next_seq` is
    /// raised past every sequence already issued so minted ids never collide
    /// with stored ones.
    pub fn from_value(value: &Value) -> Self {
        let mut ledger = Self::empty();
        let Some(prompts) = value.get("prompts").and_then(Value::as_object) else {
            return ledger;
        };
        for (slug, raw) in prompts {
            let Some(raw) = raw.as_object() else {
                continue;
            };
            let entries: BTreeMap<String, String> = raw
                .get("entries")
                .and_then(Value::as_object)
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(|(k, v)| v.as_str().map(|id| (k.clone(), id.to_string())))
                        .collect()
                })
                .unwrap_or_default();
            let issued = entries
                .values()
                .map(|id| RunId::from_stored(id.as_str()).seq())
                .max()
                .unwrap_or(0);
            let declared = raw
                .get("next_seq")
                .and_then(Value::as_u64)
                .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
                .unwrap_or(1);
            let next_seq = declared.max(issued.saturating_add(1));
            ledger
                .prompts
                .insert(slug.clone(), PromptLedger { next_seq, entries });
        }
        ledger
    }

    /// Stored id for an identity, if any.
    pub fn lookup(&self, prompt_slug: &str, identity: &str) -> Option<&str> {
        self.prompts
            .get(prompt_slug)?
            .entries
            .get(identity)
            .map(String::as_str)
    }

    /// Rewrite the whole ledger at `path`, stamping `updated_utc`.
    pub fn persist(&mut self, path: &Path) -> IndexResult<()> {
        self.updated_utc = now_utc_iso();
        write_json_atomic(path, self)?;
        debug!(path = %path.display(), prompts = self.prompts.len(), "run-id ledger persisted");
        Ok(())
    }
}

/// Assign ids to runs in discovery order.
///
/// With a ledger, known identities keep their stored id and new ones are
/// minted from the prompt's `next_seq`; the updated ledger is returned.
/// Without one, ids follow occurrence order in this pass only.
pub fn assign(
    runs: Vec<LegacyRun>,
    ledger: Option<RunIdLedger>,
) -> (Vec<AssignedRun>, Option<RunIdLedger>) {
    match ledger {
        None => (assign_sequential(runs), None),
        Some(mut ledger) => {
            let assigned = runs
                .into_iter()
                .map(|run| {
                    let identity =
                        identity_key(&run.prompt_slug, &run.source_family, &run.source_run_path);
                    let run_id = ledger
                        .prompts
                        .entry(run.prompt_slug.clone())
                        .or_default()
                        .id_for(identity);
                    AssignedRun::new(run, run_id)
                })
                .collect();
            (assigned, Some(ledger))
        }
    }
}

/// Stateless ids: `r0001`, `r0002`, ... per prompt slug in the given order.
pub fn assign_sequential(runs: Vec<LegacyRun>) -> Vec<AssignedRun> {
    let mut counters: BTreeMap<String, u32> = BTreeMap::new();
    runs.into_iter()
        .map(|run| {
            let seq = counters.entry(run.prompt_slug.clone()).or_insert(0);
            *seq += 1;
            let run_id = RunId::from_seq(*seq);
            AssignedRun::new(run, run_id)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(slug: &str, path: &str, epoch: f64) -> LegacyRun {
        LegacyRun {
            source_family: "codex".into(),
            source_root: "/src".into(),
            source_prompt_label: slug.into(),
            source_run_label: path.rsplit('/').next().unwrap_or(path).into(),
            source_run_path: path.into(),
            prompt_slug: slug.into(),
            sort_epoch: epoch,
            files: vec![],
            total_bytes: 0,
        }
    }

    fn ids(runs: &[AssignedRun]) -> Vec<(&str, &str)> {
        runs.iter()
            .map(|r| (r.run.source_run_path.as_str(), r.run_id.as_str()))
            .collect()
    }

    #[test]
    fn sequential_ids_are_scoped_per_prompt() {
        let assigned = assign_sequential(vec![
            run("alpha", "/a/1", 1.0),
            run("alpha", "/a/2", 2.0),
            run("beta", "/b/1", 1.0),
        ]);
        let keys: Vec<_> = assigned.iter().map(|r| r.run_key.as_str()).collect();
        assert_eq!(keys, vec!["alpha--r0001", "alpha--r0002", "beta--r0001"]);
        assert_eq!(assigned[1].run_seq, 2);
    }

    #[test]
    fn ledger_ids_survive_earlier_insertions() {
        let (first, ledger) = assign(
            vec![run("demo", "/p1", 100.0), run("demo", "/p2", 200.0)],
            Some(RunIdLedger::empty()),
        );
        assert_eq!(ids(&first), vec![("/p1", "r0001"), ("/p2", "r0002")]);

        let (second, ledger) = assign(
            vec![
                run("demo", "/p3", 50.0),
                run("demo", "/p1", 100.0),
                run("demo", "/p2", 200.0),
            ],
            ledger,
        );
        assert_eq!(
            ids(&second),
            vec![("/p3", "r0003"), ("/p1", "r0001"), ("/p2", "r0002")]
        );
        let ledger = ledger.unwrap();
        assert_eq!(ledger.prompts["demo"].next_seq, 4);
        assert_eq!(ledger.lookup("demo", "demo|codex|/p3"), Some("r0003"));
    }

    #[test]
    fn removed_runs_keep_their_reservation() {
        let (_, ledger) = assign(
            vec![run("demo", "/p1", 1.0), run("demo", "/p2", 2.0)],
            Some(RunIdLedger::empty()),
        );
        let (again, _) = assign(vec![run("demo", "/p2", 2.0)], ledger);
        assert_eq!(ids(&again), vec![("/p2", "r0002")]);
    }

    #[test]
    fn normalization_repairs_next_seq_and_drops_junk() {
        let ledger = RunIdLedger::from_value(&json!({
            "version": "v1",
            "prompts": {
                "demo": {"next_seq": 2, "entries": {"a": "r0007", "b": 12}},
                "bad": "not an object",
                "fresh": {"entries": {}}
            }
        }));
        assert_eq!(ledger.prompts.len(), 2);
        assert_eq!(ledger.prompts["demo"].next_seq, 8);
        assert_eq!(ledger.prompts["demo"].entries.len(), 1);
        assert_eq!(ledger.prompts["fresh"].next_seq, 1);

        assert!(RunIdLedger::from_value(&json!([1, 2])).prompts.is_empty());
    }

    #[test]
    fn corrupt_ledger_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "{ this is not json").unwrap();

        let (assigned, _) = assign(vec![run("demo", "/p1", 1.0)], Some(RunIdLedger::load(&path)));
        assert_eq!(assigned[0].run_id.as_str(), "r0001");
    }

    #[test]
    fn persisted_ledger_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.run_id_ledger.json");
        let (_, ledger) = assign(
            vec![run("zeta", "/z", 1.0), run("alpha", "/a", 1.0)],
            Some(RunIdLedger::load(&path)),
        );
        let mut ledger = ledger.unwrap();
        ledger.persist(&path).unwrap();

        let reloaded = RunIdLedger::load(&path);
        assert_eq!(reloaded.prompts, ledger.prompts);
        assert!(!reloaded.updated_utc.is_empty());

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.find("\"alpha\"").unwrap() < text.find("\"zeta\"").unwrap());
    }
}
