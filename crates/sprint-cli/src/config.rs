//! Configuration for the sprint CLI
//!
//! Layered through the `config` crate: built-in defaults, then the JSON
//! config file, then `SPRINT_*` environment variables (`__` separates
//! nested keys, e.g. `SPRINT_BUILD__INCREMENTAL=false`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sprint_index::{default_ledger_path, SourceLayout};
use sprint_types::{Phase, UnknownPhase};
use sprint_verify::DriftGuard;

use crate::error::{CliError, CliResult};

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "sprint.config.json";

pub const CONFIG_VERSION: &str = "v1";

/// `build.ledger_path` value selecting stateless ids.
pub const NO_LEDGER: &str = "none";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintConfig {
    #[serde(default = "default_version")]
    pub version: String,

    /// Repository root; relative values resolve against the working directory.
    #[serde(default = "default_repo_root")]
    pub repo_root: String,

    /// Published index root; relative values resolve against `repo_root`.
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub verify: VerifyConfig,

    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl Default for SprintConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            repo_root: default_repo_root(),
            out_dir: default_out_dir(),
            build: BuildConfig::default(),
            verify: VerifyConfig::default(),
            discovery: DiscoveryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_true")]
    pub incremental: bool,

    /// Empty: `<out>.run_id_ledger.json` beside the published root.
    /// `"none"`: stateless ids.
    #[serde(default)]
    pub ledger_path: String,

    /// Published layout: 1, 2, 3 or all.
    #[serde(default = "default_phase")]
    pub phase: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            incremental: true,
            ledger_path: String::new(),
            phase: default_phase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyConfig {
    #[serde(default = "default_phase")]
    pub phase: String,

    /// Canonical README; copied into every generation and compared by verify.
    #[serde(default = "default_reference_doc")]
    pub reference_doc: String,

    #[serde(default)]
    pub guardrails: DriftGuard,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            phase: default_phase(),
            reference_doc: default_reference_doc(),
            guardrails: DriftGuard::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "SourceLayout::defaults")]
    pub layouts: Vec<SourceLayout>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            layouts: SourceLayout::defaults(),
        }
    }
}

fn default_version() -> String {
    CONFIG_VERSION.to_string()
}

fn default_repo_root() -> String {
    ".".to_string()
}

fn default_out_dir() -> String {
    "temp/sprint-index".to_string()
}

fn default_phase() -> String {
    Phase::Flat.to_string()
}

fn default_reference_doc() -> String {
    "tools/sprint/README.md".to_string()
}

fn default_true() -> bool {
    true
}

impl SprintConfig {
    /// Load configuration. An explicit `path` must exist; the default file is
    /// optional.
    pub fn load(path: Option<&str>) -> CliResult<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&SprintConfig::default())?);

        let (file, required) = match path {
            Some(path) => (path, true),
            None => (DEFAULT_CONFIG_FILE, false),
        };
        builder = builder
            .add_source(config::File::new(file, config::FileFormat::Json).required(required));

        builder = builder.add_source(
            config::Environment::with_prefix("SPRINT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: SprintConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks run before anything touches the filesystem.
    pub fn validate(&self) -> CliResult<()> {
        if self.version != CONFIG_VERSION {
            return Err(CliError::Config(format!(
                "unsupported config version {:?} (expected {CONFIG_VERSION})",
                self.version
            )));
        }
        if self.repo_root.trim().is_empty() {
            return Err(CliError::Config("`repo_root` must not be empty".into()));
        }
        if self.out_dir.trim().is_empty() {
            return Err(CliError::Config("`out_dir` must not be empty".into()));
        }
        self.phase()?;
        self.build_phase()?;
        for (idx, layout) in self.discovery.layouts.iter().enumerate() {
            let roots: Vec<&Path> = match layout {
                SourceLayout::PromptRuns { roots, .. } => roots.iter().map(PathBuf::as_path).collect(),
                SourceLayout::FlatRuns { root, .. } => vec![root.as_path()],
            };
            if layout.family().trim().is_empty() {
                return Err(CliError::Config(format!(
                    "discovery.layouts[{idx}]: `family` must not be empty"
                )));
            }
            if roots.is_empty() || roots.iter().any(|r| r.as_os_str().is_empty()) {
                return Err(CliError::Config(format!(
                    "discovery.layouts[{idx}]: every layout needs a non-empty root"
                )));
            }
        }
        Ok(())
    }

    /// Layout contract checked by `verify`.
    pub fn phase(&self) -> CliResult<Phase> {
        parse_phase("verify.phase", &self.verify.phase)
    }

    /// Layout(s) written by `build`.
    pub fn build_phase(&self) -> CliResult<Phase> {
        parse_phase("build.phase", &self.build.phase)
    }

    /// Absolute repository root.
    pub fn repo_root(&self) -> CliResult<PathBuf> {
        let root = PathBuf::from(&self.repo_root);
        if root.is_absolute() {
            return Ok(root);
        }
        let cwd = std::env::current_dir()?;
        if root == Path::new(".") {
            return Ok(cwd);
        }
        Ok(cwd.join(root))
    }

    /// `value` resolved against the repository root.
    pub fn resolve(&self, value: &str) -> CliResult<PathBuf> {
        let path = PathBuf::from(value);
        if path.is_absolute() {
            return Ok(path);
        }
        Ok(self.repo_root()?.join(path))
    }

    pub fn out_root(&self) -> CliResult<PathBuf> {
        self.resolve(&self.out_dir)
    }

    pub fn reference_doc(&self) -> CliResult<PathBuf> {
        self.resolve(&self.verify.reference_doc)
    }

    /// Ledger location for a published root; `None` selects stateless ids.
    pub fn ledger_path(&self, out_root: &Path) -> CliResult<Option<PathBuf>> {
        resolve_ledger(&self.build.ledger_path, out_root, |v| self.resolve(v))
    }
}

fn parse_phase(key: &str, value: &str) -> CliResult<Phase> {
    value
        .parse()
        .map_err(|e: UnknownPhase| CliError::Config(format!("{key}: {e}")))
}

/// Interpret a ledger setting: empty → default sibling path, `none` →
/// stateless, anything else → a path.
pub fn resolve_ledger(
    value: &str,
    out_root: &Path,
    resolve: impl Fn(&str) -> CliResult<PathBuf>,
) -> CliResult<Option<PathBuf>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(Some(default_ledger_path(out_root)?));
    }
    if value.eq_ignore_ascii_case(NO_LEDGER) {
        return Ok(None);
    }
    resolve(value).map(Some)
}
