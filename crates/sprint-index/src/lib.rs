#![deny(unsafe_code)]
//! # sprint-index
//!
//! Builds the published evidence index from legacy run directories:
//! - Run discovery over configured source layouts
//! - Stable per-prompt run ids via a persisted ledger
//! - Incremental skip when the source snapshot is unchanged
//! - Append-only logs plus derived views written into a staging directory
//! - The earlier copied-tree and blob layouts, selected by [`Phase`](sprint_types::Phase)
//! - Single-rename promotion keeping one rollback generation
//!
//! ## Key Types
//!
//! - [`SourceLayout`] - where and how runs are discovered
//! - [`RunIdLedger`] - identity key → run id document threaded through [`assign`]
//! - [`SourceSnapshot`] - projection compared by [`should_skip`]
//! - [`IndexBuilder`] - writes one flat generation
//! - [`TreeBuilder`] / [`BlobBuilder`] - write one copied-tree / blob generation
//! - [`BuildOptions`] / [`build`] - the whole pipeline

pub mod builder;
pub mod discovery;
pub mod error;
pub mod io;
pub mod ledger;
pub mod legacy;
pub mod metrics;
pub mod pipeline;
pub mod promote;
pub mod snapshot;
pub mod status;

pub use builder::{IndexBuilder, README_FALLBACK};
pub use discovery::{discover, SourceLayout};
pub use error::{IndexError, IndexResult};
pub use legacy::{safe_blob_name, BlobBuilder, TreeBuilder};
pub use ledger::{assign, assign_sequential, PromptLedger, RunIdLedger};
pub use metrics::tree_metrics;
pub use pipeline::{build, build_phases, default_ledger_path, preview_runs, BuildOptions};
pub use promote::{backup_path, promote, restore_previous, staging_path};
pub use snapshot::{should_skip, SourceSnapshot};
pub use status::detect_status;
