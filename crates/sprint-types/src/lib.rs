#![deny(unsafe_code)]
//! # sprint-types
//!
//! Shared data model for the sprint evidence index.
//!
//! ## Key Types
//!
//! - [`LegacyRun`] / [`AssignedRun`] - a discovered run before and after id assignment
//! - [`RunId`] - per-prompt short id (`rNNNN`)
//! - [`IndexRow`] - closed set of rows appended to the four flat logs
//! - [`Catalog`], [`StateLatest`], [`SchemaDoc`], [`GenerationSummary`] - derived views
//! - [`Phase`] - published layout selector (copied tree, blobs, flat logs)
//!
//! Field names of rows and documents are a consumer contract: renaming one
//! requires a layout version bump.

pub mod digest;
pub mod documents;
pub mod ids;
pub mod layout;
pub mod legacy;
pub mod phase;
pub mod rows;
pub mod run;
pub mod slug;
pub mod time;

pub use digest::sha256_file;
pub use documents::{
    Catalog, GenerationSummary, PromptAggregate, SchemaDoc, StateLatest, TreeMetrics,
};
pub use ids::{identity_key, run_key, run_ref, RunId};
pub use layout::{LogKind, BLOB_VERSION, FLAT_VERSION, TREE_VERSION};
pub use legacy::{
    BlobEntry, BlobPromptCatalog, BlobPromptStats, BlobRunRecord, BlobRunSummary,
    LegacyRunFields, LegacySchemaDoc, TreePromptCatalog, TreeRunRecord,
};
pub use phase::{Phase, UnknownPhase};
pub use rows::{ArtifactRow, HistoryRow, IndexRow, RunSummaryRow, StateRow, RUN_INDEXED_EVENT};
pub use run::{AssignedRun, LegacyRun, RunStatus};
pub use slug::{prompt_slug_from_value, slugify, UNKNOWN_SLUG};
pub use time::now_utc_iso;
