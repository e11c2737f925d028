#![deny(unsafe_code)]
//! # sprint-verify
//!
//! Integrity verification for published sprint evidence indexes.
//!
//! Checks run in a fixed order and are fail-closed: any violation makes the
//! verdict fail, but no violation stops the remaining checks.
//!
//! ## Key Types
//!
//! - [`Verifier`] - runs the checks for one root and [`Phase`]
//! - [`Verdict`] - `verify.result.json`
//! - [`DriftGuard`] - deprecated-script and scheduler guardrails
//! - [`FieldRule`] - per-log field contract

pub mod contract;
pub mod error;
pub mod guard;
pub mod verdict;
pub mod verifier;

pub use contract::{rules_for, validate_row, FieldKind, FieldRule};
pub use error::{VerifyError, VerifyResult};
pub use guard::DriftGuard;
pub use sprint_types::Phase;
pub use verdict::Verdict;
pub use verifier::{Verifier, SYNC_ALLOWLIST_FILE};
