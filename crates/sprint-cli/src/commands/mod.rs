//! Subcommand implementations

pub mod build;
pub mod rollback;
pub mod runs;
pub mod verify;
