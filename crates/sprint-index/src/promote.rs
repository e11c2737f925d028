//! Staging promotion with a single rollback generation.
//!
//! A generation is built at `<parent>/.staging.<name>` and published with one
//! rename, so the published path never exposes a partial generation. The
//! previously published tree is kept at `<parent>/<name>.previous`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{IndexError, IndexResult, IoContext};

fn split(published: &Path) -> IndexResult<(PathBuf, String)> {
    let name = published
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| IndexError::InvalidOutputRoot(published.to_path_buf()))?;
    let parent = published
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((parent, name))
}

/// `<parent>/.staging.<name>`
pub fn staging_path(published: &Path) -> IndexResult<PathBuf> {
    let (parent, name) = split(published)?;
    Ok(parent.join(format!(".staging.{name}")))
}

/// `<parent>/<name>.previous`
pub fn backup_path(published: &Path) -> IndexResult<PathBuf> {
    let (parent, name) = split(published)?;
    Ok(parent.join(format!("{name}.previous")))
}

/// Fresh, empty staging directory for `published`; a stale one is removed.
pub fn prepare_staging(published: &Path) -> IndexResult<PathBuf> {
    let staging = staging_path(published)?;
    if staging.exists() {
        warn!(path = %staging.display(), "removing stale staging directory");
        fs::remove_dir_all(&staging).at(&staging)?;
    }
    fs::create_dir_all(&staging).at(&staging)?;
    Ok(staging)
}

/// Publish `staging` at `published`, moving the current generation (if any)
/// to the backup slot and dropping the older backup.
pub fn promote(staging: &Path, published: &Path) -> IndexResult<()> {
    let backup = backup_path(published)?;
    if backup.exists() {
        fs::remove_dir_all(&backup).at(&backup)?;
    }
    if published.exists() {
        fs::rename(published, &backup).at(published)?;
    }
    fs::rename(staging, published).at(published)?;
    info!(path = %published.display(), "generation promoted");
    Ok(())
}

/// Best-effort removal of an abandoned staging directory.
pub fn discard(staging: &Path) {
    if !staging.exists() {
        return;
    }
    if let Err(e) = fs::remove_dir_all(staging) {
        warn!(path = %staging.display(), error = %e, "could not remove staging directory");
    }
}

/// Put the backup generation back at `published`, discarding the current one.
pub fn restore_previous(published: &Path) -> IndexResult<PathBuf> {
    let backup = backup_path(published)?;
    if !backup.is_dir() {
        return Err(IndexError::NoPreviousGeneration(backup));
    }
    if published.exists() {
        fs::remove_dir_all(published).at(published)?;
    }
    fs::rename(&backup, published).at(published)?;
    info!(path = %published.display(), from = %backup.display(), "previous generation restored");
    Ok(backup)
}
