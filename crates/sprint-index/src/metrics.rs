use std::path::Path;

use sprint_types::TreeMetrics;
use walkdir::WalkDir;

/// Files at or below this size count as small.
pub const SMALL_FILE_BYTES: u64 = 120;

/// Footprint of the tree under `root`; entries directly under it have depth 1.
pub fn tree_metrics(root: &Path) -> TreeMetrics {
    let mut metrics = TreeMetrics::default();
    for entry in WalkDir::new(root).min_depth(1).into_iter().filter_map(Result::ok) {
        metrics.max_depth = metrics.max_depth.max(entry.depth() as u64);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            metrics.dirs += 1;
        } else if file_type.is_file() {
            metrics.files += 1;
            if entry.metadata().map(|m| m.len() <= SMALL_FILE_BYTES).unwrap_or(false) {
                metrics.small_files_le_120b += 1;
            }
        }
    }
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_dirs_files_and_depth() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("a/b")).unwrap();
        std::fs::write(root.join("top.json"), "{}").unwrap();
        std::fs::write(root.join("a/b/big.bin"), vec![0u8; 500]).unwrap();

        let m = tree_metrics(root);
        assert_eq!(m.dirs, 2);
        assert_eq!(m.files, 2);
        assert_eq!(m.small_files_le_120b, 1);
        assert_eq!(m.max_depth, 3);
    }

    #[test]
    fn missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(tree_metrics(&dir.path().join("nope")), TreeMetrics::default());
    }
}
