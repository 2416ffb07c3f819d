//! Lazy directory traversal with exclusion rules.
//!
//! Produces the candidate file paths a scan considers: a depth-first walk
//! that skips hidden directories and dependency/system folders, and logs
//! and skips unreadable subtrees instead of aborting the walk. Symlinks are
//! not followed, which also sidesteps symlink cycles.

use crate::config::ScanConfig;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

fn is_excluded_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || ScanConfig::EXCLUDED_DIRS.contains(&name.as_ref())
}

/// Iterate over every regular file under `root`, depth-first.
///
/// With `recursive` false, only the immediate children of `root` are
/// considered. Each call restarts the walk from scratch; iteration order is
/// per-directory filesystem enumeration order, not sorted.
pub fn walk_files(root: &Path, recursive: bool) -> impl Iterator<Item = PathBuf> {
    let max_depth = if recursive { usize::MAX } else { 1 };

    WalkDir::new(root)
        .follow_links(false)
        .max_depth(max_depth)
        .into_iter()
        // Depth 0 is the root itself; never filter it, even if hidden.
        .filter_entry(|e| e.depth() == 0 || !is_excluded_dir(e))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Skipping unreadable path during walk: {err}");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    fn names(root: &Path, recursive: bool) -> HashSet<String> {
        walk_files(root, recursive)
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_recursive_walk_finds_nested_files() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("a.wav"));
        touch(&temp.path().join("packs/kicks/b.wav"));
        touch(&temp.path().join("packs/leads/c.flp"));

        let found = names(temp.path(), true);
        assert_eq!(
            found,
            HashSet::from(["a.wav".into(), "b.wav".into(), "c.flp".into()])
        );
    }

    #[test]
    fn test_hidden_and_excluded_dirs_skipped() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("keep.wav"));
        touch(&temp.path().join(".cache/skip.wav"));
        touch(&temp.path().join("node_modules/dep/skip.wav"));
        touch(&temp.path().join("target/debug/skip.wav"));

        let found = names(temp.path(), true);
        assert_eq!(found, HashSet::from(["keep.wav".into()]));
    }

    #[test]
    fn test_hidden_files_are_not_skipped() {
        // Only hidden *directories* are pruned; a dotfile is still yielded
        // and left for the classifier to reject.
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join(".DS_Store"));
        touch(&temp.path().join("a.wav"));

        let found = names(temp.path(), true);
        assert!(found.contains(".DS_Store"));
        assert!(found.contains("a.wav"));
    }

    #[test]
    fn test_shallow_walk() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("top.wav"));
        touch(&temp.path().join("nested/deep.wav"));

        let found = names(temp.path(), false);
        assert_eq!(found, HashSet::from(["top.wav".into()]));
    }

    #[test]
    fn test_directories_not_yielded() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("dir/a.wav"));

        for path in walk_files(temp.path(), true) {
            assert!(path.is_file());
        }
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let temp = TempDir::new().unwrap();
        let gone = temp.path().join("nope");
        assert_eq!(walk_files(&gone, true).count(), 0);
    }
}
