//! Directory discovery for building the watched-directory set.
//!
//! The OS primitive only supports flat watches, so every directory under a
//! root has to be registered on its own. Excluded names prune whole subtrees:
//! `.git` or build output must never be descended into.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::error::WatchError;
use super::path_set::PathSet;

/// Return every directory under `root` (inclusive), depth first.
///
/// A directory whose base name is in `exclusions` is skipped together with
/// everything below it, including when it is `root` itself. Any traversal
/// error aborts the whole discovery; partial results are never returned.
pub fn discover(root: &Path, exclusions: &PathSet) -> Result<Vec<PathBuf>, WatchError> {
    let mut directories = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !(entry.file_type().is_dir() && exclusions.has_os(entry.file_name())));

    for entry in walker {
        let entry = entry.map_err(|e| WatchError::DiscoveryFailed {
            root: root.to_path_buf(),
            reason: e.to_string(),
        })?;

        if entry.file_type().is_dir() {
            directories.push(entry.into_path());
        }
    }

    Ok(directories)
}
