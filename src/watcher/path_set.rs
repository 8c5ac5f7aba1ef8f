//! Set of directory-name tokens used for exclusion matching.
//!
//! Tokens are base names (`.git`, `log`), never full paths. A `PathSet` is
//! owned by a single watcher and carries no internal synchronization.

use std::collections::HashSet;
use std::ffi::OsStr;

/// Directory-name tokens with O(1) membership.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PathSet {
    names: HashSet<String>,
}

impl PathSet {
    /// Create a set from the given tokens. Duplicates collapse.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Membership test for an OS name; non UTF-8 names never match.
    pub fn has_os(&self, name: &OsStr) -> bool {
        name.to_str().is_some_and(|n| self.has(n))
    }

    /// Returns true if the token was not already present.
    pub fn add(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    /// Returns true if the token was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.names.remove(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for PathSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_set_basic() {
        let set = PathSet::new([".git", "log", "tmp"]);

        assert_eq!(set.len(), 3);
        assert!(set.has(".git"));
        assert!(set.has("log"));
        assert!(!set.has("src"));
    }

    #[test]
    fn test_path_set_deduplicates() {
        let mut set = PathSet::new(["log", "log"]);
        assert_eq!(set.len(), 1);

        assert!(!set.add("log"));
        assert!(set.add("tmp"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_path_set_remove() {
        let mut set = PathSet::new(["log"]);

        assert!(set.remove("log"));
        assert!(!set.remove("log"));
        assert!(set.is_empty());
        assert!(!set.has("log"));
    }

    #[test]
    fn test_path_set_matches_tokens_not_paths() {
        let set = PathSet::new(["log"]);

        assert!(set.has_os(OsStr::new("log")));
        assert!(!set.has_os(OsStr::new("dirA/log")));
    }
}
