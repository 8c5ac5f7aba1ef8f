//! Recursive watching on top of a flat notification primitive.
//!
//! `notify` watches are registered one directory at a time
//! (`RecursiveMode::NonRecursive`). [`FsWatcher`] keeps the watched-directory
//! set in step with the tree: `add` discovers and registers a whole subtree,
//! and [`FsWatchable::handle`] grows or shrinks the set as directories come
//! and go while classifying each event.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::utils;

use super::discover::discover;
use super::error::WatchError;
use super::event::{FsEvent, FsOp};
use super::path_set::PathSet;

/// Raw watch adapter used by the debounced watcher.
#[async_trait]
pub trait FsWatchable: Send {
    /// Classify an event, updating the watch set as a side effect.
    ///
    /// Returns true when the event warrants a re-index.
    fn handle(&mut self, event: &FsEvent) -> bool;

    /// Register `path` and every non-excluded directory below it.
    fn add(&mut self, path: &Path) -> Result<(), WatchError>;

    /// Deregister exactly `path`.
    fn remove(&mut self, path: &Path) -> Result<(), WatchError>;

    /// Next raw event or backend error. `None` once the adapter is closed.
    ///
    /// Must be cancel safe: it is polled inside `select!`.
    async fn next_event(&mut self) -> Option<Result<FsEvent, WatchError>>;

    /// Release the OS resources. Calling it again is a no-op.
    fn close(&mut self);
}

/// [`FsWatchable`] backed by `notify::RecommendedWatcher`.
pub struct FsWatcher {
    /// `None` once closed; dropping it stops the backend thread.
    watcher: Option<notify::RecommendedWatcher>,
    event_rx: mpsc::Receiver<notify::Result<notify::Event>>,
    /// Expanded events not yet handed out.
    pending: VecDeque<FsEvent>,
    exclusions: PathSet,
    tag_file_prefix: String,
    watched: HashSet<PathBuf>,
}

impl FsWatcher {
    /// Construct the OS watch primitive.
    ///
    /// Failure here is setup-fatal for the caller.
    pub fn new(exclusions: PathSet, tag_file_prefix: impl Into<String>) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::channel(256);

        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = tx.blocking_send(res);
        })?;

        Ok(Self {
            watcher: Some(watcher),
            event_rx: rx,
            pending: VecDeque::new(),
            exclusions,
            tag_file_prefix: tag_file_prefix.into(),
            watched: HashSet::new(),
        })
    }

    /// Directories currently registered with the backend.
    pub fn watched(&self) -> &HashSet<PathBuf> {
        &self.watched
    }

    pub fn is_watched(&self, path: &Path) -> bool {
        self.watched.contains(path)
    }

    pub fn exclusions(&self) -> &PathSet {
        &self.exclusions
    }

    /// Deregister `path` and every watched directory below it.
    ///
    /// A path that is not itself watched (a plain file) is a no-op. Failures
    /// are logged; the entries leave the watched set regardless, since the
    /// backend usually drops watches on deleted directories itself.
    pub fn remove_tree(&mut self, path: &Path) {
        if !self.watched.contains(path) {
            return;
        }

        let doomed: Vec<PathBuf> = self
            .watched
            .iter()
            .filter(|dir| dir.starts_with(path))
            .cloned()
            .collect();

        for dir in doomed {
            if let Err(e) = self.remove(&dir) {
                crate::debug_event!("watcher", "unwatch", "{e}");
            }
        }
    }

    fn is_tag_file(&self, event: &FsEvent) -> bool {
        !self.tag_file_prefix.is_empty()
            && event
                .file_name()
                .is_some_and(|name| name.contains(self.tag_file_prefix.as_str()))
    }
}

#[async_trait]
impl FsWatchable for FsWatcher {
    fn handle(&mut self, event: &FsEvent) -> bool {
        // the indexer's own output must never trigger a reindex
        if self.is_tag_file(event) {
            return false;
        }

        crate::debug_event!("watcher", "event", "{:?} {}", event.op, event.path.display());

        match event.op {
            FsOp::Remove | FsOp::Rename => {
                self.remove_tree(&event.path);
                true
            }
            FsOp::Create | FsOp::Write => match utils::is_directory(&event.path) {
                Err(e) => {
                    tracing::error!("[watcher] cannot stat {}: {e}", event.path.display());
                    false
                }
                Ok(true) => match self.add(&event.path) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::error!("[watcher] {e}");
                        false
                    }
                },
                Ok(false) => true,
            },
            FsOp::Chmod => false,
            FsOp::Other => true,
        }
    }

    fn add(&mut self, path: &Path) -> Result<(), WatchError> {
        if self.watcher.is_none() {
            return Err(WatchError::Closed);
        }

        let directories = discover(path, &self.exclusions)?;

        let Some(watcher) = self.watcher.as_mut() else {
            return Err(WatchError::Closed);
        };

        for dir in directories {
            if self.watched.contains(&dir) {
                continue;
            }
            match watcher.watch(&dir, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    crate::debug_event!("watcher", "watching", "{}", dir.display());
                    self.watched.insert(dir);
                }
                Err(e) => {
                    // Degraded: this subtree stays invisible until re-added
                    tracing::warn!("[watcher] failed to watch {}: {e}", dir.display());
                }
            }
        }

        Ok(())
    }

    fn remove(&mut self, path: &Path) -> Result<(), WatchError> {
        let Some(watcher) = self.watcher.as_mut() else {
            return Err(WatchError::Closed);
        };

        self.watched.remove(path);
        watcher
            .unwatch(path)
            .map_err(|e| WatchError::PathUnwatchFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    async fn next_event(&mut self) -> Option<Result<FsEvent, WatchError>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }

            match self.event_rx.recv().await? {
                Ok(event) => self.pending.extend(FsEvent::from_notify(event)),
                Err(e) => {
                    return Some(Err(WatchError::EventError {
                        details: e.to_string(),
                    }));
                }
            }
        }
    }

    fn close(&mut self) {
        if self.watcher.take().is_some() {
            self.watched.clear();
            self.pending.clear();
            self.event_rx.close();
            crate::debug_event!("watcher", "closed");
        }
    }
}

impl Drop for FsWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn watcher() -> FsWatcher {
        FsWatcher::new(PathSet::new([".git", "log"]), "TAGS").unwrap()
    }

    #[test]
    fn test_handle_ignores_tag_files_for_every_op() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("TAGS"), "").unwrap();
        let mut fs_watcher = watcher();

        let names = ["TAGS", "TAGS.project", "TAGS.gemset", "*TAGS*"];
        let ops = [
            FsOp::Create,
            FsOp::Write,
            FsOp::Remove,
            FsOp::Rename,
            FsOp::Chmod,
            FsOp::Other,
        ];

        for name in names {
            for op in ops {
                let event = FsEvent::new(temp_dir.path().join(name), op);
                assert!(!fs_watcher.handle(&event), "{name} {op:?}");
            }
        }
    }

    #[test]
    fn test_handle_remove_and_rename_qualify() {
        let mut fs_watcher = watcher();

        assert!(fs_watcher.handle(&FsEvent::new("/nowhere/foo", FsOp::Remove)));
        assert!(fs_watcher.handle(&FsEvent::new("/nowhere/foo", FsOp::Rename)));
    }

    #[test]
    fn test_handle_create_or_write_on_existing_path_qualifies() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("main.rb");
        fs::write(&file, "puts 1").unwrap();
        let mut fs_watcher = watcher();

        assert!(fs_watcher.handle(&FsEvent::new(&file, FsOp::Create)));
        assert!(fs_watcher.handle(&FsEvent::new(&file, FsOp::Write)));
    }

    #[test]
    fn test_handle_create_on_vanished_path_does_not_qualify() {
        let temp_dir = TempDir::new().unwrap();
        let mut fs_watcher = watcher();

        let event = FsEvent::new(temp_dir.path().join("gone"), FsOp::Create);
        assert!(!fs_watcher.handle(&event));
    }

    #[test]
    fn test_handle_chmod_does_not_qualify() {
        let mut fs_watcher = watcher();
        assert!(!fs_watcher.handle(&FsEvent::new("/nowhere/foo", FsOp::Chmod)));
    }

    #[test]
    fn test_handle_other_qualifies() {
        let mut fs_watcher = watcher();
        assert!(fs_watcher.handle(&FsEvent::new("/nowhere/foo", FsOp::Other)));
    }

    #[test]
    fn test_add_registers_subtree_without_exclusions() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("lib/models")).unwrap();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        let mut fs_watcher = watcher();

        fs_watcher.add(root).unwrap();

        assert_eq!(fs_watcher.watched().len(), 3);
        assert!(fs_watcher.is_watched(root));
        assert!(fs_watcher.is_watched(&root.join("lib/models")));
        assert!(!fs_watcher.is_watched(&root.join(".git")));
        assert!(!fs_watcher.is_watched(&root.join(".git/objects")));
    }

    #[test]
    fn test_handle_new_directory_becomes_watched() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let mut fs_watcher = watcher();
        fs_watcher.add(root).unwrap();

        let new_dir = root.join("app/controllers");
        fs::create_dir_all(&new_dir).unwrap();

        assert!(fs_watcher.handle(&FsEvent::new(root.join("app"), FsOp::Create)));
        assert!(fs_watcher.is_watched(&root.join("app")));
        assert!(fs_watcher.is_watched(&new_dir));
    }

    #[test]
    fn test_handle_removed_directory_drops_subtree() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("app/models")).unwrap();
        fs::create_dir(root.join("lib")).unwrap();
        let mut fs_watcher = watcher();
        fs_watcher.add(root).unwrap();
        assert_eq!(fs_watcher.watched().len(), 4);

        fs::remove_dir_all(root.join("app")).unwrap();
        assert!(fs_watcher.handle(&FsEvent::new(root.join("app"), FsOp::Remove)));

        assert!(!fs_watcher.is_watched(&root.join("app")));
        assert!(!fs_watcher.is_watched(&root.join("app/models")));
        assert!(fs_watcher.is_watched(&root.join("lib")));
        assert!(fs_watcher.is_watched(root));
    }

    #[test]
    fn test_handle_removed_file_leaves_watch_set_alone() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("app/models")).unwrap();
        let mut fs_watcher = watcher();
        fs_watcher.add(root).unwrap();
        let before = fs_watcher.watched().clone();

        assert!(fs_watcher.handle(&FsEvent::new(root.join("app/user.rb"), FsOp::Remove)));
        assert!(fs_watcher.handle(&FsEvent::new(root.join("app/models/x.rb"), FsOp::Rename)));

        assert_eq!(fs_watcher.watched(), &before);
    }

    #[test]
    fn test_remove_is_exact() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("app/models")).unwrap();
        let mut fs_watcher = watcher();
        fs_watcher.add(root).unwrap();

        fs_watcher.remove(&root.join("app")).unwrap();

        assert!(!fs_watcher.is_watched(&root.join("app")));
        assert!(fs_watcher.is_watched(&root.join("app/models")));
    }

    #[test]
    fn test_close_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let mut fs_watcher = watcher();
        fs_watcher.add(temp_dir.path()).unwrap();

        fs_watcher.close();
        fs_watcher.close();

        assert!(fs_watcher.watched().is_empty());
        assert!(matches!(
            fs_watcher.add(temp_dir.path()),
            Err(WatchError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_next_event_reports_file_creation() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        let mut fs_watcher = watcher();
        fs_watcher.add(&root).unwrap();

        fs::write(root.join("test_file"), "hello").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), fs_watcher.next_event())
            .await
            .expect("no event within timeout")
            .expect("stream closed")
            .expect("backend error");
        assert!(event.path.starts_with(&root));
    }

    #[tokio::test]
    async fn test_next_event_ends_after_close() {
        let mut fs_watcher = watcher();
        fs_watcher.close();

        let next = tokio::time::timeout(Duration::from_secs(5), fs_watcher.next_event())
            .await
            .expect("closed stream should end");
        assert!(next.is_none());
    }
}
