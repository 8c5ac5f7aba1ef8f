//! Registry of watched projects keyed by canonical path.
//!
//! Every project runs in its own task under a child of the manager's root
//! token. Removing a project cancels its token and returns without waiting
//! for the task to finish.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::indexer::Indexable;
use crate::project::Project;
use crate::utils;
use crate::watcher::WatchError;

/// Result of [`Manager::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyRegistered,
    /// The path does not exist on disk.
    Missing,
}

struct Entry {
    /// Generation of this registration.
    id: u64,
    token: CancellationToken,
}

type Registry = Arc<Mutex<HashMap<PathBuf, Entry>>>;

pub struct Manager {
    indexer: Arc<dyn Indexable>,
    token: CancellationToken,
    projects: Registry,
    tracker: TaskTracker,
    next_id: AtomicU64,
}

impl Manager {
    pub fn new(indexer: Arc<dyn Indexable>, token: CancellationToken) -> Self {
        Self {
            indexer,
            token,
            projects: Arc::new(Mutex::new(HashMap::new())),
            tracker: TaskTracker::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Start watching `path`.
    ///
    /// Missing and already registered paths are no-ops. The only error is a
    /// failure to construct the watch primitive. Must be called from within
    /// a tokio runtime.
    pub fn add(&self, path: impl AsRef<Path>) -> Result<AddOutcome, WatchError> {
        let path = utils::canonicalize(path);

        if !utils::file_exists(&path) {
            crate::debug_event!("manager", "skipped missing", "{}", path.display());
            return Ok(AddOutcome::Missing);
        }

        let mut projects = self.projects.lock();
        if projects.contains_key(&path) {
            crate::debug_event!("manager", "already registered", "{}", path.display());
            return Ok(AddOutcome::AlreadyRegistered);
        }

        let watcher = self.indexer.create_watcher(&path)?;
        let project = Project::new(path.clone(), Arc::clone(&self.indexer), watcher);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = self.token.child_token();
        projects.insert(
            path.clone(),
            Entry {
                id,
                token: token.clone(),
            },
        );
        drop(projects);

        let registry = Arc::clone(&self.projects);
        let key = path.clone();
        self.tracker.spawn(async move {
            if let Err(e) = project.monitor(token).await {
                tracing::error!("[manager] {}: {e}", key.display());
            }
            deregister(&registry, &key, id);
        });

        crate::log_event!("manager", "added", "{}", path.display());
        Ok(AddOutcome::Added)
    }

    /// Stop watching `path`. Returns false if it was not registered.
    pub fn remove(&self, path: impl AsRef<Path>) -> bool {
        let path = utils::canonicalize(path);

        let Some(entry) = self.projects.lock().remove(&path) else {
            crate::debug_event!("manager", "not registered", "{}", path.display());
            return false;
        };
        entry.token.cancel();

        crate::log_event!("manager", "removed", "{}", path.display());
        true
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.projects
            .lock()
            .contains_key(&utils::canonicalize(path))
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.projects.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.projects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.lock().is_empty()
    }

    /// Number of project tasks still running.
    pub fn active(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until no project task is live.
    pub async fn start(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        crate::debug_event!("manager", "all projects stopped");
    }

    /// Cancel every project and wait for all of them to stop.
    pub async fn shutdown(&self) {
        self.token.cancel();
        self.start().await;
    }
}

/// Drop the registry entry of a finished task unless it was replaced.
fn deregister(registry: &Registry, path: &Path, id: u64) {
    let mut projects = registry.lock();
    if projects.get(path).is_some_and(|entry| entry.id == id) {
        projects.remove(path);
        crate::debug_event!("manager", "deregistered", "{}", path.display());
    }
}
