//! Event types flowing through the watcher.
//!
//! Raw [`FsEvent`]s come from the OS layer, one per path. [`ReindexEvent`]s
//! are the coalesced output handed to a project once per debounce period.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use notify::event::{AccessKind, AccessMode, EventKind, ModifyKind, RenameMode};

/// Operation kind of a raw filesystem event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsOp {
    Create,
    Write,
    Remove,
    Rename,
    Chmod,
    /// Anything the backend reports that does not fit the kinds above.
    Other,
}

/// A raw filesystem event on a single path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub path: PathBuf,
    pub op: FsOp,
}

impl FsEvent {
    pub fn new(path: impl Into<PathBuf>, op: FsOp) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }

    /// Base file name as UTF-8, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    /// Expand a backend event into one raw event per path.
    ///
    /// Reads (`Access` other than close-after-write) are dropped. A rename
    /// carrying both ends becomes `Rename(old)` followed by `Create(new)`.
    pub fn from_notify(event: notify::Event) -> Vec<FsEvent> {
        let notify::Event { kind, paths, .. } = event;

        match kind {
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                let mut paths = paths.into_iter();
                let mut events = Vec::with_capacity(2);
                if let Some(from) = paths.next() {
                    events.push(FsEvent::new(from, FsOp::Rename));
                }
                events.extend(paths.map(|to| FsEvent::new(to, FsOp::Create)));
                events
            }
            kind => match op_for_kind(kind) {
                Some(op) => paths.into_iter().map(|p| FsEvent::new(p, op)).collect(),
                None => Vec::new(),
            },
        }
    }
}

fn op_for_kind(kind: EventKind) -> Option<FsOp> {
    match kind {
        EventKind::Create(_) => Some(FsOp::Create),
        EventKind::Remove(_) => Some(FsOp::Remove),
        EventKind::Modify(ModifyKind::Metadata(_)) => Some(FsOp::Chmod),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(FsOp::Create),
        EventKind::Modify(ModifyKind::Name(_)) => Some(FsOp::Rename),
        EventKind::Modify(_) => Some(FsOp::Write),
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => Some(FsOp::Write),
        EventKind::Access(_) => None,
        EventKind::Any | EventKind::Other => Some(FsOp::Other),
    }
}

/// Coalesced "must reindex" signal emitted by a debounced watcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReindexEvent {
    /// Paths of the qualifying raw events since the last emission.
    pub names: BTreeSet<PathBuf>,
    /// Set when the configured special file took part.
    pub is_special: bool,
}

impl ReindexEvent {
    /// Event used for unconditional passes (cold start).
    pub fn initial() -> Self {
        Self::default()
    }

    pub fn special() -> Self {
        Self {
            names: BTreeSet::new(),
            is_special: true,
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.names.contains(path)
    }

    /// Fold another event into this one (union of names and special flags).
    pub fn merge(&mut self, other: ReindexEvent) {
        self.names.extend(other.names);
        self.is_special |= other.is_special;
    }
}
