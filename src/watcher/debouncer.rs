//! Coalescing of qualifying events between ticks.
//!
//! Many qualifying events inside one period collapse into a single
//! [`ReindexEvent`]; the watcher flushes on a fixed ticker so re-indexing
//! happens at most once per period however large the burst.

use std::path::PathBuf;

use super::event::ReindexEvent;

/// Debounce state.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum DebounceState {
    /// Nothing to emit.
    #[default]
    Idle,
    /// At least one qualifying event since the last emission.
    Pending(ReindexEvent),
}

/// Accumulates qualifying events until the next tick takes them.
#[derive(Debug, Default)]
pub struct Debouncer {
    state: DebounceState,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a qualifying event. `special` marks the pending emission.
    pub fn record(&mut self, path: PathBuf, special: bool) {
        match &mut self.state {
            DebounceState::Pending(event) => {
                event.names.insert(path);
                event.is_special |= special;
            }
            DebounceState::Idle => {
                let mut event = ReindexEvent {
                    is_special: special,
                    ..ReindexEvent::default()
                };
                event.names.insert(path);
                self.state = DebounceState::Pending(event);
            }
        }
    }

    /// Take the pending emission, returning to `Idle`.
    pub fn take_ready(&mut self) -> Option<ReindexEvent> {
        match std::mem::take(&mut self.state) {
            DebounceState::Pending(event) => Some(event),
            DebounceState::Idle => None,
        }
    }

    /// Put back an emission the consumer could not accept yet.
    pub fn restore(&mut self, event: ReindexEvent) {
        match &mut self.state {
            DebounceState::Pending(pending) => pending.merge(event),
            DebounceState::Idle => self.state = DebounceState::Pending(event),
        }
    }

    pub fn has_pending(&self) -> bool {
        matches!(self.state, DebounceState::Pending(_))
    }

    /// Number of distinct paths in the pending emission.
    pub fn pending_count(&self) -> usize {
        match &self.state {
            DebounceState::Pending(event) => event.names.len(),
            DebounceState::Idle => 0,
        }
    }

    pub fn state(&self) -> &DebounceState {
        &self.state
    }
}
