//! Open-handle accounting for connections and cursors.
//!
//! Counters are per tracker instance and shared by clones; there is no
//! process-wide registry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Snapshot of currently open handles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandleCounts {
    pub connections: usize,
    pub cursors: usize,
}

#[derive(Debug, Default)]
struct Counters {
    connections: AtomicUsize,
    cursors: AtomicUsize,
}

#[derive(Debug, Clone, Copy)]
enum HandleKind {
    Connection,
    Cursor,
}

/// Shared counters of open connections and cursors.
#[derive(Debug, Clone, Default)]
pub struct ResourceTracker {
    counters: Arc<Counters>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> HandleCounts {
        HandleCounts {
            connections: self.counters.connections.load(Ordering::SeqCst),
            cursors: self.counters.cursors.load(Ordering::SeqCst),
        }
    }

    pub(crate) fn acquire_connection(&self) -> HandleGuard {
        self.acquire(HandleKind::Connection)
    }

    pub(crate) fn acquire_cursor(&self) -> HandleGuard {
        self.acquire(HandleKind::Cursor)
    }

    fn acquire(&self, kind: HandleKind) -> HandleGuard {
        self.counter(kind).fetch_add(1, Ordering::SeqCst);
        HandleGuard {
            tracker: self.clone(),
            kind,
        }
    }

    fn counter(&self, kind: HandleKind) -> &AtomicUsize {
        match kind {
            HandleKind::Connection => &self.counters.connections,
            HandleKind::Cursor => &self.counters.cursors,
        }
    }
}

/// Keeps one handle counted until dropped.
#[derive(Debug)]
pub struct HandleGuard {
    tracker: ResourceTracker,
    kind: HandleKind,
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.tracker.counter(self.kind).fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::{HandleCounts, ResourceTracker};

    #[test]
    fn guards_return_counts_to_baseline() {
        let tracker = ResourceTracker::new();
        let conn = tracker.acquire_connection();
        let cursor = tracker.acquire_cursor();
        assert_eq!(
            tracker.counts(),
            HandleCounts {
                connections: 1,
                cursors: 1
            }
        );

        drop(cursor);
        drop(conn);
        assert_eq!(tracker.counts(), HandleCounts::default());
    }

    #[test]
    fn clones_share_counters() {
        let tracker = ResourceTracker::new();
        let clone = tracker.clone();
        let _guard = clone.acquire_connection();
        assert_eq!(tracker.counts().connections, 1);
    }
}
