//! Relaxed diagnostic counters.
//!
//! Every list carries a handful of counters useful when diagnosing
//! contention or reclamation behavior. They are relaxed hints: tests and the
//! driver read them, nothing in the operation or reclamation logic does.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct Counters {
    validation_retries: AtomicU64,
    reclaim_passes: AtomicU64,
    nodes_freed: AtomicU64,
}

/// Point-in-time copy of a list's diagnostic counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Traversals restarted after a failed post-lock validation.
    pub validation_retries: u64,
    /// Reclaim scans executed (triggered or explicit).
    pub reclaim_passes: u64,
    /// Retired nodes actually freed by those scans.
    pub nodes_freed: u64,
}

impl Counters {
    #[inline]
    pub(crate) fn record_retry(&self) {
        self.validation_retries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_reclaim(&self, freed: usize) {
        self.reclaim_passes.fetch_add(1, Ordering::Relaxed);
        self.nodes_freed.fetch_add(freed as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            validation_retries: self.validation_retries.load(Ordering::Relaxed),
            reclaim_passes: self.reclaim_passes.load(Ordering::Relaxed),
            nodes_freed: self.nodes_freed.load(Ordering::Relaxed),
        }
    }
}
