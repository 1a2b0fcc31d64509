//! Counters.

use std::sync::atomic::{AtomicI64, Ordering};

use crossbeam_utils::CachePadded;

use crate::snapshot::Snapshot;

/// A monotonic-or-not integer counter.
///
/// Relaxed ordering throughout: counters need eventual consistency, not
/// cross-field ordering, and the padding keeps unrelated hot data off the
/// counter's cache line.
#[derive(Debug, Default)]
pub struct Counter {
    value: CachePadded<AtomicI64>,
}

impl Counter {
    pub fn new(initial: i64) -> Self {
        Counter {
            value: CachePadded::new(AtomicI64::new(initial)),
        }
    }

    /// Increment by one.
    pub fn inc(&self) {
        self.incr(1);
    }

    /// Decrement by one.
    pub fn dec(&self) {
        self.incr(-1);
    }

    /// Add `by` (which may be negative).
    pub fn incr(&self, by: i64) {
        self.value.fetch_add(by, Ordering::Relaxed);
    }

    /// Subtract `by`.
    pub fn decr(&self, by: i64) {
        self.incr(-by);
    }

    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Reset to zero, returning the previous value.
    pub fn reset(&self) -> i64 {
        self.value.swap(0, Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::Counter(self.value())
    }
}
