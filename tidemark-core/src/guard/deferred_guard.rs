//! Deferred guard implementation for testing.
//!
//! Defers all node destruction until the guard (and with it the owning
//! collection) is dropped. Destruction timing is fully deterministic, which
//! makes this the guard of choice for unit tests.

use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Mutex;

use super::Guard;

/// A guard that frees every deferred node when it is dropped.
///
/// Not suitable for long-running production use: memory accumulates until
/// the owning collection goes away. Within tests the trade-off is ideal,
/// because any cursor into the collection stays valid for the collection's
/// whole lifetime.
pub struct DeferredGuard {
    deferred: Mutex<Vec<DeferredNode>>,
    #[cfg(debug_assertions)]
    seen: Mutex<HashSet<usize>>,
}

struct DeferredNode {
    ptr: *mut (),
    dealloc: unsafe fn(*mut ()),
}

// Safety: only the pointer and its deallocation function are stored, and
// access is synchronized through the Mutex.
unsafe impl Send for DeferredNode {}

impl DeferredGuard {
    pub fn new() -> Self {
        DeferredGuard {
            deferred: Mutex::new(Vec::new()),
            #[cfg(debug_assertions)]
            seen: Mutex::new(HashSet::new()),
        }
    }
}

impl Default for DeferredGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DeferredGuard {
    fn drop(&mut self) {
        let nodes = self.deferred.get_mut().unwrap();

        let mut seen: HashSet<usize> = HashSet::new();
        for node in nodes.iter() {
            assert!(
                seen.insert(node.ptr as usize),
                "node {:#x} deferred twice",
                node.ptr as usize
            );
        }

        for node in nodes.drain(..) {
            unsafe {
                (node.dealloc)(node.ptr);
            }
        }
    }
}

/// A plain reference wrapper for `DeferredGuard`.
///
/// Since destruction is deferred until the collection drops, references
/// are valid whenever the collection is.
pub struct DeferredRef<'a, T> {
    data: &'a T,
}

impl<T> Deref for DeferredRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.data
    }
}

impl Guard for DeferredGuard {
    type GuardedRef<'a, T: 'a> = DeferredRef<'a, T>;

    /// No per-read state: protection comes from the stored guard.
    type ReadGuard = ();

    fn pin() -> Self::ReadGuard {}

    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N)) {
        #[cfg(debug_assertions)]
        {
            let mut seen = self.seen.lock().unwrap();
            assert!(
                seen.insert(node as usize),
                "node {:#x} deferred twice",
                node as usize
            );
        }

        let node = DeferredNode {
            ptr: node as *mut (),
            dealloc: unsafe {
                std::mem::transmute::<unsafe fn(*mut N), unsafe fn(*mut ())>(dealloc)
            },
        };
        self.deferred.lock().unwrap().push(node);
    }

    unsafe fn guarded_ref<'a, T: 'a>(_guard: (), reference: &'a T) -> Self::GuardedRef<'a, T> {
        DeferredRef { data: reference }
    }
}
