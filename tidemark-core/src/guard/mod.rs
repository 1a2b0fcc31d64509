//! Guard trait for memory reclamation strategies.
//!
//! The `Guard` trait abstracts over how unlinked nodes are kept alive until
//! no cursor or concurrent traversal can still reach them:
//!
//! ```text
//! SkipList<T, G: Guard>
//!     │
//!     ├── SkipList<T, EpochGuard>      (production, crossbeam-epoch)
//!     └── SkipList<T, DeferredGuard>   (testing, frees on collection drop)
//! ```
//!
//! A pinned `ReadGuard` protects every node that is reachable at pin time
//! and every node unlinked while the guard is held. Cursors hold their
//! read guard for their entire lifetime, which is what makes a cursor safe
//! to dereference after the node it points at has been erased.

mod deferred_guard;

use std::ops::Deref;

pub use deferred_guard::{DeferredGuard, DeferredRef};

/// A memory reclamation guard that protects concurrent access to nodes.
///
/// # Safety Contract
///
/// Implementations must ensure:
/// 1. Nodes passed to `defer_destroy` are not freed while any read guard
///    pinned before the call is still alive
/// 2. `GuardedRef` keeps the referenced data valid for its lifetime
///
/// The guard instance stored in a collection is used for deferred
/// destruction scheduling; actual read protection happens per-operation
/// through `pin`.
pub trait Guard: Sized + Default + Send + Sync {
    /// A reference bundled with the read guard that protects it.
    ///
    /// Must implement `Deref<Target = T>` for transparent access.
    type GuardedRef<'a, T: 'a>: Deref<Target = T>;

    /// An active guard that protects reads for its lifetime.
    ///
    /// For epoch-based guards this holds a pinned epoch; for the deferred
    /// guard it is a unit type since the collection's stored guard already
    /// provides protection.
    type ReadGuard: Sized;

    /// Pin an active read guard.
    fn pin() -> Self::ReadGuard;

    /// Schedule a node for deferred destruction.
    ///
    /// # Safety
    ///
    /// - `node` must be a valid pointer previously allocated by the collection
    /// - `node` must be unlinked from the collection (not reachable by a
    ///   traversal that starts after this call)
    /// - `dealloc` must be the matching deallocation function for `node`
    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N));

    /// Bundle an already-pinned read guard with a reference.
    ///
    /// The returned `GuardedRef` owns the guard, so the reference stays
    /// valid for as long as the caller holds the `GuardedRef`.
    ///
    /// # Safety
    ///
    /// - `reference` must point at data that `guard` currently protects
    unsafe fn guarded_ref<'a, T: 'a>(
        guard: Self::ReadGuard,
        reference: &'a T,
    ) -> Self::GuardedRef<'a, T>;
}
