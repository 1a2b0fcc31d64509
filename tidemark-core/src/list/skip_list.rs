use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::guard::{DeferredGuard, Guard};

use super::cursor::{Cursor, Iter};
use super::marked_ptr::MarkedPtr;
use super::node::SkipNode;

/// Default level cap. Tests instantiate smaller towers (8, 16); anything
/// up to 64 is accepted.
pub const DEFAULT_MAX_LEVEL: usize = 32;

type SkipNodePtr<T> = *mut SkipNode<T>;

// =============================================================================
// Structure (sorted ascending, multiple levels):
//
// Level 3:  HEAD ─────────────────────────────► 30 ──────────────► NULL
// Level 2:  HEAD ──────► 10 ──────────────────► 30 ──────────────► NULL
// Level 1:  HEAD ──────► 10 ──────► 20 ───────► 30 ──────────────► NULL
// Level 0:  HEAD ──────► 10 ──────► 20 ───────► 30 ──────► 40 ───► NULL
//
// The mark bit on node.next[level] means the outgoing link at that level is
// logically removed. A node is logically erased exactly when its level-0
// link is marked; the CAS that sets that mark is the linearization point of
// erase, and only the thread whose CAS set it owns the deletion.
//
// INVARIANTS:
// 1. Every level chain is sorted strictly ascending
// 2. A node of height h appears on levels 0..h and on no level >= h
// 3. Equal values are never simultaneously present unmarked at any level
// 4. HEAD is never marked or removed
// 5. A node is handed to the reclamation guard only after it has been
//    spliced out of every level chain (in-flight helpers are covered by
//    their pinned read guards)
//
// Erase works per level, top down: mark the slot, then splice the node out
// of that level before moving down. Level 0 comes last. Keeping each upper
// level fully spliced before the level-0 mark is what lets a concurrent
// insert of an equal value (legal once level 0 is marked) link its own
// tower without ever meeting a stale entry of ours.
//
// Publication is the reverse: CAS into level 0 first (the insert's
// linearization point), then link upper levels bottom-up. After
// publication the node's own slots are only changed by CAS, so an eraser's
// mark on a half-linked tower is never overwritten; the inserter observes
// the mark, backs out of the level it just linked, and stops.
//
// When a traversal finds a marked successor it helps by CASing the
// predecessor past it and retries the step. When a predecessor itself
// turns out to be marked, the search recovers from the predecessor
// recorded one level up instead of restarting from HEAD.
// =============================================================================

struct SearchResult<T> {
    pred: SkipNodePtr<T>,
    curr: SkipNodePtr<T>,
}

/// A lock-free skip list ordered by `T`'s `Ord`.
///
/// `G` selects the memory reclamation strategy (see [`Guard`]); `MAX_LEVEL`
/// caps tower height at compile time.
///
/// Equal values are de-duplicated: a successful `insert` of a value already
/// present is a no-op returning `false`. Cursors obtained from [`begin`],
/// [`find`] or [`Self::end`] stay safe to dereference and advance while
/// other threads insert and erase around them.
///
/// [`begin`]: Self::begin
/// [`find`]: Self::find
pub struct SkipList<T, G: Guard = DeferredGuard, const MAX_LEVEL: usize = DEFAULT_MAX_LEVEL> {
    head: SkipNodePtr<T>,
    /// Highest number of levels any published node has ever had. Raised by
    /// CAS on insert, never lowered.
    top_level: AtomicUsize,
    guard: G,
}

impl<T: Ord, G: Guard, const MAX_LEVEL: usize> SkipList<T, G, MAX_LEVEL> {
    /// Create a new empty skip list.
    pub fn new() -> Self {
        const {
            assert!(MAX_LEVEL >= 1 && MAX_LEVEL <= 64, "MAX_LEVEL must be in 1..=64");
        }

        SkipList {
            head: SkipNode::alloc_sentinel(MAX_LEVEL),
            top_level: AtomicUsize::new(1),
            guard: G::default(),
        }
    }

    /// Generate a random tower height.
    ///
    /// One thread-local random word, counting trailing one bits: each
    /// extra level has probability 1/2, truncated at `MAX_LEVEL`.
    #[inline]
    fn random_height() -> usize {
        let bits = fastrand::u64(..);
        let extra = (!bits).trailing_zeros() as usize;
        (1 + extra).min(MAX_LEVEL)
    }

    #[inline]
    fn raise_top_level(&self, height: usize) {
        let mut current = self.top_level.load(Ordering::Relaxed);
        while height > current {
            match self.top_level.compare_exchange_weak(
                current,
                height,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// Recovery when a predecessor turns out to be marked: walk up the
    /// predecessors recorded at higher levels and take the first one that
    /// is still live and tall enough. Falls back to HEAD.
    #[inline]
    fn recover_pred(&self, level: usize, preds: &[SkipNodePtr<T>]) -> SkipNodePtr<T> {
        for &pred in preds.iter().skip(level + 1) {
            if pred.is_null() {
                continue;
            }
            if pred == self.head {
                return self.head;
            }
            unsafe {
                if !MarkedPtr::new((*pred).get_next(0)).is_marked() && (*pred).height() > level {
                    return pred;
                }
            }
        }
        self.head
    }

    /// Find a key's position at one level.
    ///
    /// Returns (pred, curr) with `pred.value < key` and `curr.value >= key`
    /// (curr null at the end of the level chain). Marked successors are
    /// spliced out along the way.
    fn find_at_level(
        &self,
        key: &T,
        level: usize,
        start: SkipNodePtr<T>,
        preds: &[SkipNodePtr<T>],
    ) -> SearchResult<T> {
        let mut pred = MarkedPtr::unmask(start);

        unsafe {
            if MarkedPtr::new((*pred).get_next(level)).is_marked() {
                pred = self.recover_pred(level, preds);
            }

            let mut curr = MarkedPtr::new((*pred).get_next(level)).as_ptr();

            loop {
                if curr.is_null() {
                    return SearchResult { pred, curr };
                }

                let next = (*curr).get_next(level);
                let next_marked = MarkedPtr::new(next);

                if next_marked.is_marked() {
                    // curr is going away at this level; help splice it out
                    match (*pred).cas_next(level, curr, next_marked.as_ptr()) {
                        Ok(_) => {
                            curr = next_marked.as_ptr();
                        }
                        Err(_) => {
                            // pred changed under us (possibly marked itself)
                            pred = self.recover_pred(level, preds);
                            curr = MarkedPtr::new((*pred).get_next(level)).as_ptr();
                        }
                    }
                    continue;
                }

                if (*curr).value() < key {
                    pred = curr;
                    curr = next_marked.as_ptr();
                } else {
                    return SearchResult { pred, curr };
                }
            }
        }
    }

    /// Top-down search recording the predecessor and successor at every
    /// level currently in use. Levels above `top_level` keep HEAD as the
    /// predecessor and null as the successor.
    fn find_position(&self, key: &T) -> ([SkipNodePtr<T>; MAX_LEVEL], [SkipNodePtr<T>; MAX_LEVEL]) {
        let mut preds: [SkipNodePtr<T>; MAX_LEVEL] = [self.head; MAX_LEVEL];
        let mut succs: [SkipNodePtr<T>; MAX_LEVEL] = [ptr::null_mut(); MAX_LEVEL];

        let top = self.top_level.load(Ordering::Relaxed).clamp(1, MAX_LEVEL);
        let mut last_pred = self.head;

        for level in (0..top).rev() {
            let result = self.find_at_level(key, level, last_pred, &preds);
            last_pred = result.pred;
            preds[level] = result.pred;
            succs[level] = result.curr;
        }

        (preds, succs)
    }

    /// Insert a value.
    ///
    /// Returns `true` if the value was inserted, `false` if an equal value
    /// was already present. Lost publication races are retried internally.
    pub fn insert(&self, value: T) -> bool {
        let _pin = G::pin();
        self.insert_internal(value).is_some()
    }

    fn insert_internal(&self, mut value: T) -> Option<SkipNodePtr<T>> {
        let height = Self::random_height();

        loop {
            let (mut preds, succs) = self.find_position(&value);

            // Duplicate check: the successor was observed live (unmarked)
            // at level 0, so an equal value is already present.
            if !succs[0].is_null() {
                unsafe {
                    if (*succs[0]).value() == &value {
                        return None;
                    }
                }
            }

            let node = SkipNode::alloc_with_value(value, height);

            unsafe {
                for (level, &succ) in succs.iter().enumerate().take(height) {
                    (*node).set_next(level, succ);
                }

                // Publication CAS: the moment this succeeds the value is
                // present in the list.
                if (*preds[0]).cas_next(0, succs[0], node).is_err() {
                    // Never published; take the value back and retry.
                    value = (*node).take_value_unlinked();
                    SkipNode::dealloc_node(node);
                    continue;
                }

                let node_key: &T = (*node).value();
                for level in 1..height {
                    let mut pred = preds[level];
                    if !self.link_level(level, &mut pred, node, node_key, &preds) {
                        break;
                    }
                    preds[level] = pred;
                }

                self.raise_top_level(height);
                return Some(node);
            }
        }
    }

    /// Link an already-published node into one upper level.
    ///
    /// Returns `false` when the node was marked for deletion mid-publish;
    /// the eraser owns the remaining levels from then on.
    unsafe fn link_level(
        &self,
        level: usize,
        pred: &mut SkipNodePtr<T>,
        node: SkipNodePtr<T>,
        node_key: &T,
        preds: &[SkipNodePtr<T>],
    ) -> bool {
        unsafe {
            loop {
                // An eraser got to the node first: stop publishing.
                if MarkedPtr::new((*node).get_next(0)).is_marked() {
                    return false;
                }
                let node_next = (*node).get_next(level);
                if MarkedPtr::new(node_next).is_marked() {
                    return false;
                }

                // A predecessor that is itself logically erased is useless.
                if *pred != self.head && MarkedPtr::new((**pred).get_next(0)).is_marked() {
                    *pred = self.recover_pred(level, preds);
                    continue;
                }

                let pred_next = (**pred).get_next(level);
                let pred_next_marked = MarkedPtr::new(pred_next);
                let succ = pred_next_marked.as_ptr();

                if pred_next_marked.is_marked() {
                    *pred = self.recover_pred(level, preds);
                    continue;
                }

                // Advance past concurrently inserted smaller keys.
                if !succ.is_null()
                    && succ != node
                    && (*succ).height() > level
                    && (*succ).value() < node_key
                {
                    if MarkedPtr::new((*succ).get_next(0)).is_marked() {
                        // About to be unlinked; re-read rather than adopt it.
                        continue;
                    }
                    *pred = succ;
                    continue;
                }

                if succ == node {
                    return true;
                }

                // Point the node at its successor first. CAS, not a plain
                // store: a deletion mark set since the last read must win.
                if node_next != succ && (*node).cas_next(level, node_next, succ).is_err() {
                    continue;
                }

                match (**pred).cas_next(level, succ, node) {
                    Ok(_) => {
                        // The eraser may have marked this level between our
                        // two CASes and found nothing to splice. Take the
                        // link back out ourselves in that case.
                        if MarkedPtr::new((*node).get_next(level)).is_marked() {
                            let mut p = *pred;
                            self.unlink_level(level, &mut p, node, node_key, preds);
                            return false;
                        }
                        return true;
                    }
                    Err(_) => continue,
                }
            }
        }
    }

    /// Set the deletion mark on one level of a node's tower.
    ///
    /// Returns `true` if this call set the mark, `false` if it was already
    /// set.
    unsafe fn mark_level(node: SkipNodePtr<T>, level: usize) -> bool {
        unsafe {
            loop {
                let next = (*node).get_next(level);
                let next_marked = MarkedPtr::new(next);
                if next_marked.is_marked() {
                    return false;
                }
                if (*node)
                    .cas_next_weak(level, next, next_marked.with_mark().as_raw())
                    .is_ok()
                {
                    return true;
                }
            }
        }
    }

    /// Splice a marked node out of one level chain, retrying until the node
    /// is verifiably absent from that level.
    unsafe fn unlink_level(
        &self,
        level: usize,
        pred: &mut SkipNodePtr<T>,
        node: SkipNodePtr<T>,
        node_key: &T,
        preds: &[SkipNodePtr<T>],
    ) {
        unsafe {
            loop {
                let pred_next = (**pred).get_next(level);
                let pred_next_marked = MarkedPtr::new(pred_next);
                let succ = pred_next_marked.as_ptr();

                if succ != node {
                    // Either already spliced out, or an insert landed
                    // between pred and node.
                    if succ.is_null() || (*succ).value() >= node_key {
                        return;
                    }
                    *pred = succ;
                    continue;
                }

                if pred_next_marked.is_marked() {
                    *pred = self.recover_pred(level, preds);
                    continue;
                }

                let replacement = MarkedPtr::unmask((*node).get_next(level));

                match (**pred).cas_next(level, node, replacement) {
                    Ok(_) => return,
                    Err(actual) => {
                        let actual_ptr = MarkedPtr::unmask(actual);
                        if actual_ptr == node {
                            // pred got marked under us
                            *pred = self.recover_pred(level, preds);
                            continue;
                        }
                        if actual_ptr == replacement
                            || actual_ptr.is_null()
                            || (*actual_ptr).value() >= node_key
                        {
                            return;
                        }
                        *pred = actual_ptr;
                    }
                }
            }
        }
    }

    /// Logically erase a node and splice it out of every level.
    ///
    /// Returns `true` only for the caller whose CAS set the level-0 mark.
    ///
    /// # Safety
    /// `node` must be protected by a read guard held across the call.
    pub(crate) unsafe fn erase_node(&self, node: SkipNodePtr<T>) -> bool {
        unsafe {
            let height = (*node).height();
            let node_key: &T = (*node).value();
            let (preds, _succs) = self.find_position(node_key);

            // Upper levels first: mark, then splice out immediately, so
            // that by the time level 0 is marked no upper chain still
            // carries the node.
            for level in (1..height).rev() {
                Self::mark_level(node, level);
                let mut pred = preds[level];
                self.unlink_level(level, &mut pred, node, node_key, &preds);
            }

            // The level-0 mark decides ownership: exactly one erase call
            // observes its own successful CAS here.
            if !Self::mark_level(node, 0) {
                return false;
            }
            (*node).set_deleted();

            let mut pred = preds[0];
            self.unlink_level(0, &mut pred, node, node_key, &preds);

            // The node is out of every chain; anyone still holding it got
            // there under a guard pinned before this point.
            self.guard.defer_destroy(node, SkipNode::dealloc_node);
            true
        }
    }

    /// Erase the element the cursor points at.
    ///
    /// Returns `true` if this call performed the logical deletion, `false`
    /// if the element was already erased by another thread or the cursor
    /// is at the end.
    pub fn erase(&self, cursor: &Cursor<'_, T, G, MAX_LEVEL>) -> bool {
        debug_assert!(
            ptr::eq(self, cursor.list()),
            "cursor does not belong to this list"
        );
        let node = cursor.node();
        if node.is_null() {
            return false;
        }
        let _pin = G::pin();
        unsafe { self.erase_node(node) }
    }

    /// Locate the node holding `key`, or null.
    pub(crate) fn find_node(&self, key: &T) -> SkipNodePtr<T> {
        let (_preds, succs) = self.find_position(key);
        let curr = succs[0];
        if curr.is_null() {
            return ptr::null_mut();
        }
        unsafe {
            if (*curr).value() == key {
                curr
            } else {
                ptr::null_mut()
            }
        }
    }

    /// First live node at level 0, splicing erased head successors out
    /// along the way. Null when the list is empty.
    pub(crate) fn first_live(&self) -> SkipNodePtr<T> {
        unsafe {
            let pred = self.head;
            let mut curr = MarkedPtr::new((*pred).get_next(0)).as_ptr();

            while !curr.is_null() {
                let next = (*curr).get_next(0);
                let next_marked = MarkedPtr::new(next);
                if !next_marked.is_marked() {
                    return curr;
                }
                // Opportunistic help; a failure just means someone else
                // moved the chain first.
                let _ = (*pred).cas_next(0, curr, next_marked.as_ptr());
                curr = next_marked.as_ptr();
            }

            curr
        }
    }

    /// Next live node after `node` along level 0. `node` itself may
    /// already be erased; its frozen forward pointer still leads back into
    /// the list.
    pub(crate) fn next_live(&self, node: SkipNodePtr<T>) -> SkipNodePtr<T> {
        unsafe {
            let mut curr = MarkedPtr::new((*node).get_next(0)).as_ptr();

            while !curr.is_null() {
                let next = (*curr).get_next(0);
                let next_marked = MarkedPtr::new(next);
                if !next_marked.is_marked() {
                    return curr;
                }
                curr = next_marked.as_ptr();
            }

            curr
        }
    }

    /// Cursor at the first element (== `end()` when empty).
    pub fn begin(&self) -> Cursor<'_, T, G, MAX_LEVEL> {
        let pin = G::pin();
        let node = self.first_live();
        Cursor::new(pin, self, node)
    }

    /// The past-the-end cursor.
    pub fn end(&self) -> Cursor<'_, T, G, MAX_LEVEL> {
        Cursor::new(G::pin(), self, ptr::null_mut())
    }

    /// Cursor at the element equal to `key`, or `end()`.
    pub fn find(&self, key: &T) -> Cursor<'_, T, G, MAX_LEVEL> {
        let pin = G::pin();
        let node = self.find_node(key);
        Cursor::new(pin, self, node)
    }

    /// Whether an element equal to `key` is present.
    pub fn contains(&self, key: &T) -> bool {
        let _pin = G::pin();
        !self.find_node(key).is_null()
    }

    /// Guarded reference to the element equal to `key`.
    pub fn get(&self, key: &T) -> Option<G::GuardedRef<'_, T>> {
        let pin = G::pin();
        let node = self.find_node(key);
        if node.is_null() {
            return None;
        }
        unsafe { Some(G::guarded_ref(pin, (*node).value())) }
    }

    /// Iterator over clones of the live elements in ascending order.
    pub fn iter(&self) -> Iter<'_, T, G, MAX_LEVEL> {
        Iter::new(self)
    }

    /// Number of live elements. O(n): counts are the caller's business,
    /// this walks the chain.
    pub fn len(&self) -> usize {
        let _pin = G::pin();
        let mut count = 0;
        let mut curr = self.first_live();
        while !curr.is_null() {
            count += 1;
            curr = self.next_live(curr);
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        let _pin = G::pin();
        self.first_live().is_null()
    }

    /// Collect the live elements into a Vec, in order.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        let _pin = G::pin();
        let mut result = Vec::new();
        let mut curr = self.first_live();
        while !curr.is_null() {
            unsafe {
                result.push((*curr).value().clone());
            }
            curr = self.next_live(curr);
        }
        result
    }
}

impl<T: Ord, G: Guard, const MAX_LEVEL: usize> Default for SkipList<T, G, MAX_LEVEL> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, G: Guard, const MAX_LEVEL: usize> Drop for SkipList<T, G, MAX_LEVEL> {
    fn drop(&mut self) {
        unsafe {
            let mut curr = MarkedPtr::unmask((*self.head).get_next(0));

            while !curr.is_null() {
                let next = (*curr).get_next(0);
                let next_marked = MarkedPtr::new(next);

                // Every erase splices before it defers, so the chain holds
                // only live nodes by the time exclusive access is possible.
                debug_assert!(
                    !next_marked.is_marked() && !(*curr).is_deleted(),
                    "erased node still reachable at drop time"
                );

                let next_clean = next_marked.as_ptr();
                SkipNode::dealloc_node(curr);
                curr = next_clean;
            }

            SkipNode::dealloc_node(self.head);
        }
    }
}

// Safety: all shared mutation goes through atomic slot operations, and
// node lifetimes are governed by the guard.
unsafe impl<T: Send, G: Guard, const MAX_LEVEL: usize> Send for SkipList<T, G, MAX_LEVEL> {}
unsafe impl<T: Send + Sync, G: Guard, const MAX_LEVEL: usize> Sync for SkipList<T, G, MAX_LEVEL> {}
