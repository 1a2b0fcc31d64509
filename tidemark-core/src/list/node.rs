use std::alloc::{alloc, dealloc, Layout};
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

/// A skip list node with tower structure.
///
/// Uses the flexible array member pattern for efficient memory layout:
/// - Single allocation per node (no separate heap allocation for the tower)
/// - Forward pointers are inline after the struct fields
/// - Layout: [value, height, deleted, next[0..h]] where h = height
///
/// `value` and `height` are frozen once the node is published at level 0;
/// only the forward slots and the `deleted` flag change afterwards, and
/// only through atomic operations.
#[repr(C)]
pub struct SkipNode<T> {
    value: Option<T>,
    height: usize,
    deleted: AtomicBool,
    // Flexible array: pointers are allocated inline after this struct.
    // Layout: [next[0], next[1], ..., next[h-1]]
    pointers: [AtomicPtr<SkipNode<T>>; 0],
}

impl<T> SkipNode<T> {
    /// Calculate the layout for a node with the given height.
    fn layout_for(height: usize) -> Layout {
        Layout::new::<Self>()
            .extend(Layout::array::<AtomicPtr<Self>>(height).unwrap())
            .unwrap()
            .0
            .pad_to_align()
    }

    fn alloc_raw(value: Option<T>, height: usize) -> *mut Self {
        unsafe {
            let layout = Self::layout_for(height);
            let node = alloc(layout) as *mut Self;
            if node.is_null() {
                std::alloc::handle_alloc_error(layout);
            }

            ptr::write(&mut (*node).value, value);
            ptr::write(&mut (*node).height, height);
            ptr::write(&mut (*node).deleted, AtomicBool::new(false));

            let pointers_base = (*node).pointers.as_ptr() as *mut AtomicPtr<Self>;
            for i in 0..height {
                ptr::write(pointers_base.add(i), AtomicPtr::new(ptr::null_mut()));
            }

            node
        }
    }

    /// Allocate and initialize a new node carrying a value.
    pub(crate) fn alloc_with_value(value: T, height: usize) -> *mut Self {
        Self::alloc_raw(Some(value), height)
    }

    /// Allocate and initialize the sentinel head node (no value).
    pub(crate) fn alloc_sentinel(height: usize) -> *mut Self {
        Self::alloc_raw(None, height)
    }

    /// Deallocate a node.
    ///
    /// # Safety
    /// The pointer must have been allocated by `alloc_with_value` or
    /// `alloc_sentinel` and must not be reachable from any chain.
    pub(crate) unsafe fn dealloc_node(node: *mut Self) {
        unsafe {
            let layout = Self::layout_for((*node).height);
            ptr::drop_in_place(&mut (*node).value);
            dealloc(node as *mut u8, layout);
        }
    }

    /// Take the value back out of a node that was never published.
    ///
    /// # Safety
    /// - Must only be called on a node no other thread has ever seen
    /// - Must only be called once
    pub(crate) unsafe fn take_value_unlinked(&mut self) -> T {
        self.value.take().expect("cannot take value from sentinel")
    }

    #[inline]
    pub(crate) fn value(&self) -> &T {
        self.value
            .as_ref()
            .expect("cannot read value of sentinel node")
    }

    #[inline]
    pub(crate) fn height(&self) -> usize {
        self.height
    }

    /// Record that the node has been marked at every level.
    #[inline]
    pub(crate) fn set_deleted(&self) {
        self.deleted.store(true, Ordering::Release);
    }

    #[inline]
    pub(crate) fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }

    #[inline]
    unsafe fn slot(&self, level: usize) -> &AtomicPtr<SkipNode<T>> {
        unsafe { &*self.pointers.as_ptr().add(level) }
    }

    /// Load the forward pointer at `level` (Acquire).
    #[inline]
    pub(crate) fn get_next(&self, level: usize) -> *mut SkipNode<T> {
        debug_assert!(level < self.height);
        unsafe { self.slot(level).load(Ordering::Acquire) }
    }

    /// Store the forward pointer at `level` (Release).
    ///
    /// Only legal before the node is published; afterwards all slot
    /// updates go through CAS so a concurrent deletion mark is never lost.
    #[inline]
    pub(crate) fn set_next(&self, level: usize, ptr: *mut SkipNode<T>) {
        debug_assert!(level < self.height);
        unsafe { self.slot(level).store(ptr, Ordering::Release) }
    }

    /// CAS the forward pointer at `level` (Release on success; the failure
    /// load is Acquire because callers follow the pointer they get back).
    #[inline]
    pub(crate) fn cas_next(
        &self,
        level: usize,
        expected: *mut SkipNode<T>,
        new: *mut SkipNode<T>,
    ) -> Result<*mut SkipNode<T>, *mut SkipNode<T>> {
        debug_assert!(level < self.height);
        unsafe {
            self.slot(level)
                .compare_exchange(expected, new, Ordering::Release, Ordering::Acquire)
        }
    }

    /// Weak CAS variant for mark loops that retry anyway.
    #[inline]
    pub(crate) fn cas_next_weak(
        &self,
        level: usize,
        expected: *mut SkipNode<T>,
        new: *mut SkipNode<T>,
    ) -> Result<*mut SkipNode<T>, *mut SkipNode<T>> {
        debug_assert!(level < self.height);
        unsafe {
            self.slot(level)
                .compare_exchange_weak(expected, new, Ordering::Release, Ordering::Acquire)
        }
    }
}
