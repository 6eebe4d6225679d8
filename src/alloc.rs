use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;

use crate::ptr::{DensePtr, LinkKey};

/// Raw allocation seam for the set's bucket array, chain nodes and, through
/// the object policy, the stored objects themselves. Borrowed by the set for
/// its whole lifetime.
///
/// Allocation failure has no recovery path; implementations abort instead of
/// returning null.
pub trait MemoryResource {
    fn allocate(&self, layout: Layout) -> NonNull<u8>;

    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on the same resource with
    /// the same layout.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// [`MemoryResource`] backed by the global allocator.
pub struct GlobalMemoryResource;

impl MemoryResource for GlobalMemoryResource {
    fn allocate(&self, layout: Layout) -> NonNull<u8> {
        match NonNull::new(unsafe { alloc(layout) }) {
            Some(ptr) => ptr,
            None => handle_alloc_error(layout),
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        dealloc(ptr.as_ptr(), layout);
    }
}

/// Fixed-size allocator for [`LinkKey`] chain nodes. Freed nodes are pooled
/// and handed out again before the memory resource is asked for more.
///
/// The live-node count doubles as the set's chain-entry counter: every path
/// that creates or folds a chain link goes through `alloc`/`free`.
pub(crate) struct LinkAllocator<'m> {
    mr: &'m dyn MemoryResource,
    pool: Vec<NonNull<LinkKey>>,
    live: u32,
}

impl<'m> LinkAllocator<'m> {
    pub(crate) fn new(mr: &'m dyn MemoryResource) -> Self {
        Self {
            mr,
            pool: Vec::new(),
            live: 0,
        }
    }

    fn layout() -> Layout {
        Layout::new::<LinkKey>()
    }

    /// Number of link nodes currently reachable from the set.
    pub(crate) fn live(&self) -> u32 {
        self.live
    }

    pub(crate) fn alloc(&mut self, obj: *mut u8, next: DensePtr) -> NonNull<LinkKey> {
        let node = match self.pool.pop() {
            Some(node) => node,
            None => self.mr.allocate(Self::layout()).cast::<LinkKey>(),
        };
        unsafe {
            node.as_ptr().write(LinkKey {
                ptr: DensePtr::from_object(obj),
                next,
            });
        }
        self.live += 1;
        node
    }

    /// # Safety
    ///
    /// `node` must have come from `alloc` on this allocator and must not be
    /// reachable from the set any more.
    pub(crate) unsafe fn free(&mut self, node: NonNull<LinkKey>) {
        debug_assert!(self.live > 0);
        self.live -= 1;
        self.pool.push(node);
    }
}

impl Drop for LinkAllocator<'_> {
    fn drop(&mut self) {
        debug_assert_eq!(self.live, 0);
        for node in self.pool.drain(..) {
            unsafe { self.mr.deallocate(node.cast(), Self::layout()) };
        }
    }
}
