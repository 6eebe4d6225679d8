use std::fmt;
use std::ptr;

const LINK_BIT: usize = 1;
const DISPLACED_BIT: usize = 1 << 1;
const DIRECTION_BIT: usize = 1 << 2;
const TTL_BIT: usize = 1 << 3;
const TAG_MASK: usize = 0xf;

/// A tagged pointer-sized cell. The payload is either empty, a bare object
/// pointer, or a pointer to a [`LinkKey`] chain node. The low four bits carry
/// the entry state:
///
/// - `link`: the payload is a `LinkKey`, not a bare object.
/// - `displaced` + direction: the entry sits one bucket away from its home
///   bucket. The direction bit is set when the entry sits to the right of
///   home. A chain head is never displaced.
/// - `ttl`: the referenced object has an expiration time attached.
///
/// All payload pointers must be at least 16-byte aligned so the tag bits
/// stay free.
#[derive(Clone, Copy)]
pub struct DensePtr {
    bits: usize,
}

/// A chain node holding one object and the rest of the chain. Allocated and
/// pooled by the link allocator.
#[repr(C, align(16))]
pub(crate) struct LinkKey {
    pub(crate) ptr: DensePtr,
    pub(crate) next: DensePtr,
}

impl DensePtr {
    pub(crate) const EMPTY: DensePtr = DensePtr { bits: 0 };

    pub(crate) fn from_object(obj: *mut u8) -> DensePtr {
        debug_assert_eq!(obj as usize & TAG_MASK, 0);
        DensePtr { bits: obj as usize }
    }

    #[inline(always)]
    fn raw(self) -> *mut u8 {
        (self.bits & !TAG_MASK) as *mut u8
    }

    #[inline(always)]
    pub fn is_empty(self) -> bool {
        self.raw().is_null()
    }

    #[inline(always)]
    pub fn is_link(self) -> bool {
        self.bits & LINK_BIT != 0
    }

    #[inline(always)]
    pub fn is_object(self) -> bool {
        !self.is_empty() && !self.is_link()
    }

    #[inline(always)]
    pub fn has_ttl(self) -> bool {
        self.bits & TTL_BIT != 0
    }

    #[inline(always)]
    pub fn is_displaced(self) -> bool {
        self.bits & DISPLACED_BIT != 0
    }

    /// +1 when the entry sits one bucket to the right of its home bucket,
    /// -1 when it sits to the left. Meaningful only when `is_displaced`.
    #[inline(always)]
    pub fn displaced_direction(self) -> i32 {
        if self.bits & DIRECTION_BIT != 0 {
            1
        } else {
            -1
        }
    }

    /// The object this cell refers to, following one link hop if present.
    ///
    /// # Safety
    ///
    /// If the cell is a link, the link node must still be live.
    pub unsafe fn object(self) -> *mut u8 {
        if self.is_link() {
            (*self.as_link()).ptr.raw()
        } else {
            self.raw()
        }
    }

    pub(crate) fn as_link(self) -> *mut LinkKey {
        debug_assert!(self.is_link());
        self.raw() as *mut LinkKey
    }

    /// Pointer to the next cell in the chain, null for non-link cells.
    pub(crate) fn next_cell(self) -> *mut DensePtr {
        if self.is_link() {
            unsafe { ptr::addr_of_mut!((*self.as_link()).next) }
        } else {
            ptr::null_mut()
        }
    }

    /// Replaces the payload with a bare object, keeping the displaced and
    /// ttl tags of the cell.
    pub(crate) fn set_object(&mut self, obj: *mut u8) {
        debug_assert_eq!(obj as usize & TAG_MASK, 0);
        self.bits = (self.bits & (TAG_MASK & !LINK_BIT)) | obj as usize;
    }

    /// Replaces the payload with a link node, dropping all other tags. The
    /// previous cell value is expected to have moved into the node already.
    pub(crate) fn set_link(&mut self, link: *mut LinkKey) {
        debug_assert_eq!(link as usize & TAG_MASK, 0);
        self.bits = link as usize | LINK_BIT;
    }

    pub(crate) fn set_ttl(&mut self, on: bool) {
        if on {
            self.bits |= TTL_BIT;
        } else {
            self.bits &= !TTL_BIT;
        }
    }

    pub(crate) fn set_displaced(&mut self, direction: i32) {
        debug_assert!(direction == 1 || direction == -1);
        self.bits |= DISPLACED_BIT;
        if direction == 1 {
            self.bits |= DIRECTION_BIT;
        }
    }

    pub(crate) fn clear_displaced(&mut self) {
        self.bits &= !(DISPLACED_BIT | DIRECTION_BIT);
    }

    pub(crate) fn reset(&mut self) {
        self.bits = 0;
    }

    /// Collapses a link cell into a plain object cell holding the node's
    /// object. The ttl tag of the cell stays with the object it describes.
    ///
    /// # Safety
    ///
    /// `cell` must be a link cell whose node is still live.
    pub(crate) unsafe fn from_link(cell: DensePtr) -> DensePtr {
        debug_assert!(cell.is_link());
        let obj = (*cell.as_link()).ptr.raw();
        DensePtr {
            bits: obj as usize | (cell.bits & TTL_BIT),
        }
    }
}

impl fmt::Debug for DensePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DensePtr")
            .field("ptr", &self.raw())
            .field("link", &self.is_link())
            .field("ttl", &self.has_ttl())
            .field("displaced", &self.is_displaced())
            .finish()
    }
}
