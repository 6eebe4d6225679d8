use std::alloc::Layout;
use std::ptr::{self, NonNull};

use log::{error, trace};

use crate::alloc::{LinkAllocator, MemoryResource};
use crate::iter::Iter;
use crate::policy::ObjectPolicy;
use crate::ptr::DensePtr;

const MIN_SIZE_SHIFT: u32 = 2;
const MIN_SIZE: usize = 1 << MIN_SIZE_SHIFT;

/// A dense associative set of opaque object pointers.
///
/// Entries live in a flat power-of-two bucket array. An entry whose home
/// bucket is occupied may be displaced one bucket to either side; once the
/// home and both neighbors are taken, further entries chain off the home
/// bucket through pooled link nodes. Lookups therefore touch at most three
/// buckets before walking a single chain.
///
/// Expiration is lazy: any operation that visits a cell first removes it if
/// its ttl has passed the logical clock set via [`set_time`](Self::set_time).
///
/// A `DenseSet` is single-writer. It is not thread-safe and every operation
/// runs to completion without suspension, so the structure is consistent at
/// every public call boundary.
pub struct DenseSet<'m, P: ObjectPolicy> {
    policy: P,
    mr: &'m dyn MemoryResource,
    links: LinkAllocator<'m>,
    table: *mut DensePtr,
    table_len: usize,
    capacity_log: u32,
    size: u32,
    num_used_buckets: u32,
    obj_malloc_used: usize,
    time_now: u32,
}

impl<'m, P: ObjectPolicy> DenseSet<'m, P> {
    pub fn new(policy: P, mr: &'m dyn MemoryResource) -> Self {
        Self {
            policy,
            mr,
            links: LinkAllocator::new(mr),
            table: ptr::null_mut(),
            table_len: 0,
            capacity_log: 0,
            size: 0,
            num_used_buckets: 0,
            obj_malloc_used: 0,
            time_now: 0,
        }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.size as usize
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Width of the bucket array.
    pub fn capacity(&self) -> usize {
        self.table_len
    }

    /// Number of non-empty bucket heads.
    pub fn used_buckets(&self) -> usize {
        self.num_used_buckets as usize
    }

    /// Number of chain link nodes currently allocated.
    pub fn chain_links(&self) -> usize {
        self.links.live() as usize
    }

    /// Sum of the policy's `alloc_size` over all live objects.
    pub fn obj_bytes(&self) -> usize {
        self.obj_malloc_used
    }

    pub fn time_now(&self) -> u32 {
        self.time_now
    }

    /// Steps the logical clock used for ttl checks.
    pub fn set_time(&mut self, now: u32) {
        self.time_now = now;
    }

    /// Raw snapshot of the bucket head at `idx`, for diagnostics and tests.
    pub fn bucket(&self, idx: usize) -> DensePtr {
        assert!(idx < self.table_len);
        unsafe { *self.cell(idx) }
    }

    /// Grows the bucket array to hold at least `n` buckets (minimum 4,
    /// rounded up to a power of two) and rehashes entries whose home moved.
    /// The array never shrinks.
    pub fn reserve(&mut self, n: usize) {
        let target = n.max(MIN_SIZE).next_power_of_two();
        if target > self.table_len {
            let prev_len = self.table_len;
            unsafe {
                self.resize_table(target);
                self.capacity_log = target.trailing_zeros();
                self.grow(prev_len);
            }
        }
    }

    /// Inserts `obj` unless an equal object is already present, in which
    /// case the existing entry's cell is returned and `obj` stays owned by
    /// the caller.
    ///
    /// # Safety
    ///
    /// `obj` must satisfy the policy contract and stay valid while stored.
    /// The returned cell pointer is invalidated by any mutation of the set.
    pub unsafe fn add_or_find(&mut self, obj: NonNull<u8>, has_ttl: bool) -> Option<NonNull<DensePtr>> {
        let obj = obj.as_ptr();
        let hash = self.policy.hash(obj, 0);

        if self.table_len == 0 {
            self.capacity_log = MIN_SIZE_SHIFT;
            self.resize_table(MIN_SIZE);
            let bid = self.bucket_id(hash);
            let bytes = self.push_front_new(self.cell(bid), obj, has_ttl);
            self.obj_malloc_used += bytes;
            self.size += 1;
            return None;
        }

        let bid = self.bucket_id(hash);
        if let Some((_, _, cell)) = self.find_cell(obj, bid, 0) {
            return Some(NonNull::new_unchecked(cell));
        }

        self.add_unique_inner(obj, has_ttl, hash);
        None
    }

    /// Inserts `obj`, replacing an equal object in place if one exists. The
    /// previous object pointer is returned and must be destroyed by the
    /// caller.
    ///
    /// # Safety
    ///
    /// Same contract as [`add_or_find`](Self::add_or_find).
    pub unsafe fn add_or_replace(&mut self, obj: NonNull<u8>, has_ttl: bool) -> Option<NonNull<u8>> {
        let cell = self.add_or_find(obj, has_ttl)?.as_ptr();

        let prev = (*cell).object();
        self.obj_malloc_used -= self.policy.alloc_size(prev);
        self.obj_malloc_used += self.policy.alloc_size(obj.as_ptr());

        if (*cell).is_link() {
            (*(*cell).as_link()).ptr.set_object(obj.as_ptr());
        } else {
            (*cell).set_object(obj.as_ptr());
        }
        // the ttl flag of a chained entry lives on the cell, not inside the
        // link node
        (*cell).set_ttl(has_ttl);

        Some(NonNull::new_unchecked(prev))
    }

    /// Inserts `obj` without searching for duplicates.
    ///
    /// # Safety
    ///
    /// The object must not already be present, `hash` must equal
    /// `policy.hash(obj, 0)`, and the policy contract of
    /// [`add_or_find`](Self::add_or_find) applies.
    pub unsafe fn add_unique(&mut self, obj: NonNull<u8>, has_ttl: bool, hash: u64) {
        debug_assert_eq!(hash, self.policy.hash(obj.as_ptr(), 0));
        self.add_unique_inner(obj.as_ptr(), has_ttl, hash);
    }

    /// Looks up the stored object equal to `probe` under `cookie`.
    ///
    /// # Safety
    ///
    /// `probe` must be valid for the policy's interpretation of `cookie`.
    pub unsafe fn find(&mut self, probe: *const u8, cookie: u32) -> Option<NonNull<u8>> {
        if self.table_len == 0 {
            return None;
        }
        let hash = self.policy.hash(probe, cookie);
        let bid = self.bucket_id(hash);
        self.find_cell(probe, bid, cookie)
            .map(|(_, _, cell)| NonNull::new_unchecked((*cell).object()))
    }

    /// Removes and destroys the stored object equal to `probe`.
    ///
    /// # Safety
    ///
    /// Same contract as [`find`](Self::find).
    pub unsafe fn erase(&mut self, probe: *const u8, cookie: u32) -> bool {
        if self.table_len == 0 {
            return false;
        }
        let hash = self.policy.hash(probe, cookie);
        let bid = self.bucket_id(hash);
        match self.find_cell(probe, bid, cookie) {
            Some((_, prev, cell)) => {
                self.delete_cell(prev, cell);
                true
            }
            None => false,
        }
    }

    /// Unlinks and returns the first live object in bucket order, expiring
    /// stale entries on the way. Ownership transfers to the caller, which
    /// becomes responsible for destroying the object.
    pub fn pop_front(&mut self) -> Option<NonNull<u8>> {
        unsafe {
            let mut idx = 0;
            loop {
                while idx < self.table_len && (*self.cell(idx)).is_empty() {
                    idx += 1;
                }
                if idx == self.table_len {
                    return None;
                }

                let cell = self.cell(idx);
                self.expire_if_needed(ptr::null_mut(), cell);
                if (*cell).is_empty() {
                    continue;
                }

                self.obj_malloc_used -= self.policy.alloc_size((*cell).object());
                let obj = self.pop_data_front(cell);
                self.size -= 1;
                return Some(NonNull::new_unchecked(obj));
            }
        }
    }

    /// Visits every element whose home bucket the cursor has reached and
    /// returns the next cursor, 0 when the scan wrapped.
    ///
    /// The cursor keeps the Redis SCAN guarantees across table growth: a
    /// loop from cursor 0 back to 0 sees every element that was present for
    /// the whole loop at least once, and no unmodified element more than
    /// twice. Stability holds because homes come from the high bits of the
    /// hash while the cursor stores the next bucket index in its own high
    /// bits, so doubling the table splits bucket `i` into `2i` and `2i+1`
    /// and an old cursor still bounds the scanned prefix.
    pub fn scan<F>(&mut self, cursor: u32, mut visitor: F) -> u32
    where
        F: FnMut(NonNull<u8>),
    {
        if self.capacity_log == 0 {
            return 0;
        }

        let mut idx = (cursor >> (32 - self.capacity_log)) as usize;

        unsafe {
            // Skip buckets no element calls home, counting entries displaced
            // into them from either neighbor.
            while idx < self.table_len && self.no_item_belongs_bucket(idx) {
                idx += 1;
            }
            if idx == self.table_len {
                return 0;
            }

            let mut curr = self.cell(idx);
            if !(*curr).is_empty() && !(*curr).is_displaced() {
                loop {
                    visitor(NonNull::new_unchecked((*curr).object()));
                    if !(*curr).is_link() {
                        break;
                    }
                    let next = (*curr).next_cell();
                    if self.expire_if_needed(curr, next) && !(*curr).is_link() {
                        break;
                    }
                    curr = (*curr).next_cell();
                }
            }

            if idx > 0 {
                let left = self.cell(idx - 1);
                self.expire_if_needed(ptr::null_mut(), left);
                if (*left).is_displaced() && (*left).displaced_direction() == -1 {
                    visitor(NonNull::new_unchecked((*left).object()));
                }
            }

            idx += 1;
            if idx >= self.table_len {
                return 0;
            }

            let right = self.cell(idx);
            self.expire_if_needed(ptr::null_mut(), right);
            if (*right).is_displaced() && (*right).displaced_direction() == 1 {
                visitor(NonNull::new_unchecked((*right).object()));
            }
        }

        (idx as u32) << (32 - self.capacity_log)
    }

    /// Forward iterator over all live entries. The set stays mutably
    /// borrowed for the iterator's lifetime; the only mutation the iterator
    /// itself performs is lazy expiry.
    pub fn iter(&mut self) -> Iter<'_, 'm, P> {
        Iter::new(self)
    }

    /// Destroys every stored object and releases the bucket array. Counters
    /// reset to their initial state.
    pub fn clear(&mut self) {
        unsafe {
            for idx in 0..self.table_len {
                let cell = self.cell(idx);
                while !(*cell).is_empty() {
                    let had_ttl = (*cell).has_ttl();
                    let obj = self.pop_data_front(cell);
                    self.policy.destroy(obj, had_ttl);
                }
            }
            if self.table_len > 0 {
                let layout = Layout::array::<DensePtr>(self.table_len).unwrap();
                self.mr
                    .deallocate(NonNull::new_unchecked(self.table as *mut u8), layout);
            }
        }
        debug_assert_eq!(self.num_used_buckets, 0);
        debug_assert_eq!(self.links.live(), 0);
        self.table = ptr::null_mut();
        self.table_len = 0;
        self.capacity_log = 0;
        self.size = 0;
        self.num_used_buckets = 0;
        self.obj_malloc_used = 0;
    }

    #[inline(always)]
    pub(crate) fn cell(&self, idx: usize) -> *mut DensePtr {
        debug_assert!(idx < self.table_len);
        unsafe { self.table.add(idx) }
    }

    pub(crate) fn table_len(&self) -> usize {
        self.table_len
    }

    fn bucket_id(&self, hash: u64) -> usize {
        debug_assert!(self.capacity_log >= MIN_SIZE_SHIFT);
        (hash >> (64 - self.capacity_log)) as usize
    }

    unsafe fn obj_bucket(&self, obj: *const u8) -> usize {
        self.bucket_id(self.policy.hash(obj, 0))
    }

    unsafe fn resize_table(&mut self, new_len: usize) {
        debug_assert!(new_len.is_power_of_two());
        let layout = Layout::array::<DensePtr>(new_len).unwrap();
        let table = self.mr.allocate(layout).cast::<DensePtr>().as_ptr();
        ptr::write_bytes(table, 0, new_len);
        if self.table_len > 0 {
            ptr::copy_nonoverlapping(self.table, table, self.table_len);
            let old = Layout::array::<DensePtr>(self.table_len).unwrap();
            self.mr
                .deallocate(NonNull::new_unchecked(self.table as *mut u8), old);
        }
        self.table = table;
        self.table_len = new_len;
    }

    /// True when no cell of `bid` holds a live entry and neither neighbor is
    /// displaced into it.
    unsafe fn no_item_belongs_bucket(&mut self, bid: usize) -> bool {
        let cell = self.cell(bid);
        self.expire_if_needed(ptr::null_mut(), cell);
        if !(*cell).is_empty() && !(*cell).is_displaced() {
            return false;
        }

        if bid + 1 < self.table_len {
            let right = self.cell(bid + 1);
            self.expire_if_needed(ptr::null_mut(), right);
            if !(*right).is_empty() && (*right).is_displaced() && (*right).displaced_direction() == 1
            {
                return false;
            }
        }

        if bid > 0 {
            let left = self.cell(bid - 1);
            self.expire_if_needed(ptr::null_mut(), left);
            if !(*left).is_empty() && (*left).is_displaced() && (*left).displaced_direction() == -1 {
                return false;
            }
        }

        true
    }

    /// Empty slot for an insert homed at `bid`: the home itself, then the
    /// right neighbor, then the left.
    unsafe fn find_empty_around(&mut self, bid: usize) -> Option<usize> {
        self.expire_if_needed(ptr::null_mut(), self.cell(bid));
        if (*self.cell(bid)).is_empty() {
            return Some(bid);
        }

        if bid + 1 < self.table_len {
            let right = self.cell(bid + 1);
            self.expire_if_needed(ptr::null_mut(), right);
            if (*right).is_empty() {
                return Some(bid + 1);
            }
        }

        if bid > 0 {
            let left = self.cell(bid - 1);
            self.expire_if_needed(ptr::null_mut(), left);
            if (*left).is_empty() {
                return Some(bid - 1);
            }
        }

        None
    }

    unsafe fn add_unique_inner(&mut self, obj: *mut u8, has_ttl: bool, hash: u64) {
        if self.table_len == 0 {
            self.capacity_log = MIN_SIZE_SHIFT;
            self.resize_table(MIN_SIZE);
        }

        let mut bid = self.bucket_id(hash);

        // Flat placement first, growing once if the table is already at
        // full load.
        for _ in 0..2 {
            if let Some(slot) = self.find_empty_around(bid) {
                let bytes = self.push_front_new(self.cell(slot), obj, has_ttl);
                self.obj_malloc_used += bytes;
                if slot != bid {
                    let direction = slot as i64 - bid as i64;
                    (*self.cell(slot)).set_displaced(direction as i32);
                }
                self.size += 1;
                return;
            }

            if (self.size as usize) < self.table_len {
                break;
            }

            let prev_len = self.table_len;
            self.resize_table(prev_len * 2);
            self.capacity_log += 1;
            self.grow(prev_len);
            bid = self.bucket_id(hash);
        }

        debug_assert!(!(*self.cell(bid)).is_empty());

        // The home bucket is taken. If its head is displaced, walk it back
        // to its own home, which may evict another displaced head; each step
        // settles one entry, so the walk terminates at a bucket whose head
        // is home-resident or empty.
        let mut to_insert = DensePtr::from_object(obj);
        if has_ttl {
            to_insert.set_ttl(true);
        }

        while !(*self.cell(bid)).is_empty() && (*self.cell(bid)).is_displaced() {
            let unlinked = self.pop_ptr_front(self.cell(bid));
            self.push_front_ptr(self.cell(bid), to_insert);
            to_insert = unlinked;
            bid = (bid as i64 - unlinked.displaced_direction() as i64) as usize;
        }

        let home = self.obj_bucket(to_insert.object());
        if home != bid {
            error!(
                "dense set: entry settled in bucket {} but hashes home to {} (table size {})",
                bid, home, self.table_len
            );
        }

        self.push_front_ptr(self.cell(bid), to_insert);
        self.obj_malloc_used += self.policy.alloc_size(obj);
        debug_assert!(!(*self.cell(bid)).is_displaced());
        self.size += 1;
    }

    /// Probes `bid`, its neighbors, then the chain at `bid`, expiring every
    /// visited cell. Returns the bucket id, the predecessor cell (null for
    /// heads) and the matching cell.
    unsafe fn find_cell(
        &mut self,
        probe: *const u8,
        bid: usize,
        cookie: u32,
    ) -> Option<(usize, *mut DensePtr, *mut DensePtr)> {
        debug_assert!(bid < self.table_len);

        let cell = self.cell(bid);
        self.expire_if_needed(ptr::null_mut(), cell);
        if self.equal_at(*cell, probe, cookie) {
            return Some((bid, ptr::null_mut(), cell));
        }

        // Displaced neighbors first; cheaper than a potentially long chain.
        if bid > 0 {
            let left = self.cell(bid - 1);
            self.expire_if_needed(ptr::null_mut(), left);
            if self.equal_at(*left, probe, cookie) {
                return Some((bid - 1, ptr::null_mut(), left));
            }
        }

        if bid + 1 < self.table_len {
            let right = self.cell(bid + 1);
            self.expire_if_needed(ptr::null_mut(), right);
            if self.equal_at(*right, probe, cookie) {
                return Some((bid + 1, ptr::null_mut(), right));
            }
        }

        let mut prev = self.cell(bid);
        let mut curr = (*prev).next_cell();
        while !curr.is_null() {
            // An expired tail folds prev into a plain cell and frees the
            // node holding curr; the chain is over in that case.
            if self.expire_if_needed(prev, curr) && !(*prev).is_link() {
                break;
            }
            if self.equal_at(*curr, probe, cookie) {
                return Some((bid, prev, curr));
            }
            prev = curr;
            curr = (*curr).next_cell();
        }

        None
    }

    unsafe fn equal_at(&self, cell: DensePtr, probe: *const u8, cookie: u32) -> bool {
        if cell.is_empty() {
            return false;
        }
        self.policy.equal(cell.object(), probe, cookie)
    }

    /// Rehashes the chains of the first `prev_len` buckets after the table
    /// doubled. Walking from high to low indices guarantees each entry is
    /// relocated at most once: anything pushed to a higher bucket has
    /// already been processed, anything pushed lower is revisited in place.
    unsafe fn grow(&mut self, prev_len: usize) {
        trace!(
            "dense set: redistributing {} buckets into {}",
            prev_len,
            self.table_len
        );

        for idx in (0..prev_len).rev() {
            let mut prev: *mut DensePtr = ptr::null_mut();
            let mut curr = self.cell(idx);

            loop {
                if self.expire_if_needed(prev, curr) && !prev.is_null() && !(*prev).is_link() {
                    break;
                }
                if (*curr).is_empty() {
                    break;
                }

                let obj = (*curr).object();
                let bid = self.obj_bucket(obj);

                if bid == idx {
                    // Already home; it may still carry a stale displaced tag
                    // from before the resize.
                    (*curr).clear_displaced();
                    prev = curr;
                    curr = (*curr).next_cell();
                    if curr.is_null() {
                        break;
                    }
                    continue;
                }

                let dptr = *curr;
                if (*curr).is_object() {
                    (*curr).reset();
                    if prev.is_null() {
                        self.num_used_buckets -= 1;
                    } else {
                        debug_assert!((*prev).is_link());
                        let folded = DensePtr::from_link(*prev);
                        let node = (*prev).as_link();
                        self.links.free(NonNull::new_unchecked(node));
                        *prev = folded;
                        debug_assert!(!(*prev).is_link());
                    }

                    self.check_home(dptr.object(), bid);
                    let dest = self.cell(bid);
                    self.push_front_ptr(dest, dptr);
                    (*dest).clear_displaced();
                    break;
                }

                // A link node moves wholesale; the chain continues with
                // whatever followed it.
                *curr = *dptr.next_cell();
                debug_assert!(!(*curr).is_empty());

                self.check_home(dptr.object(), bid);
                let dest = self.cell(bid);
                self.push_front_ptr(dest, dptr);
                (*dest).clear_displaced();
            }
        }
    }

    /// Guard against policies whose hash drifted for a stored object; the
    /// set keeps going but the inconsistency is worth surfacing.
    unsafe fn check_home(&self, obj: *const u8, expect: usize) {
        let home = self.obj_bucket(obj);
        if home != expect {
            error!(
                "dense set: entry rehomed to bucket {} but hashes home to {} (table size {})",
                expect, home, self.table_len
            );
        }
    }

    /// Places a fresh object at the front of `cell`, chaining if the cell is
    /// occupied. Returns the policy's size of the object.
    unsafe fn push_front_new(&mut self, cell: *mut DensePtr, obj: *mut u8, has_ttl: bool) -> usize {
        if (*cell).is_empty() {
            (*cell).set_object(obj);
            self.num_used_buckets += 1;
        } else {
            let node = self.links.alloc(obj, *cell);
            (*cell).set_link(node.as_ptr());
        }
        if has_ttl {
            (*cell).set_ttl(true);
        }
        self.policy.alloc_size(obj)
    }

    /// Places an existing entry (bare object or full link node) at the front
    /// of `cell`, reusing or allocating link nodes as needed. Bucket and
    /// chain counters track the transitions here.
    unsafe fn push_front_ptr(&mut self, cell: *mut DensePtr, dptr: DensePtr) {
        if (*cell).is_empty() {
            (*cell).set_object(dptr.object());
            if dptr.has_ttl() {
                (*cell).set_ttl(true);
            }
            if dptr.is_link() {
                self.links.free(NonNull::new_unchecked(dptr.as_link()));
            }
            self.num_used_buckets += 1;
        } else if dptr.is_link() {
            *dptr.next_cell() = *cell;
            *cell = dptr;
            debug_assert!(!(*(*cell).as_link()).next.is_empty());
        } else {
            debug_assert!(dptr.is_object());
            let node = self.links.alloc(dptr.object(), *cell);
            (*cell).set_link(node.as_ptr());
            if dptr.has_ttl() {
                (*cell).set_ttl(true);
            }
        }
    }

    /// Detaches and returns the head of `cell` without freeing anything.
    unsafe fn pop_ptr_front(&mut self, cell: *mut DensePtr) -> DensePtr {
        if (*cell).is_empty() {
            return DensePtr::EMPTY;
        }

        let front = *cell;
        if front.is_object() {
            (*cell).reset();
            self.num_used_buckets -= 1;
        } else {
            debug_assert!(front.is_link());
            let next = *front.next_cell();
            if next.is_empty() {
                (*cell).reset();
                self.num_used_buckets -= 1;
            } else {
                *cell = next;
            }
        }
        front
    }

    /// Pops the head of `cell` and returns its object, releasing the link
    /// node if one carried it.
    unsafe fn pop_data_front(&mut self, cell: *mut DensePtr) -> *mut u8 {
        let front = self.pop_ptr_front(cell);
        let obj = front.object();
        if front.is_link() {
            self.links.free(NonNull::new_unchecked(front.as_link()));
        }
        obj
    }

    /// Unlinks `cell` from its bucket, folding a trailing predecessor link
    /// back into a plain cell, and destroys the object.
    unsafe fn delete_cell(&mut self, prev: *mut DensePtr, cell: *mut DensePtr) {
        let obj;

        if (*cell).is_object() {
            obj = (*cell).object();
            (*cell).reset();
            if prev.is_null() {
                self.num_used_buckets -= 1;
            } else {
                debug_assert!((*prev).is_link());
                let folded = DensePtr::from_link(*prev);
                let node = (*prev).as_link();
                self.links.free(NonNull::new_unchecked(node));
                *prev = folded;
                debug_assert!(!(*prev).is_link());
            }
        } else {
            debug_assert!((*cell).is_link());
            let node = (*cell).as_link();
            obj = (*node).ptr.object();
            *cell = (*node).next;
            self.links.free(NonNull::new_unchecked(node));
        }

        self.obj_malloc_used -= self.policy.alloc_size(obj);
        self.size -= 1;
        self.policy.destroy(obj, false);
    }

    /// Removes expired entries starting at `node` until the cell holds a
    /// live entry or empties out. Returns whether anything was deleted.
    /// When the deletion folded `prev`, the cell behind `node` is gone and
    /// callers walking a chain must stop at `prev`.
    pub(crate) unsafe fn expire_if_needed(&mut self, prev: *mut DensePtr, node: *mut DensePtr) -> bool {
        if !(*node).has_ttl() {
            return false;
        }

        let mut deleted = false;
        loop {
            let obj = (*node).object();
            if self.policy.expire_time(obj) > self.time_now {
                break;
            }

            // Deleting a chain tail frees the node that holds `node`.
            let folds = !prev.is_null() && (*node).is_object();
            self.delete_cell(prev, node);
            deleted = true;
            if folds || !(*node).has_ttl() {
                break;
            }
        }
        deleted
    }
}

impl<P: ObjectPolicy> Drop for DenseSet<'_, P> {
    fn drop(&mut self) {
        self.clear();
    }
}
