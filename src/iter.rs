use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use crate::policy::ObjectPolicy;
use crate::set::DenseSet;

/// Forward iterator over every live entry of a [`DenseSet`].
///
/// The iterator holds the set mutably borrowed because positioning expires
/// stale entries; that is the only mutation it performs, and it always
/// leaves the iterator on a live cell or at the end. Entries already yielded
/// sit behind the cursor and are never touched again, so the returned
/// pointers stay valid while the borrow lasts.
pub struct Iter<'a, 'm, P: ObjectPolicy> {
    owner: *mut DenseSet<'m, P>,
    bucket: usize,
    cell: *mut crate::ptr::DensePtr,
    _marker: PhantomData<&'a mut DenseSet<'m, P>>,
}

impl<'a, 'm, P: ObjectPolicy> Iter<'a, 'm, P> {
    pub(crate) fn new(owner: &'a mut DenseSet<'m, P>) -> Self {
        let mut it = Self {
            owner,
            bucket: 0,
            cell: ptr::null_mut(),
            _marker: PhantomData,
        };

        unsafe {
            let set = &mut *it.owner;
            if set.table_len() == 0 {
                return it;
            }

            it.cell = set.cell(0);
            set.expire_if_needed(ptr::null_mut(), it.cell);
            if (*it.cell).is_empty() {
                it.advance();
            }
        }

        it
    }

    fn advance(&mut self) {
        unsafe {
            let set = &mut *self.owner;
            let mut stepped_link = false;

            if !self.cell.is_null() && (*self.cell).is_link() {
                let next = (*self.cell).next_cell();
                // Expiring the tail may fold this cell into a plain object,
                // in which case the chain is exhausted.
                if !set.expire_if_needed(self.cell, next) || (*self.cell).is_link() {
                    self.cell = (*self.cell).next_cell();
                    stepped_link = true;
                }
            }

            if !stepped_link {
                loop {
                    self.bucket += 1;
                    if self.bucket >= set.table_len() {
                        self.bucket = set.table_len();
                        self.cell = ptr::null_mut();
                        return;
                    }
                    let cell = set.cell(self.bucket);
                    set.expire_if_needed(ptr::null_mut(), cell);
                    if !(*cell).is_empty() {
                        self.cell = cell;
                        break;
                    }
                }
            }

            debug_assert!(!(*self.cell).is_empty());
        }
    }
}

impl<P: ObjectPolicy> Iterator for Iter<'_, '_, P> {
    type Item = NonNull<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cell.is_null() {
            return None;
        }
        let obj = unsafe { (*self.cell).object() };
        self.advance();
        NonNull::new(obj)
    }
}

#[cfg(test)]
mod tests {
    use crate::string_set::StringSet;

    #[test]
    fn visits_every_entry_once() {
        let mut set = StringSet::default();
        for i in 0..500 {
            assert!(set.add(format!("key:{i}").as_bytes(), None));
        }

        let mut seen = std::collections::HashSet::new();
        for key in set.iter() {
            assert!(seen.insert(key.to_vec()));
        }
        assert_eq!(seen.len(), 500);
    }

    #[test]
    fn empty_set_yields_nothing() {
        let mut set = StringSet::default();
        assert_eq!(set.iter().count(), 0);
    }

    #[test]
    fn skips_expired_entries() {
        let mut set = StringSet::default();
        for i in 0..20 {
            let ttl = if i % 2 == 0 { Some(5) } else { None };
            assert!(set.add(format!("key:{i}").as_bytes(), ttl));
        }

        set.set_time(5);
        assert_eq!(set.iter().count(), 10);
        assert_eq!(set.len(), 10);
    }
}
