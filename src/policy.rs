/// Caller-supplied interpretation of the opaque object pointers a
/// [`DenseSet`](crate::DenseSet) stores.
///
/// The `cookie` threaded through `hash` and `equal` selects an alternate
/// probe representation: with cookie 0 both sides are stored objects, while a
/// non-zero cookie tells the policy that the probe argument points at
/// whatever borrowed form the caller chose (see `StringSet` for the byte
/// slice variant). Hashes of a stored object and of a probe for the same
/// logical key must agree.
///
/// # Safety
///
/// Implementations are handed raw pointers that were previously inserted
/// into the set (or probe pointers passed alongside the matching cookie) and
/// must treat them accordingly. `hash` must be deterministic for a given
/// object, object pointers must be at least 16-byte aligned, and no hook may
/// re-enter the set it is invoked from.
pub unsafe trait ObjectPolicy {
    fn hash(&self, obj: *const u8, cookie: u32) -> u64;

    /// `lhs` is always a stored object; `rhs` is a stored object or a probe,
    /// depending on `cookie`.
    fn equal(&self, lhs: *const u8, rhs: *const u8, cookie: u32) -> bool;

    /// Heap footprint of the object, used only for the `obj_bytes` counter.
    fn alloc_size(&self, obj: *const u8) -> usize;

    /// Logical expiration time of the object. Consulted only for entries
    /// inserted with the ttl flag.
    fn expire_time(&self, obj: *const u8) -> u32;

    /// Releases the object. Called exactly once per stored object, when the
    /// set evicts, erases, clears or drops it.
    fn destroy(&self, obj: *mut u8, had_ttl: bool);
}
