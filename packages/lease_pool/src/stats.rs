use std::fmt;

/// A snapshot of the bookkeeping of a pool.
///
/// Every resource a pool has created and not yet released is either free or reserved, never
/// both, so `created - released == free + reserved` holds for every snapshot.
///
/// # Example
///
/// ```rust
/// use lease_pool::Pool;
///
/// let pool = Pool::<u32, Vec<u8>>::builder()
///     .create(|len: &u32| Ok::<_, std::convert::Infallible>(vec![0; *len as usize]))
///     .release(|_buffer: &Vec<u8>| {})
///     .build()
///     .unwrap();
///
/// let lease = pool.rent(16).unwrap();
/// drop(lease);
///
/// let stats = pool.stats();
/// assert_eq!(stats.created, 1);
/// assert_eq!(stats.free, 1);
/// assert_eq!(stats.reserved, 0);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub struct PoolStats {
    /// Resources waiting on a free list.
    pub free: usize,

    /// Resources held by active leases.
    pub reserved: usize,

    /// Number of distinct descriptors with at least one free resource.
    pub buckets: usize,

    /// Total resources produced by the create callback over the lifetime of the pool.
    pub created: u64,

    /// Total rents that were satisfied from a free list.
    pub reused: u64,

    /// Total resources passed to the release callback.
    pub released: u64,
}

impl PoolStats {
    /// Returns the number of resources the pool currently owns, free or reserved.
    #[must_use]
    pub fn live(&self) -> usize {
        self.free.saturating_add(self.reserved)
    }
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} free in {} buckets, {} reserved ({} created, {} reused, {} released)",
            self.free, self.buckets, self.reserved, self.created, self.reused, self.released
        )
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn display_summarizes_all_counters() {
        let stats = PoolStats {
            free: 2,
            reserved: 3,
            buckets: 1,
            created: 6,
            reused: 10,
            released: 1,
        };

        assert_eq!(
            stats.to_string(),
            "2 free in 1 buckets, 3 reserved (6 created, 10 reused, 1 released)"
        );
        assert_eq!(stats.live(), 5);
    }
}
