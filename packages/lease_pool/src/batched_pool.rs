use std::any::type_name;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::lease::LeaseInner;
use crate::metrics::BATCH_OVERALLOCATION;
use crate::pool_core::PoolCore;
use crate::{
    BatchPolicy, BatchedDescriptor, BatchedLease, BatchedPoolBuilder, PoolStats, PooledResource,
    Result,
};

/// A single-threaded pool that rounds requested element counts to a [`BatchPolicy`] before
/// using the descriptor as a free list key.
///
/// Rounding makes requests of similar size share resources: with a batch size of 64, requests
/// for 1 to 64 elements all map to the same 64-element bucket. The leases handed out are
/// [`BatchedLease`]s, which can check and adjust their size against the policy in place.
///
/// Like [`Pool`][crate::Pool], this is a cloneable single-threaded handle.
///
/// # Changing the policy
///
/// Free resources are keyed by counts rounded under the policy that was active when they were
/// rented. [`set_policy()`][Self::set_policy] therefore releases all free resources when the
/// policy changes. Active leases keep their resources; the next
/// [`ensure_batch_size()`][BatchedLease::ensure_batch_size] or
/// [`resize()`][BatchedLease::resize] evaluates them against the new policy.
///
/// # Example
///
/// ```rust
/// use std::num::NonZero;
///
/// use lease_pool::{BatchedPool, BufferDescriptor, BufferTarget};
///
/// let pool = BatchedPool::<BufferDescriptor, Vec<u8>>::builder()
///     .base_size(NonZero::new(4).unwrap())
///     .batch_size(8)
///     .create(|descriptor: &BufferDescriptor| {
///         Ok::<_, std::convert::Infallible>(vec![0; descriptor.byte_size().unwrap()])
///     })
///     .release(|_buffer: &Vec<u8>| {})
///     .build()
///     .unwrap();
///
/// let lease = pool
///     .rent(&BufferDescriptor::new(3, 4, BufferTarget::Structured))
///     .unwrap();
///
/// // Three elements were requested; the pool allocated a full batch of eight.
/// assert_eq!(lease.descriptor().count, 8);
/// assert_eq!(lease.resource().unwrap().len(), 32);
/// ```
pub struct BatchedPool<D, R> {
    core: Rc<PoolCore<D, R>>,
    policy: Rc<Cell<BatchPolicy>>,
}

impl<D: BatchedDescriptor, R: 'static> BatchedPool<D, R> {
    /// Returns a builder for creating a [`BatchedPool`].
    pub fn builder() -> BatchedPoolBuilder<D, R> {
        BatchedPoolBuilder::new()
    }
}

impl<D: BatchedDescriptor, R> BatchedPool<D, R> {
    pub(crate) fn from_parts(core: Rc<PoolCore<D, R>>, policy: BatchPolicy) -> Self {
        Self {
            core,
            policy: Rc::new(Cell::new(policy)),
        }
    }

    /// Rents a resource for `descriptor`, with its element count rounded by the active policy.
    ///
    /// The lease holds the rounded descriptor; the descriptor passed in is not modified.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BatchOverflow`][crate::Error::BatchOverflow] if the requested count
    /// cannot be rounded and [`Error::CreateFailed`][crate::Error::CreateFailed] if no free
    /// resource matched and the create callback failed.
    pub fn rent(&self, descriptor: &D) -> Result<BatchedLease<D, R>> {
        let resource = self.rent_rounded(descriptor)?;

        Ok(BatchedLease::new(
            self.clone(),
            LeaseInner::new(Rc::clone(&self.core), resource),
        ))
    }

    /// Rents a resource for `descriptor` after rounding it, without wrapping it in a lease.
    pub(crate) fn rent_rounded(&self, descriptor: &D) -> Result<Rc<PooledResource<D, R>>> {
        let rounded = self.round(descriptor)?;

        Self::record_overallocation(descriptor, &rounded);

        self.core.rent_raw(rounded)
    }

    #[cfg_attr(test, mutants::skip)] // Metrics only, no observable effect on the pool.
    fn record_overallocation(requested: &D, rounded: &D) {
        BATCH_OVERALLOCATION.with(|e| {
            e.observe(rounded.count().saturating_sub(requested.count()));
        });
    }

    /// Returns `descriptor` with its element count rounded by the active policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BatchOverflow`][crate::Error::BatchOverflow] if the element count cannot
    /// be rounded without overflowing.
    pub fn round(&self, descriptor: &D) -> Result<D> {
        Ok(descriptor.with_count(self.batched_count(descriptor.count())?))
    }

    /// Returns the element count a request for `requested` elements is rounded to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BatchOverflow`][crate::Error::BatchOverflow] if the rounded count does not
    /// fit in `usize`.
    pub fn batched_count(&self, requested: usize) -> Result<usize> {
        self.policy.get().batched_count(requested)
    }

    /// Returns the active batching policy.
    #[must_use]
    pub fn policy(&self) -> BatchPolicy {
        self.policy.get()
    }

    /// Replaces the batching policy.
    ///
    /// If the new policy differs from the active one, every free resource is released because
    /// its key was rounded under the old policy. Returns the number of resources released.
    pub fn set_policy(&self, policy: BatchPolicy) -> usize {
        let previous = self.policy.replace(policy);

        if previous == policy {
            return 0;
        }

        let released = self.core.clear_unused();

        debug!(
            pool = self.core.name(),
            %previous,
            %policy,
            released,
            "batch policy changed"
        );

        released
    }

    /// Releases every free resource. Resources held by active leases are not affected.
    ///
    /// Returns the number of resources released.
    #[must_use]
    pub fn clear_unused(&self) -> usize {
        self.core.clear_unused()
    }

    /// Releases every resource of the pool, including those held by active leases.
    ///
    /// Returns the number of resources released.
    #[must_use]
    pub fn dispose(&self) -> usize {
        self.core.dispose()
    }

    /// Returns a snapshot of the pool bookkeeping.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.core.stats()
    }

    /// Returns the number of free resources whose descriptor equals `descriptor` exactly.
    ///
    /// The descriptor is not rounded; pass a rounded descriptor (see [`round()`][Self::round])
    /// to look up the bucket a request would be served from.
    #[must_use]
    pub fn free_count(&self, descriptor: &D) -> usize {
        self.core.free_count(descriptor)
    }

    /// Returns the number of resources currently held by leases.
    #[must_use]
    pub fn reserved_count(&self) -> usize {
        self.core.reserved_count()
    }

    /// Returns the name the pool uses in log events.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.core.name()
    }
}

impl<D, R> Clone for BatchedPool<D, R> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
            policy: Rc::clone(&self.policy),
        }
    }
}

impl<D: fmt::Debug, R> fmt::Debug for BatchedPool<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("core", &self.core)
            .field("policy", &self.policy.get())
            .finish()
    }
}
