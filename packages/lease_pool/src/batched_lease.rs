use std::fmt;

use tracing::trace;

use crate::lease::LeaseInner;
use crate::{BatchedDescriptor, BatchedPool, LeaseState, PooledResource, ResourceId, Result};

/// Exclusive handle to a resource rented from a [`BatchedPool`], able to resize itself.
///
/// Behaves like [`Lease`][crate::Lease] and additionally lets the holder check whether the
/// resource still matches a desired element count under the pool's [`BatchPolicy`] and swap
/// it for a matching one in place. Swapping keeps the lease object and its state; only the
/// resource behind it changes.
///
/// [`BatchPolicy`]: crate::BatchPolicy
///
/// # Example
///
/// ```rust
/// use lease_pool::{Allocator, ArrayDescriptor, BatchedPool};
///
/// let pool = BatchedPool::<ArrayDescriptor, Vec<u32>>::builder()
///     .batch_size(16)
///     .create(|descriptor: &ArrayDescriptor| {
///         Ok::<_, std::convert::Infallible>(vec![0; descriptor.length])
///     })
///     .release(|_array: &Vec<u32>| {})
///     .build()
///     .unwrap();
///
/// let mut lease = pool.rent(&ArrayDescriptor::new(10, Allocator::Persistent)).unwrap();
///
/// // Anything from 1 to 16 elements fits the current batch.
/// assert!(lease.ensure_batch_size(12).unwrap());
///
/// // Growing past the batch swaps in a bigger array.
/// assert!(!lease.ensure_batch_size(20).unwrap());
/// lease.resize(20).unwrap();
/// assert_eq!(lease.resource().unwrap().len(), 32);
/// ```
pub struct BatchedLease<D: BatchedDescriptor, R> {
    pool: BatchedPool<D, R>,
    inner: LeaseInner<D, R>,
}

impl<D: BatchedDescriptor, R> BatchedLease<D, R> {
    pub(crate) fn new(pool: BatchedPool<D, R>, inner: LeaseInner<D, R>) -> Self {
        Self { pool, inner }
    }

    /// Returns the leased resource.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LeaseReturned`][crate::Error::LeaseReturned] if the lease has already
    /// been returned and [`Error::ResourceReleased`][crate::Error::ResourceReleased] if the pool
    /// released the resource via `dispose()`.
    pub fn resource(&self) -> Result<&PooledResource<D, R>> {
        self.inner.resource()
    }

    /// Returns the (rounded) descriptor of the leased resource.
    #[must_use]
    pub fn descriptor(&self) -> &D {
        self.inner.descriptor()
    }

    /// Returns the identifier of the leased resource.
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.inner.id()
    }

    /// Returns the lifecycle state of the lease.
    #[must_use]
    pub fn state(&self) -> LeaseState {
        self.inner.state()
    }

    /// Returns whether the resource may currently be accessed through this lease.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.inner.is_valid()
    }

    /// Returns the resource to the pool it was rented from.
    ///
    /// Returns `true` the first time it is called and the pool accepts the resource. Any later
    /// call does nothing and returns `false`.
    pub fn return_to_pool(&mut self) -> bool {
        self.inner.return_to_pool()
    }

    /// Returns whether the held resource is exactly what the pool would allocate for a request
    /// of `desired_count` elements under its current policy.
    ///
    /// This is a pure query; the lease is not modified.
    ///
    /// # Errors
    ///
    /// Fails like [`resource()`][Self::resource] if the resource is no longer accessible, and
    /// with [`Error::BatchOverflow`][crate::Error::BatchOverflow] if `desired_count` cannot be
    /// rounded.
    pub fn ensure_batch_size(&self, desired_count: usize) -> Result<bool> {
        let resource = self.inner.resource()?;

        self.pool
            .policy()
            .is_satisfied_by(resource.descriptor().count(), desired_count)
    }

    /// Makes the lease hold a resource sized for `desired_count` elements under the pool's
    /// current policy.
    ///
    /// If the held resource already satisfies the request, nothing happens. Otherwise a
    /// replacement is rented from the pool and the previous resource goes back onto the free
    /// list of its own descriptor. The lease stays [`LeaseState::Active`] throughout.
    ///
    /// # Errors
    ///
    /// Fails like [`ensure_batch_size()`][Self::ensure_batch_size], and with
    /// [`Error::CreateFailed`][crate::Error::CreateFailed] if the replacement could not be
    /// created. On any error the lease keeps its previous resource.
    pub fn resize(&mut self, desired_count: usize) -> Result<()> {
        if self.ensure_batch_size(desired_count)? {
            return Ok(());
        }

        let requested = self.inner.descriptor().with_count(desired_count);
        let replacement = self.pool.rent_rounded(&requested)?;

        let previous = self.inner.replace_resource(replacement);

        trace!(
            pool = self.pool.name(),
            previous = %previous.id(),
            current = %self.inner.id(),
            desired_count,
            "lease resized"
        );

        let accepted = self.inner.core().return_resource(&previous);
        debug_assert!(
            accepted,
            "previous resource of an active lease was not reserved"
        );

        Ok(())
    }
}

impl<D: BatchedDescriptor, R> fmt::Debug for BatchedLease<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchedLease")
            .field("policy", &self.pool.policy())
            .field("inner", &self.inner)
            .finish()
    }
}
