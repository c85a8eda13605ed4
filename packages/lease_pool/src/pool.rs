use std::any::type_name;
use std::fmt;
use std::rc::Rc;

use crate::lease::LeaseInner;
use crate::pool_core::PoolCore;
use crate::{Descriptor, Lease, PoolBuilder, PoolStats, Result};

/// A single-threaded pool that leases out resources keyed by a [`Descriptor`].
///
/// This type acts as a cloneable handle to a shared pool instance. The pool stays alive as long
/// as at least one handle or one [`Lease`] exists.
///
/// Renting a descriptor takes the most recently returned matching resource from the free list,
/// or calls the create callback if there is none. Returning a lease (explicitly or by dropping
/// it) puts the resource back on the free list of its descriptor for the next matching rent.
///
/// Resources are only ever destroyed through the release callback: by
/// [`clear_unused()`][Self::clear_unused], by [`dispose()`][Self::dispose], or when the pool
/// itself is dropped.
///
/// # Single-threaded Design
///
/// This type is designed for single-threaded use and is neither [`Send`] nor [`Sync`]. Confine
/// each pool to the thread that records and submits rendering commands.
///
/// # Example
///
/// ```rust
/// use lease_pool::{BufferDescriptor, BufferTarget, Pool};
///
/// let pool = Pool::<BufferDescriptor, Vec<u8>>::builder()
///     .create(|descriptor: &BufferDescriptor| {
///         Ok::<_, std::convert::Infallible>(vec![0; descriptor.byte_size().unwrap()])
///     })
///     .release(|_buffer: &Vec<u8>| {})
///     .build()
///     .unwrap();
///
/// let descriptor = BufferDescriptor::new(64, 16, BufferTarget::Structured);
///
/// let first_id = {
///     let lease = pool.rent(descriptor).unwrap();
///     assert_eq!(lease.resource().unwrap().len(), 1024);
///     lease.id()
/// };
///
/// // The returned buffer is reused for the next matching request.
/// let lease = pool.rent(descriptor).unwrap();
/// assert_eq!(lease.id(), first_id);
/// ```
pub struct Pool<D, R> {
    core: Rc<PoolCore<D, R>>,
}

impl<D: Descriptor, R: 'static> Pool<D, R> {
    /// Returns a builder for creating a [`Pool`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use lease_pool::Pool;
    ///
    /// let pool = Pool::<u32, String>::builder()
    ///     .name("labels")
    ///     .create(|id: &u32| Ok::<_, std::convert::Infallible>(format!("label-{id}")))
    ///     .release(|_label: &String| {})
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn builder() -> PoolBuilder<D, R> {
        PoolBuilder::new()
    }
}

impl<D: Descriptor, R> Pool<D, R> {
    pub(crate) fn from_core(core: Rc<PoolCore<D, R>>) -> Self {
        Self { core }
    }

    /// Rents a resource matching `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CreateFailed`][crate::Error::CreateFailed] if no free resource matched
    /// and the create callback failed. The pool state is unchanged in that case.
    pub fn rent(&self, descriptor: D) -> Result<Lease<D, R>> {
        let resource = self.core.rent_raw(descriptor)?;

        Ok(Lease::new(LeaseInner::new(Rc::clone(&self.core), resource)))
    }

    /// Releases every free resource. Resources held by active leases are not affected and
    /// remain valid.
    ///
    /// Returns the number of resources released.
    #[must_use]
    pub fn clear_unused(&self) -> usize {
        self.core.clear_unused()
    }

    /// Releases every resource of the pool, including those held by active leases.
    ///
    /// Active leases report [`Error::ResourceReleased`][crate::Error::ResourceReleased] on
    /// access afterwards. The pool itself remains usable and creates fresh resources on demand.
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

    /// Returns the number of free resources that match `descriptor` exactly.
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

    #[cfg(test)]
    pub(crate) fn core(&self) -> &Rc<PoolCore<D, R>> {
        &self.core
    }
}

impl<D, R> Clone for Pool<D, R> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<D: fmt::Debug, R> fmt::Debug for Pool<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("core", &self.core)
            .finish()
    }
}
