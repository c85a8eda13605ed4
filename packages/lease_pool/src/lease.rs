use std::fmt;
use std::mem;
use std::rc::Rc;

use crate::pool_core::PoolCore;
use crate::{Descriptor, Error, PooledResource, ResourceId, Result};

/// Lifecycle state of a lease.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum LeaseState {
    /// The lease holds its resource and may access it.
    Active,

    /// The resource went back to the pool. This state is terminal.
    Returned,
}

/// State shared by [`Lease`] and [`BatchedLease`][crate::BatchedLease]: the held resource,
/// the pool it goes back to and the lease state machine.
pub(crate) struct LeaseInner<D: Descriptor, R> {
    core: Rc<PoolCore<D, R>>,
    resource: Rc<PooledResource<D, R>>,
    state: LeaseState,
}

impl<D: Descriptor, R> LeaseInner<D, R> {
    pub(crate) fn new(core: Rc<PoolCore<D, R>>, resource: Rc<PooledResource<D, R>>) -> Self {
        Self {
            core,
            resource,
            state: LeaseState::Active,
        }
    }

    pub(crate) fn core(&self) -> &Rc<PoolCore<D, R>> {
        &self.core
    }

    pub(crate) fn state(&self) -> LeaseState {
        self.state
    }

    pub(crate) fn id(&self) -> ResourceId {
        self.resource.id()
    }

    pub(crate) fn descriptor(&self) -> &D {
        self.resource.descriptor()
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.state == LeaseState::Active && !self.resource.is_released()
    }

    pub(crate) fn resource(&self) -> Result<&PooledResource<D, R>> {
        if self.state == LeaseState::Returned {
            return Err(Error::LeaseReturned {
                id: self.resource.id(),
            });
        }

        if self.resource.is_released() {
            return Err(Error::ResourceReleased {
                id: self.resource.id(),
            });
        }

        Ok(&self.resource)
    }

    /// Moves the lease into the terminal state and hands the resource back to the pool.
    ///
    /// Returns `false` if the lease was already returned, or if the pool did not accept the
    /// resource (because `dispose()` already released it).
    pub(crate) fn return_to_pool(&mut self) -> bool {
        if self.state == LeaseState::Returned {
            return false;
        }

        self.state = LeaseState::Returned;
        self.core.return_resource(&self.resource)
    }

    /// Swaps the held resource for `replacement` and returns the previous one.
    ///
    /// The lease state is not affected.
    pub(crate) fn replace_resource(
        &mut self,
        replacement: Rc<PooledResource<D, R>>,
    ) -> Rc<PooledResource<D, R>> {
        mem::replace(&mut self.resource, replacement)
    }
}

impl<D: Descriptor, R> Drop for LeaseInner<D, R> {
    fn drop(&mut self) {
        // Leaving the owning scope is the guaranteed release point of an active lease.
        if self.state == LeaseState::Active {
            self.return_to_pool();
        }
    }
}

impl<D: Descriptor, R> fmt::Debug for LeaseInner<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeaseInner")
            .field("pool", &self.core.name())
            .field("resource", &self.resource)
            .field("state", &self.state)
            .finish()
    }
}

/// Exclusive handle to a resource rented from a [`Pool`][crate::Pool].
///
/// The lease is the only way to reach the rented resource. It returns the resource to its pool
/// either explicitly via [`return_to_pool()`][Self::return_to_pool] or implicitly when the lease
/// is dropped, so the resource is handed back on every exit path of the owning scope.
///
/// After the lease has been returned, any attempt to access the resource fails with
/// [`Error::LeaseReturned`], as the pool may already have handed the resource to someone else.
///
/// # Single-threaded Design
///
/// This type is designed for single-threaded use and is neither [`Send`] nor [`Sync`].
///
/// # Example
///
/// ```rust
/// use lease_pool::{Error, LeaseState, Pool};
///
/// let pool = Pool::<usize, Vec<u32>>::builder()
///     .create(|len: &usize| Ok::<_, std::convert::Infallible>(vec![0; *len]))
///     .release(|_array: &Vec<u32>| {})
///     .build()
///     .unwrap();
///
/// let mut lease = pool.rent(4).unwrap();
/// assert_eq!(lease.resource().unwrap().len(), 4);
///
/// assert!(lease.return_to_pool());
/// assert_eq!(lease.state(), LeaseState::Returned);
///
/// // A second return is reported, not performed.
/// assert!(!lease.return_to_pool());
/// assert!(matches!(lease.resource(), Err(Error::LeaseReturned { .. })));
/// ```
pub struct Lease<D: Descriptor, R> {
    inner: LeaseInner<D, R>,
}

impl<D: Descriptor, R> Lease<D, R> {
    pub(crate) fn new(inner: LeaseInner<D, R>) -> Self {
        Self { inner }
    }

    /// Returns the leased resource.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LeaseReturned`] if the lease has already been returned and
    /// [`Error::ResourceReleased`] if the pool released the resource via `dispose()`.
    pub fn resource(&self) -> Result<&PooledResource<D, R>> {
        self.inner.resource()
    }

    /// Returns the descriptor of the leased resource.
    ///
    /// The descriptor remains readable after the lease is returned; it is not the resource.
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
}

impl<D: Descriptor, R> fmt::Debug for Lease<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease").field("inner", &self.inner).finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::convert::Infallible;

    use static_assertions::assert_not_impl_any;

    use super::*;
    use crate::Pool;

    assert_not_impl_any!(Lease<u32, u32>: Send, Sync);

    fn pool(releases: &Rc<Cell<usize>>) -> Pool<u32, Vec<u8>> {
        let releases = Rc::clone(releases);

        Pool::builder()
            .create(|len: &u32| Ok::<_, Infallible>(vec![0; *len as usize]))
            .release(move |_: &Vec<u8>| releases.set(releases.get() + 1))
            .build()
            .unwrap()
    }

    #[test]
    fn active_lease_exposes_resource() {
        let releases = Rc::default();
        let pool = pool(&releases);

        let lease = pool.rent(3).unwrap();

        assert!(lease.is_valid());
        assert_eq!(lease.state(), LeaseState::Active);
        assert_eq!(lease.resource().unwrap().len(), 3);
        assert_eq!(*lease.descriptor(), 3);
    }

    #[test]
    fn return_transitions_once() {
        let releases = Rc::default();
        let pool = pool(&releases);

        let mut lease = pool.rent(3).unwrap();

        assert!(lease.return_to_pool());
        assert!(!lease.return_to_pool());

        assert!(!lease.is_valid());
        assert_eq!(pool.free_count(&3), 1);
        assert!(matches!(
            lease.resource(),
            Err(Error::LeaseReturned { id }) if id == lease.id()
        ));
    }

    #[test]
    fn drop_returns_active_lease() {
        let releases = Rc::default();
        let pool = pool(&releases);

        {
            let _lease = pool.rent(8).unwrap();
            assert_eq!(pool.reserved_count(), 1);
        }

        assert_eq!(pool.reserved_count(), 0);
        assert_eq!(pool.free_count(&8), 1);
    }

    #[test]
    fn drop_after_explicit_return_does_not_return_again() {
        let releases = Rc::default();
        let pool = pool(&releases);

        let mut lease = pool.rent(8).unwrap();
        assert!(lease.return_to_pool());
        drop(lease);

        assert_eq!(pool.free_count(&8), 1);
        assert_eq!(pool.stats().free, 1);
    }

    #[test]
    fn disposed_resource_is_reported_as_released() {
        let releases = Rc::default();
        let pool = pool(&releases);

        let mut lease = pool.rent(2).unwrap();
        assert_eq!(pool.dispose(), 1);

        assert_eq!(releases.get(), 1);
        assert!(!lease.is_valid());
        assert!(matches!(
            lease.resource(),
            Err(Error::ResourceReleased { .. })
        ));

        // The pool no longer knows the resource, so the return is not accepted.
        assert!(!lease.return_to_pool());
        assert_eq!(lease.state(), LeaseState::Returned);
        assert_eq!(pool.stats().free, 0);
    }

    #[test]
    fn lease_keeps_pool_alive() {
        let releases = Rc::default();
        let pool = pool(&releases);

        let lease = pool.rent(1).unwrap();
        drop(pool);

        assert!(lease.is_valid());
        assert_eq!(releases.get(), 0);

        // Dropping the last lease drops the pool, which releases the now free resource.
        drop(lease);
        assert_eq!(releases.get(), 1);
    }
}
