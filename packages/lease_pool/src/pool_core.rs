use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::fmt;
use std::ptr;
use std::rc::Rc;
use std::result::Result as StdResult;

use foldhash::{HashMap, HashMapExt};
use nm::Event;
use tracing::{debug, trace, warn};

use crate::metrics::{CREATES, REJECTED_RETURNS, RELEASES, RENTS, RETURNS};
use crate::{BoxError, Descriptor, Error, PoolStats, PooledResource, ResourceId, Result};

pub(crate) type CreateFn<D, R> = Box<dyn FnMut(&D) -> StdResult<R, BoxError>>;
pub(crate) type ReleaseFn<R> = Box<dyn FnMut(&R)>;

type Shared<D, R> = Rc<PooledResource<D, R>>;

/// The engine shared by every pool flavor and by the leases handed out from it.
///
/// Callbacks are stored apart from the bookkeeping state and are only invoked while no borrow
/// of the state is held, so a callback may freely inspect the pool it belongs to. A callback
/// that recursively triggers itself (e.g. a create callback that rents from the same pool)
/// panics on the callback borrow.
pub(crate) struct PoolCore<D, R> {
    name: &'static str,
    state: RefCell<PoolState<D, R>>,
    create: RefCell<CreateFn<D, R>>,
    release: RefCell<ReleaseFn<R>>,
}

struct PoolState<D, R> {
    /// Resources available for reuse, LIFO within each descriptor bucket.
    /// We use foldhash for better performance with small hash tables.
    free: HashMap<D, Vec<Shared<D, R>>>,

    /// Resources currently held by a lease.
    reserved: HashMap<ResourceId, Shared<D, R>>,

    next_id: u64,

    created: u64,
    reused: u64,
    released: u64,
}

impl<D: Descriptor, R> PoolCore<D, R> {
    pub(crate) fn new(name: &'static str, create: CreateFn<D, R>, release: ReleaseFn<R>) -> Self {
        debug!(pool = name, "pool created");

        Self {
            name,
            state: RefCell::new(PoolState {
                free: HashMap::new(),
                reserved: HashMap::new(),
                next_id: 0,
                created: 0,
                reused: 0,
                released: 0,
            }),
            create: RefCell::new(create),
            release: RefCell::new(release),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    /// Takes a resource matching `descriptor` from the free list or creates a new one, and
    /// moves it into the reserved set.
    ///
    /// This is the unwrapped rent path; wrapping the result into a lease is up to the caller.
    pub(crate) fn rent_raw(&self, descriptor: D) -> Result<Shared<D, R>> {
        let recycled = self.state.borrow_mut().pop_free(&descriptor);

        let resource = match recycled {
            Some(resource) => {
                trace!(pool = self.name, id = %resource.id(), ?descriptor, "reusing free resource");
                resource
            }
            None => self.create_resource(descriptor)?,
        };

        let previous = self
            .state
            .borrow_mut()
            .reserved
            .insert(resource.id(), Rc::clone(&resource));
        debug_assert!(
            previous.is_none(),
            "resource {} was reserved twice - free list and reserved set overlap",
            resource.id()
        );

        RENTS.with(Event::observe_once);

        Ok(resource)
    }

    fn create_resource(&self, descriptor: D) -> Result<Shared<D, R>> {
        let created = {
            let mut create = self.create.borrow_mut();
            create(&descriptor)
        };

        let value = created.map_err(|source| Error::CreateFailed {
            descriptor: format!("{descriptor:?}"),
            source,
        })?;

        let id = {
            let mut state = self.state.borrow_mut();
            state.created = state.created.saturating_add(1);
            state.allocate_id()
        };

        CREATES.with(Event::observe_once);
        trace!(pool = self.name, %id, ?descriptor, "created resource");

        Ok(Rc::new(PooledResource::new(id, descriptor, value)))
    }

    /// Moves a reserved resource back onto the free list of its descriptor.
    ///
    /// Returns `false` without changing anything if the resource is not currently reserved by
    /// this pool, which covers double returns, resources released by `dispose()` and resources
    /// that belong to a different pool.
    pub(crate) fn return_resource(&self, resource: &PooledResource<D, R>) -> bool {
        let mut state = self.state.borrow_mut();

        let removed = match state.reserved.entry(resource.id()) {
            // Identifiers are only unique per pool, so the pointer comparison is what proves
            // that this is our resource and not a namesake from another pool.
            Entry::Occupied(entry) if ptr::eq(Rc::as_ptr(entry.get()), resource) => {
                Some(entry.remove())
            }
            _ => None,
        };

        let Some(entry) = removed else {
            drop(state);

            if resource.is_released() {
                debug!(
                    pool = self.name,
                    id = %resource.id(),
                    "ignoring return of released resource"
                );
            } else {
                warn!(
                    pool = self.name,
                    id = %resource.id(),
                    "ignoring return of resource not reserved by this pool"
                );
            }

            REJECTED_RETURNS.with(Event::observe_once);
            return false;
        };

        trace!(pool = self.name, id = %entry.id(), "resource returned");

        state
            .free
            .entry(entry.descriptor().clone())
            .or_default()
            .push(entry);

        RETURNS.with(Event::observe_once);

        true
    }

    /// Releases every resource on the free lists. Reserved resources are not touched.
    ///
    /// Returns the number of resources released.
    pub(crate) fn clear_unused(&self) -> usize {
        let unused = self.state.borrow_mut().drain_free();

        let released = self.release_all(unused);

        debug!(pool = self.name, released, "cleared unused resources");

        released
    }

    /// Releases every resource the pool knows about, both free and reserved.
    ///
    /// Leases that still hold a released resource report [`Error::ResourceReleased`] on access.
    ///
    /// Returns the number of resources released.
    pub(crate) fn dispose(&self) -> usize {
        let all = {
            let mut state = self.state.borrow_mut();

            let mut all = state.drain_free();
            all.extend(state.reserved.drain().map(|(_, resource)| resource));
            all
        };

        let released = self.release_all(all);

        debug!(pool = self.name, released, "disposed pool");

        released
    }

    fn release_all(&self, resources: Vec<Shared<D, R>>) -> usize {
        let mut released: usize = 0;

        {
            let mut release = self.release.borrow_mut();

            for resource in resources {
                if resource.mark_released() {
                    release(resource.get());
                    released = released.saturating_add(1);
                }
            }
        }

        if released > 0 {
            let mut state = self.state.borrow_mut();
            state.released = state
                .released
                .saturating_add(u64::try_from(released).unwrap_or(u64::MAX));

            RELEASES.with(|e| e.batch(released).observe_once());
        }

        released
    }

    pub(crate) fn stats(&self) -> PoolStats {
        self.state.borrow().stats()
    }

    pub(crate) fn free_count(&self, descriptor: &D) -> usize {
        self.state.borrow().free.get(descriptor).map_or(0, Vec::len)
    }

    pub(crate) fn reserved_count(&self) -> usize {
        self.state.borrow().reserved.len()
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(test)]
    pub(crate) fn is_free(&self, id: ResourceId) -> bool {
        self.state
            .borrow()
            .free
            .values()
            .flatten()
            .any(|resource| resource.id() == id)
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(test)]
    pub(crate) fn bucket_count(&self) -> usize {
        self.state.borrow().free.len()
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(test)]
    pub(crate) fn is_reserved(&self, id: ResourceId) -> bool {
        self.state.borrow().reserved.contains_key(&id)
    }
}

impl<D: Descriptor, R> PoolState<D, R> {
    /// Pops the most recently returned resource for `descriptor`.
    ///
    /// A bucket is removed as soon as it runs empty, so `free` only ever holds non-empty
    /// stacks and does not grow with the number of distinct descriptors seen over time.
    fn pop_free(&mut self, descriptor: &D) -> Option<Shared<D, R>> {
        let stack = self.free.get_mut(descriptor)?;
        let resource = stack.pop()?;

        if stack.is_empty() {
            self.free.remove(descriptor);
        }

        self.reused = self.reused.saturating_add(1);
        Some(resource)
    }

    fn drain_free(&mut self) -> Vec<Shared<D, R>> {
        self.free.drain().flat_map(|(_, stack)| stack).collect()
    }

    fn allocate_id(&mut self) -> ResourceId {
        let id = ResourceId::new(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .expect("resource identifier space exhausted - a pool cannot create 2^64 resources");
        id
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            free: self.free.values().map(Vec::len).sum(),
            reserved: self.reserved.len(),
            buckets: self.free.len(),
            created: self.created,
            reused: self.reused,
            released: self.released,
        }
    }
}

impl<D, R> Drop for PoolCore<D, R> {
    fn drop(&mut self) {
        // Leases keep the core alive, so normally only free resources remain at this point.
        // They still own native handles and must go through the release callback.
        let state = self.state.get_mut();
        let release = self.release.get_mut();

        let remaining = state
            .free
            .drain()
            .flat_map(|(_, stack)| stack)
            .chain(state.reserved.drain().map(|(_, resource)| resource));

        let mut released: usize = 0;

        for resource in remaining {
            if resource.mark_released() {
                release(resource.get());
                released = released.saturating_add(1);
            }
        }

        if released > 0 {
            RELEASES.with(|e| e.batch(released).observe_once());
        }

        debug!(pool = self.name, released, "pool dropped");
    }
}

impl<D: fmt::Debug, R> fmt::Debug for PoolCore<D, R> {
    #[cfg_attr(test, mutants::skip)] // Diagnostic output only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("PoolCore");
        s.field("name", &self.name);

        match self.state.try_borrow() {
            Ok(state) => s
                .field("free", &state.free.values().map(Vec::len).sum::<usize>())
                .field("reserved", &state.reserved.len()),
            Err(_) => s.field("state", &"<borrowed>"),
        };

        s.finish_non_exhaustive()
    }
}
