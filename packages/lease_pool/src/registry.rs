use std::any::{Any, TypeId, type_name};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use hash_hasher::HashedMap;
use tracing::debug;

use crate::{Descriptor, Error, Lease, Pool, Result};

thread_local! {
    static CURRENT: PoolRegistry = PoolRegistry::new();
}

/// A registry holding at most one [`Pool`] per combination of descriptor and resource type.
///
/// Render code often needs "the" pool for some resource type without threading a pool handle
/// through every call site. The registry provides exactly that, while keeping the wiring
/// explicit: pools are registered with their callbacks up front (or lazily via
/// [`get_or_register_with()`][Self::get_or_register_with]) and looked up by type.
///
/// This type is a cloneable handle to a shared registry. Pools are single-threaded, so each
/// thread has its own default registry, available via [`current()`][Self::current]. Code that
/// prefers dependency injection can create and pass around its own instances instead.
///
/// # Example
///
/// ```rust
/// use lease_pool::{Pool, PoolRegistry, TextureDescriptor, TextureFormat};
///
/// struct Texture {
///     pixels: Vec<u8>,
/// }
///
/// let registry = PoolRegistry::new();
///
/// registry.register(
///     Pool::<TextureDescriptor, Texture>::builder()
///         .create(|descriptor: &TextureDescriptor| {
///             let len = (descriptor.width * descriptor.height * 4) as usize;
///             Ok::<_, std::convert::Infallible>(Texture { pixels: vec![0; len] })
///         })
///         .release(|_texture: &Texture| {})
///         .build()
///         .unwrap(),
/// );
///
/// let lease = registry
///     .rent::<TextureDescriptor, Texture>(TextureDescriptor::new(2, 2, TextureFormat::Rgba8Unorm))
///     .unwrap();
///
/// assert_eq!(lease.resource().unwrap().pixels.len(), 16);
/// ```
#[derive(Clone)]
pub struct PoolRegistry {
    core: Rc<RegistryCore>,
}

struct RegistryCore {
    // This is a transparent HashMap, meaning it does not do any hashing.
    // The reason is that the TypeId is already a hash, so hashing it again is redundant.
    pools: RefCell<HashedMap<TypeId, Box<dyn ErasedPool>>>,
}

impl PoolRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: Rc::new(RegistryCore {
                pools: RefCell::new(HashedMap::default()),
            }),
        }
    }

    /// Returns the default registry of the current thread.
    ///
    /// The registry is created on first use and lives until the thread exits, at which point
    /// the pools it still holds release their free resources.
    #[must_use]
    pub fn current() -> Self {
        CURRENT.with(Clone::clone)
    }

    /// Registers `pool` as the pool for descriptor type `D` and resource type `R`.
    ///
    /// Returns the previously registered pool for the same types, if any. The previous pool is
    /// not disposed; it keeps working for whoever still holds a handle or lease to it.
    pub fn register<D: Descriptor, R: 'static>(&self, pool: Pool<D, R>) -> Option<Pool<D, R>> {
        debug!(
            descriptor = type_name::<D>(),
            resource = type_name::<R>(),
            pool = pool.name(),
            "registering pool"
        );

        let previous = self
            .core
            .pools
            .borrow_mut()
            .insert(key::<D, R>(), Box::new(pool))?;

        previous.as_any().downcast_ref::<Pool<D, R>>().cloned()
    }

    /// Returns the pool registered for descriptor type `D` and resource type `R`, if any.
    #[must_use]
    pub fn get<D: Descriptor, R: 'static>(&self) -> Option<Pool<D, R>> {
        let pools = self.core.pools.borrow();

        pools.get(&key::<D, R>()).map(|erased| {
            erased
                .as_any()
                .downcast_ref::<Pool<D, R>>()
                .expect("guarded by TypeId")
                .clone()
        })
    }

    /// Returns the pool registered for `D` and `R`, registering the pool returned by `init` if
    /// there is none yet.
    ///
    /// `init` runs without any registry borrow held, so it may itself use the registry.
    ///
    /// # Errors
    ///
    /// Returns whatever error `init` returns, typically from
    /// [`PoolBuilder::build()`][crate::PoolBuilder::build]. Nothing is registered in that case.
    pub fn get_or_register_with<D, R, F>(&self, init: F) -> Result<Pool<D, R>>
    where
        D: Descriptor,
        R: 'static,
        F: FnOnce() -> Result<Pool<D, R>>,
    {
        if let Some(pool) = self.get::<D, R>() {
            return Ok(pool);
        }

        let pool = init()?;

        // `init` may have registered a pool for the same types. The first one wins.
        if let Some(existing) = self.get::<D, R>() {
            return Ok(existing);
        }

        self.register(pool.clone());
        Ok(pool)
    }

    /// Rents a resource from the pool registered for `D` and `R`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolNotRegistered`] if no such pool is registered, or any error of
    /// [`Pool::rent()`].
    pub fn rent<D: Descriptor, R: 'static>(&self, descriptor: D) -> Result<Lease<D, R>> {
        self.registered::<D, R>()?.rent(descriptor)
    }

    /// Calls [`Pool::clear_unused()`] on the pool registered for `D` and `R`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolNotRegistered`] if no such pool is registered.
    pub fn clear_unused<D: Descriptor, R: 'static>(&self) -> Result<usize> {
        Ok(self.registered::<D, R>()?.clear_unused())
    }

    /// Calls [`Pool::dispose()`] on the pool registered for `D` and `R`.
    ///
    /// The pool stays registered and recreates resources on demand.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolNotRegistered`] if no such pool is registered.
    pub fn dispose<D: Descriptor, R: 'static>(&self) -> Result<usize> {
        Ok(self.registered::<D, R>()?.dispose())
    }

    /// Calls `clear_unused()` on every registered pool and returns the total number of
    /// resources released.
    pub fn clear_unused_all(&self) -> usize {
        self.snapshot()
            .iter()
            .map(|pool| pool.clear_unused())
            .fold(0, usize::saturating_add)
    }

    /// Calls `dispose()` on every registered pool and returns the total number of resources
    /// released.
    pub fn dispose_all(&self) -> usize {
        self.snapshot()
            .iter()
            .map(|pool| pool.dispose())
            .fold(0, usize::saturating_add)
    }

    /// Returns the number of registered pools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.pools.borrow().len()
    }

    /// Returns whether no pool is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.pools.borrow().is_empty()
    }

    fn registered<D: Descriptor, R: 'static>(&self) -> Result<Pool<D, R>> {
        self.get::<D, R>().ok_or(Error::PoolNotRegistered {
            descriptor_type: type_name::<D>(),
            resource_type: type_name::<R>(),
        })
    }

    /// Clones out every registered pool so that callbacks triggered by bulk operations run
    /// without the registry borrowed.
    fn snapshot(&self) -> Vec<Box<dyn ErasedPool>> {
        self.core
            .pools
            .borrow()
            .values()
            .map(|pool| pool.clone_boxed())
            .collect()
    }
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("pools", &self.core.pools)
            .finish()
    }
}

fn key<D: 'static, R: 'static>() -> TypeId {
    TypeId::of::<(D, R)>()
}

/// A type-erased pool for which we do not know the descriptor and resource types any more.
///
/// We downcast from this to the concrete pool when a caller asks for specific types.
trait ErasedPool: fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn clone_boxed(&self) -> Box<dyn ErasedPool>;
    fn clear_unused(&self) -> usize;
    fn dispose(&self) -> usize;
}

impl<D: Descriptor, R: 'static> ErasedPool for Pool<D, R> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_boxed(&self) -> Box<dyn ErasedPool> {
        Box::new(self.clone())
    }

    fn clear_unused(&self) -> usize {
        Self::clear_unused(self)
    }

    fn dispose(&self) -> usize {
        Self::dispose(self)
    }
}
