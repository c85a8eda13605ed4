use std::cell::Cell;
use std::fmt;
use std::ops::Deref;

/// Identifies one resource created by a pool.
///
/// Identifiers are assigned in creation order and are unique within the pool that created the
/// resource. They are never reused, not even after the resource is released.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ResourceId(u64);

impl ResourceId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the numeric value of the identifier.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A resource created by a pool, together with the descriptor it was created from.
///
/// The pool hands out shared references to this wrapper through leases. The wrapper outlives
/// the native resource it holds: once the pool passes the resource to its release callback
/// (during `clear_unused()` or `dispose()`), [`is_released()`][Self::is_released] returns
/// `true` and leases refuse to hand it out again.
///
/// The wrapped value is reachable through [`Deref`]. Resources that need mutation while
/// leased (for example a GPU handle with a mutable upload queue) are expected to use interior
/// mutability, as the native handle types of graphics APIs already do.
pub struct PooledResource<D, R> {
    id: ResourceId,
    descriptor: D,
    resource: R,
    released: Cell<bool>,
}

impl<D, R> PooledResource<D, R> {
    pub(crate) fn new(id: ResourceId, descriptor: D, resource: R) -> Self {
        Self {
            id,
            descriptor,
            resource,
            released: Cell::new(false),
        }
    }

    /// Returns the identifier the pool assigned to this resource.
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Returns the descriptor this resource was created from.
    ///
    /// For batched pools this is the rounded descriptor, not the one the caller asked for.
    #[must_use]
    pub fn descriptor(&self) -> &D {
        &self.descriptor
    }

    /// Returns whether the pool has passed this resource to its release callback.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.get()
    }

    /// Returns the wrapped resource.
    #[must_use]
    pub fn get(&self) -> &R {
        &self.resource
    }

    /// Marks the resource as released and returns whether it was still unreleased.
    pub(crate) fn mark_released(&self) -> bool {
        !self.released.replace(true)
    }
}

impl<D, R> Deref for PooledResource<D, R> {
    type Target = R;

    fn deref(&self) -> &Self::Target {
        &self.resource
    }
}

impl<D: fmt::Debug, R> fmt::Debug for PooledResource<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledResource")
            .field("id", &self.id)
            .field("descriptor", &self.descriptor)
            .field("released", &self.released.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_not_impl_any;

    use super::*;

    assert_not_impl_any!(PooledResource<u32, u32>: Sync);

    #[test]
    fn mark_released_reports_first_transition_only() {
        let resource = PooledResource::new(ResourceId::new(3), "desc", vec![1_u8, 2, 3]);

        assert!(!resource.is_released());
        assert!(resource.mark_released());
        assert!(resource.is_released());
        assert!(!resource.mark_released());
    }

    #[test]
    fn deref_reaches_wrapped_value() {
        let resource = PooledResource::new(ResourceId::new(1), 4_usize, vec![7_u8; 4]);

        assert_eq!(resource.len(), 4);
        assert_eq!(resource.get(), &vec![7_u8; 4]);
        assert_eq!(*resource.descriptor(), 4);
        assert_eq!(resource.id().get(), 1);
    }

    #[test]
    fn id_display_is_prefixed() {
        assert_eq!(ResourceId::new(42).to_string(), "#42");
    }
}
