use std::fmt::Debug;
use std::hash::Hash;

/// A value that identifies a resource configuration and acts as the key of a pool's free lists.
///
/// Two descriptors that would make the create callback produce interchangeable resources must
/// compare equal and hash identically. Any deviation either fragments the pool (equivalent
/// resources land in different buckets) or, far worse, hands out an incompatible resource
/// (different configurations land in the same bucket).
///
/// This trait is implemented for every type that satisfies its bounds.
///
/// # Example
///
/// ```rust
/// use lease_pool::Descriptor;
///
/// #[derive(Clone, Debug, Eq, Hash, PartialEq)]
/// struct ShadowMapDescriptor {
///     resolution: u32,
///     cascades: u8,
/// }
///
/// fn assert_descriptor<D: Descriptor>() {}
/// assert_descriptor::<ShadowMapDescriptor>();
/// ```
pub trait Descriptor: Clone + Eq + Hash + Debug + 'static {}

impl<T> Descriptor for T where T: Clone + Eq + Hash + Debug + 'static {}

/// A [`Descriptor`] with an element count that a [`BatchedPool`][crate::BatchedPool] may round
/// up to a batch granularity.
///
/// Rounding never mutates an existing descriptor. The pool asks for a new value via
/// [`with_count()`][Self::with_count] and uses that value as the free list key.
///
/// # Example
///
/// ```rust
/// use lease_pool::BatchedDescriptor;
///
/// #[derive(Clone, Debug, Eq, Hash, PartialEq)]
/// struct InstanceBufferDescriptor {
///     instances: usize,
/// }
///
/// impl BatchedDescriptor for InstanceBufferDescriptor {
///     fn count(&self) -> usize {
///         self.instances
///     }
///
///     fn with_count(&self, count: usize) -> Self {
///         Self { instances: count }
///     }
/// }
///
/// let requested = InstanceBufferDescriptor { instances: 3 };
/// let rounded = requested.with_count(16);
///
/// assert_eq!(requested.count(), 3);
/// assert_eq!(rounded.count(), 16);
/// ```
pub trait BatchedDescriptor: Descriptor {
    /// Returns the number of elements the described resource holds.
    fn count(&self) -> usize;

    /// Returns a copy of this descriptor with the element count replaced by `count`.
    ///
    /// All other fields must be carried over unchanged.
    #[must_use]
    fn with_count(&self, count: usize) -> Self;
}
