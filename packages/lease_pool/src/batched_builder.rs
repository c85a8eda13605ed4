use std::any::type_name;
use std::fmt;
use std::num::NonZero;
use std::rc::Rc;
use std::result::Result as StdResult;

use crate::{BatchPolicy, BatchedDescriptor, BatchedPool, BoxError, PoolBuilder, Result};

/// Builder for creating an instance of [`BatchedPool`].
///
/// In addition to the callbacks required by every pool, this sets up the [`BatchPolicy`]. Both
/// policy settings are optional: the default base size is 1 and batching is disabled (batch
/// size 0) unless configured.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use lease_pool::{BatchPolicy, BatchedPool, BufferDescriptor};
///
/// let pool = BatchedPool::<BufferDescriptor, Vec<u8>>::builder()
///     .policy(BatchPolicy::new(NonZero::new(16).unwrap(), 64))
///     .create(|descriptor: &BufferDescriptor| {
///         Ok::<_, std::convert::Infallible>(vec![0; descriptor.byte_size().unwrap()])
///     })
///     .release(|_buffer: &Vec<u8>| {})
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.batched_count(65).unwrap(), 128);
/// ```
#[must_use]
pub struct BatchedPoolBuilder<D, R> {
    inner: PoolBuilder<D, R>,
    policy: BatchPolicy,
}

impl<D: BatchedDescriptor, R: 'static> BatchedPoolBuilder<D, R> {
    pub(crate) fn new() -> Self {
        Self {
            inner: PoolBuilder::new(),
            policy: BatchPolicy::default(),
        }
    }

    /// Sets the name the pool uses to identify itself in log events.
    pub fn name(mut self, name: &'static str) -> Self {
        self.inner = self.inner.name(name);
        self
    }

    /// Sets the callback that creates a new resource for a (rounded) descriptor.
    pub fn create<F, E>(mut self, create: F) -> Self
    where
        F: FnMut(&D) -> StdResult<R, E> + 'static,
        E: Into<BoxError>,
    {
        self.inner = self.inner.create(create);
        self
    }

    /// Sets the callback that permanently frees the native resource behind a pooled value.
    pub fn release<F>(mut self, release: F) -> Self
    where
        F: FnMut(&R) + 'static,
    {
        self.inner = self.inner.release(release);
        self
    }

    /// Sets the minimum element count of any resource the pool creates.
    pub fn base_size(mut self, base_size: NonZero<usize>) -> Self {
        self.policy = BatchPolicy::new(base_size, self.policy.batch_size());
        self
    }

    /// Sets the granularity element counts are rounded up to. Zero disables rounding.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.policy = BatchPolicy::new(self.policy.base_size(), batch_size);
        self
    }

    /// Sets the complete batching policy at once.
    pub fn policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builds the batched pool with the specified configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCallback`][crate::Error::MissingCallback] if either the create or
    /// the release callback is missing.
    pub fn build(self) -> Result<BatchedPool<D, R>> {
        let core = self.inner.build_core()?;

        Ok(BatchedPool::from_parts(Rc::new(core), self.policy))
    }
}

impl<D, R> fmt::Debug for BatchedPoolBuilder<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("inner", &self.inner)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::convert::Infallible;

    use super::*;
    use crate::{ArrayDescriptor, Error};

    #[test]
    fn defaults_to_unbatched_policy() {
        let pool = BatchedPool::<ArrayDescriptor, u8>::builder()
            .create(|_: &ArrayDescriptor| Ok::<_, Infallible>(0))
            .release(|_: &u8| {})
            .build()
            .unwrap();

        assert_eq!(pool.policy(), BatchPolicy::default());
        assert_eq!(pool.batched_count(0).unwrap(), 1);
        assert_eq!(pool.batched_count(13).unwrap(), 13);
    }

    #[test]
    fn base_and_batch_size_combine() {
        let pool = BatchedPool::<ArrayDescriptor, u8>::builder()
            .batch_size(8)
            .base_size(NonZero::new(4).unwrap())
            .create(|_: &ArrayDescriptor| Ok::<_, Infallible>(0))
            .release(|_: &u8| {})
            .build()
            .unwrap();

        assert_eq!(pool.policy().base_size().get(), 4);
        assert_eq!(pool.policy().batch_size(), 8);
    }

    #[test]
    fn missing_callbacks_are_rejected() {
        let result = BatchedPool::<ArrayDescriptor, u8>::builder()
            .batch_size(8)
            .build();

        assert!(matches!(result, Err(Error::MissingCallback { .. })));
    }
}
