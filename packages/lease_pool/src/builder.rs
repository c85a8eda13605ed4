use std::any::type_name;
use std::fmt;
use std::rc::Rc;
use std::result::Result as StdResult;

use crate::pool_core::{CreateFn, PoolCore, ReleaseFn};
use crate::{BoxError, Descriptor, Error, Pool, Result};

/// Builder for creating an instance of [`Pool`].
///
/// Both the create and the release callback are mandatory. A pool has no other way to obtain or
/// dispose of resources, so a missing callback is reported by [`build()`][Self::build] instead
/// of surfacing on first use.
///
/// # Examples
///
/// ```
/// use lease_pool::{ArrayDescriptor, Pool};
///
/// let pool = Pool::<ArrayDescriptor, Vec<f32>>::builder()
///     .name("scratch_arrays")
///     .create(|descriptor: &ArrayDescriptor| {
///         Ok::<_, std::convert::Infallible>(vec![0.0; descriptor.length])
///     })
///     .release(|_array: &Vec<f32>| {})
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.name(), "scratch_arrays");
/// ```
#[must_use]
pub struct PoolBuilder<D, R> {
    name: &'static str,
    create: Option<CreateFn<D, R>>,
    release: Option<ReleaseFn<R>>,
}

impl<D: Descriptor, R: 'static> PoolBuilder<D, R> {
    pub(crate) fn new() -> Self {
        Self {
            name: type_name::<R>(),
            create: None,
            release: None,
        }
    }

    /// Sets the name the pool uses to identify itself in log events.
    ///
    /// Defaults to the type name of the resource.
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Sets the callback that creates a new resource for a descriptor.
    ///
    /// The pool calls this whenever no free resource matches a requested descriptor. An error
    /// returned by the callback fails the rent operation that triggered it; the pool never
    /// retries on its own.
    pub fn create<F, E>(mut self, mut create: F) -> Self
    where
        F: FnMut(&D) -> StdResult<R, E> + 'static,
        E: Into<BoxError>,
    {
        self.create = Some(Box::new(move |descriptor: &D| -> StdResult<R, BoxError> {
            create(descriptor).map_err(Into::into)
        }));
        self
    }

    /// Sets the callback that permanently frees the native resource behind a pooled value.
    ///
    /// The pool calls this exactly once per resource, from `clear_unused()`, `dispose()` or
    /// when the pool itself is dropped.
    pub fn release<F>(mut self, release: F) -> Self
    where
        F: FnMut(&R) + 'static,
    {
        self.release = Some(Box::new(release));
        self
    }

    /// Builds the pool with the specified configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCallback`] if either the create or the release callback is
    /// missing.
    pub fn build(self) -> Result<Pool<D, R>> {
        Ok(Pool::from_core(Rc::new(self.build_core()?)))
    }

    pub(crate) fn build_core(self) -> Result<PoolCore<D, R>> {
        let Some(create) = self.create else {
            return Err(Error::MissingCallback { callback: "create" });
        };
        let Some(release) = self.release else {
            return Err(Error::MissingCallback {
                callback: "release",
            });
        };

        Ok(PoolCore::new(self.name, create, release))
    }
}

impl<D, R> fmt::Debug for PoolBuilder<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("name", &self.name)
            .field("create", &self.create.is_some())
            .field("release", &self.release.is_some())
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::convert::Infallible;

    use super::*;

    #[test]
    fn missing_create_is_rejected() {
        let result = Pool::<u32, u32>::builder()
            .release(|_: &u32| {})
            .build();

        assert!(matches!(
            result,
            Err(Error::MissingCallback { callback: "create" })
        ));
    }

    #[test]
    fn missing_release_is_rejected() {
        let result = Pool::<u32, u32>::builder()
            .create(|descriptor: &u32| Ok::<_, Infallible>(*descriptor))
            .build();

        assert!(matches!(
            result,
            Err(Error::MissingCallback {
                callback: "release"
            })
        ));
    }

    #[test]
    fn default_name_is_resource_type() {
        let pool = Pool::<u32, Vec<u8>>::builder()
            .create(|_: &u32| Ok::<_, Infallible>(Vec::new()))
            .release(|_: &Vec<u8>| {})
            .build()
            .unwrap();

        assert_eq!(pool.name(), type_name::<Vec<u8>>());
    }

    #[test]
    fn debug_reports_configured_callbacks() {
        let builder = Pool::<u32, u32>::builder().release(|_: &u32| {});

        let debug = format!("{builder:?}");

        assert!(debug.contains("create: false"));
        assert!(debug.contains("release: true"));
    }
}
