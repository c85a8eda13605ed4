use std::error::Error as StdError;
use std::result::Result as StdResult;

use thiserror::Error;

use crate::ResourceId;

/// Boxed error produced by a caller-supplied create callback.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors that can occur when configuring pools or working with leased resources.
///
/// Recoverable conditions such as returning a lease twice are not errors; they are reported
/// as `false` results by the operations that detect them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A pool was built without one of its mandatory callbacks.
    #[error("pool cannot be built without a '{callback}' callback")]
    MissingCallback {
        /// Name of the callback that was not provided (`create` or `release`).
        callback: &'static str,
    },

    /// The create callback failed to produce a resource for a descriptor.
    #[error("failed to create resource for descriptor {descriptor}")]
    CreateFailed {
        /// Debug rendering of the descriptor that was being created.
        descriptor: String,

        /// The error returned by the create callback.
        #[source]
        source: BoxError,
    },

    /// The resource of a lease was accessed after the lease was returned to its pool.
    ///
    /// The resource may already be leased to someone else, so this access is never tolerated.
    #[error("lease of resource {id} was already returned to the pool")]
    LeaseReturned {
        /// Identifier of the resource that the lease used to hold.
        id: ResourceId,
    },

    /// The resource of an active lease was released by the pool (via `dispose()`).
    #[error("resource {id} was released by its pool while still leased")]
    ResourceReleased {
        /// Identifier of the released resource.
        id: ResourceId,
    },

    /// A registry operation referenced a pool type that was never registered.
    #[error("no pool is registered for descriptor {descriptor_type} and resource {resource_type}")]
    PoolNotRegistered {
        /// Name of the descriptor type.
        descriptor_type: &'static str,

        /// Name of the resource type.
        resource_type: &'static str,
    },

    /// A requested element count cannot be rounded by the batching policy without overflowing
    /// `usize`.
    #[error("requested element count {requested} overflows when rounded to a whole batch")]
    BatchOverflow {
        /// The element count that was requested.
        requested: usize,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = StdResult<T, Error>;
