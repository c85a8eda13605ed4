#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! This package provides [`Pool`], a single-threaded pool that leases out exclusively owned,
//! reusable handles to expensive resources such as GPU buffers, textures and native arrays.
//!
//! Resources are keyed by a [`Descriptor`], a small value describing everything that makes two
//! resources interchangeable (size, format, usage flags). Renting a descriptor reuses a free
//! resource with an equal descriptor or creates a new one through a user-supplied callback.
//! Returning the [`Lease`] (explicitly or by dropping it) puts the resource back on the free list.
//!
//! # Batching
//!
//! [`BatchedPool`] additionally rounds the element count of each request according to a
//! [`BatchPolicy`] so that requests of similar size share resources. Its [`BatchedLease`] can
//! grow or shrink in place while staying the same lease.
//!
//! ```rust
//! use std::num::NonZero;
//!
//! use lease_pool::{BatchedPool, BufferDescriptor, BufferTarget};
//!
//! let pool = BatchedPool::<BufferDescriptor, Vec<u8>>::builder()
//!     .base_size(NonZero::new(4).unwrap())
//!     .batch_size(8)
//!     .create(|descriptor: &BufferDescriptor| {
//!         Ok::<_, std::convert::Infallible>(vec![0; descriptor.byte_size().unwrap()])
//!     })
//!     .release(|_buffer: &Vec<u8>| {})
//!     .build()
//!     .unwrap();
//!
//! let mut lease = pool
//!     .rent(&BufferDescriptor::new(5, 4, BufferTarget::Vertex))
//!     .unwrap();
//! assert_eq!(lease.descriptor().count, 8);
//!
//! // The mesh grew; swap in a bigger buffer without giving up the lease.
//! lease.resize(13).unwrap();
//! assert_eq!(lease.descriptor().count, 16);
//! ```
//!
//! # Shared pools
//!
//! [`PoolRegistry`] holds one pool per descriptor and resource type. Each thread has a default
//! registry available via [`PoolRegistry::current()`].
//!
//! # Resource lifetime
//!
//! The pool owns every resource it created. Resources are destroyed only through the release
//! callback: by [`Pool::clear_unused()`] (free resources only), by [`Pool::dispose()`] (all
//! resources, including leased ones) or when the last handle to the pool is dropped.
//!
//! # Observability
//!
//! Pool activity is logged via `tracing` and counted via thread-local `nm` events whose names
//! start with `lease_pool_`.

mod batch_policy;
mod batched_builder;
mod batched_lease;
mod batched_pool;
mod builder;
mod descriptor;
mod descriptors;
mod error;
mod lease;
mod metrics;
mod pool;
mod pool_core;
mod registry;
mod resource;
mod stats;

pub use batch_policy::*;
pub use batched_builder::*;
pub use batched_lease::*;
pub use batched_pool::*;
pub use builder::*;
pub use descriptor::*;
pub use descriptors::*;
pub use error::*;
pub use lease::*;
pub use pool::*;
pub use registry::*;
pub use resource::*;
pub use stats::*;
