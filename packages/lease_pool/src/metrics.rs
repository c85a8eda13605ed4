//! Metrics for pool activity.
//!
//! Pools are confined to one thread, so every event is a thread-local `nm` event.

use nm::{Event, Magnitude};

/// Histogram buckets for the number of elements added to a request by batch rounding.
///
/// Most policies use batch sizes in the tens to hundreds, so anything beyond a few thousand
/// suggests a policy that wastes memory.
const BATCH_OVERALLOCATION_BUCKETS: &[Magnitude] = &[0, 1, 4, 16, 64, 256, 1024, 4096, 16384];

thread_local! {
    /// A lease was handed out, whether from a free list or freshly created.
    pub(crate) static RENTS: Event = Event::builder()
        .name("lease_pool_rents")
        .build();

    /// The create callback was invoked because no matching free resource existed.
    pub(crate) static CREATES: Event = Event::builder()
        .name("lease_pool_creates")
        .build();

    /// A leased resource was accepted back onto a free list.
    pub(crate) static RETURNS: Event = Event::builder()
        .name("lease_pool_returns")
        .build();

    /// A return was rejected because the resource was not reserved by the pool.
    pub(crate) static REJECTED_RETURNS: Event = Event::builder()
        .name("lease_pool_rejected_returns")
        .build();

    /// The release callback was invoked for a resource.
    pub(crate) static RELEASES: Event = Event::builder()
        .name("lease_pool_releases")
        .build();

    /// Number of elements that batch rounding added on top of a request.
    pub(crate) static BATCH_OVERALLOCATION: Event = Event::builder()
        .name("lease_pool_batch_overallocation")
        .histogram(BATCH_OVERALLOCATION_BUCKETS)
        .build();
}
