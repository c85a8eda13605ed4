//! Integration tests for batched pools and self-resizing leases.

use std::num::NonZero;

use lease_pool::{
    Allocator, ArrayDescriptor, BatchPolicy, BatchedPool, BufferDescriptor, BufferTarget, Error,
    LeaseState,
};
use testing::{FakeFactory, FakeResource, with_watchdog};

type FakeBuffer = FakeResource<BufferDescriptor>;

fn buffer_pool(
    factory: &FakeFactory<BufferDescriptor>,
) -> BatchedPool<BufferDescriptor, FakeBuffer> {
    BatchedPool::builder()
        .name("instance buffers")
        .base_size(NonZero::new(4).unwrap())
        .batch_size(8)
        .create(factory.creator())
        .release(factory.releaser())
        .build()
        .unwrap()
}

fn instances(count: usize) -> BufferDescriptor {
    BufferDescriptor::new(count, 64, BufferTarget::Structured)
}

#[test]
fn rounding_is_deterministic() {
    with_watchdog(|| {
        let policy = BatchPolicy::new(NonZero::new(4).unwrap(), 8);

        assert_eq!(policy.batched_count(1).unwrap(), 8);
        assert_eq!(policy.batched_count(8).unwrap(), 8);
        assert_eq!(policy.batched_count(9).unwrap(), 16);
        assert_eq!(policy.batched_count(0).unwrap(), 8);
    });
}

#[test]
fn factory_sees_rounded_descriptors_only() {
    with_watchdog(|| {
        let factory = FakeFactory::new();
        let pool = buffer_pool(&factory);

        let _a = pool.rent(&instances(3)).unwrap();
        let _b = pool.rent(&instances(9)).unwrap();
        let _c = pool.rent(&instances(0)).unwrap();

        let counts: Vec<usize> = factory
            .created_descriptors()
            .iter()
            .map(|descriptor| descriptor.count)
            .collect();

        assert_eq!(counts, vec![8, 16, 8]);
    });
}

#[test]
fn resize_only_replaces_when_needed() {
    with_watchdog(|| {
        let factory = FakeFactory::new();
        let pool = buffer_pool(&factory);

        let mut lease = pool.rent(&instances(5)).unwrap();
        let original = lease.resource().unwrap().serial;

        for desired in [1, 6, 8] {
            assert!(lease.ensure_batch_size(desired).unwrap());
            lease.resize(desired).unwrap();
            assert_eq!(lease.resource().unwrap().serial, original);
        }

        assert!(!lease.ensure_batch_size(12).unwrap());
        lease.resize(12).unwrap();

        assert_ne!(lease.resource().unwrap().serial, original);
        assert_eq!(lease.state(), LeaseState::Active);
        assert_eq!(pool.free_count(&instances(8)), 1);
        assert!(!factory.is_released(original));
    });
}

#[test]
fn resize_grow_and_shrink_round_trip_reuses_instances() {
    with_watchdog(|| {
        let factory = FakeFactory::new();
        let pool = buffer_pool(&factory);

        let mut lease = pool.rent(&instances(2)).unwrap();

        lease.resize(30).unwrap();
        lease.resize(2).unwrap();
        lease.resize(30).unwrap();

        assert_eq!(factory.created_count(), 2);
        assert_eq!(lease.descriptor().count, 32);
        assert_eq!(pool.stats().reused, 2);
    });
}

#[test]
fn failed_resize_keeps_lease_intact() {
    with_watchdog(|| {
        let factory = FakeFactory::new();
        let pool = buffer_pool(&factory);

        let mut lease = pool.rent(&instances(5)).unwrap();
        let original = lease.resource().unwrap().serial;

        factory.fail_next(1);

        assert!(matches!(lease.resize(100), Err(Error::CreateFailed { .. })));
        assert_eq!(lease.resource().unwrap().serial, original);
        assert_eq!(pool.reserved_count(), 1);
        assert_eq!(pool.stats().free, 0);
    });
}

#[test]
fn oversized_requests_fail_without_panicking() {
    with_watchdog(|| {
        let factory = FakeFactory::new();
        let pool = buffer_pool(&factory);

        let huge = BufferDescriptor::new(usize::MAX - 2, 1, BufferTarget::Raw);
        assert!(matches!(pool.rent(&huge), Err(Error::BatchOverflow { .. })));

        let mut lease = pool.rent(&instances(5)).unwrap();
        let original = lease.resource().unwrap().serial;

        assert!(matches!(
            lease.resize(usize::MAX - 2),
            Err(Error::BatchOverflow { .. })
        ));
        assert_eq!(lease.resource().unwrap().serial, original);
        assert_eq!(factory.created_count(), 1);
        assert_eq!(pool.reserved_count(), 1);
    });
}

#[test]
fn policy_change_releases_stale_free_resources() {
    with_watchdog(|| {
        let factory = FakeFactory::new();
        let pool = buffer_pool(&factory);

        drop(pool.rent(&instances(3)).unwrap());
        let mut live = pool.rent(&instances(20)).unwrap();

        let released = pool.set_policy(BatchPolicy::new(NonZero::new(16).unwrap(), 16));

        assert_eq!(released, 1);
        assert_eq!(factory.released_count(), 1);
        assert!(live.is_valid());

        // The live lease is judged against the new policy from now on.
        assert!(!live.ensure_batch_size(20).unwrap());
        live.resize(20).unwrap();
        assert_eq!(live.descriptor().count, 32);
    });
}

#[test]
fn batched_dispose_releases_everything() {
    with_watchdog(|| {
        let factory = FakeFactory::new();
        let pool = buffer_pool(&factory);

        let mut leases: Vec<_> = [1, 9, 17]
            .into_iter()
            .map(|count| pool.rent(&instances(count)).unwrap())
            .collect();
        drop(leases.pop());

        assert_eq!(pool.dispose(), 3);
        factory.assert_all_released();

        let lease = leases.first_mut().unwrap();
        assert!(matches!(
            lease.resize(50),
            Err(Error::ResourceReleased { .. })
        ));
        assert!(!lease.return_to_pool());
    });
}

#[test]
fn unbatched_arrays_keep_requested_length() {
    with_watchdog(|| {
        let factory = FakeFactory::<ArrayDescriptor>::new();

        let pool = BatchedPool::builder()
            .create(factory.creator())
            .release(factory.releaser())
            .build()
            .unwrap();

        let lease = pool
            .rent(&ArrayDescriptor::new(13, Allocator::TempJob))
            .unwrap();

        assert_eq!(lease.descriptor().length, 13);
        assert_eq!(
            lease.resource().unwrap().get().descriptor.allocator,
            Allocator::TempJob
        );
    });
}
