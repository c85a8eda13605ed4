#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for testing and examples in `lease_pool`.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::rc::Rc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use thiserror::Error;

/// Runs a test body on a helper thread and fails the test if it takes too long.
///
/// The body gets 10 seconds, or 60 seconds under Miri. Setting `MUTATION_TESTING=1` runs the
/// body directly so that mutation testing can observe hangs itself.
///
/// # Panics
///
/// Panics if the body panics or exceeds the timeout.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let sum = with_watchdog(|| 2 + 2);
/// assert_eq!(sum, 4);
/// ```
pub fn with_watchdog<F, T>(body: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return body();
    }

    let (tx, rx) = mpsc::channel();

    let handle = thread::spawn(move || {
        // The receiver is gone if we already timed out.
        drop(tx.send(body()));
    });

    let timeout = if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    };

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            handle.join().expect("test thread should not panic");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test exceeded the {timeout:?} timeout");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match handle.join() {
            Ok(()) => panic!("test thread disconnected without a result"),
            Err(payload) => std::panic::resume_unwind(payload),
        },
    }
}

/// The error a [`FakeFactory`] returns when a create failure was injected.
#[derive(Debug, Error)]
#[error("injected failure creating a resource for {descriptor}")]
#[non_exhaustive]
pub struct FakeCreateError {
    /// Debug rendering of the descriptor the resource was requested for.
    pub descriptor: String,
}

/// A stand-in for a native resource, produced by [`FakeFactory`].
#[derive(Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct FakeResource<D> {
    /// Unique per factory, assigned in creation order starting from 0.
    pub serial: u64,

    /// The descriptor the resource was created for.
    pub descriptor: D,
}

/// Creates and releases [`FakeResource`]s while keeping a ledger of what happened.
///
/// Plug [`creator()`][Self::creator] and [`releaser()`][Self::releaser] into a pool builder,
/// then assert on the ledger. The factory is a cloneable handle; clones share the ledger.
///
/// Releasing the same resource twice panics immediately, as that would be a double free of a
/// real native resource.
#[derive(Debug)]
pub struct FakeFactory<D> {
    ledger: Rc<RefCell<Ledger<D>>>,
}

#[derive(Debug)]
struct Ledger<D> {
    next_serial: u64,

    /// Descriptor of every created resource, by serial.
    created: BTreeMap<u64, D>,

    /// Serials in release order.
    released: Vec<u64>,

    /// While positive, create calls fail and decrement this.
    failures_pending: usize,
}

impl<D: Clone + Debug + 'static> FakeFactory<D> {
    /// Creates a factory with an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ledger: Rc::new(RefCell::new(Ledger {
                next_serial: 0,
                created: BTreeMap::new(),
                released: Vec::new(),
                failures_pending: 0,
            })),
        }
    }

    /// Returns a create callback bound to this factory.
    pub fn creator(&self) -> impl FnMut(&D) -> Result<FakeResource<D>, FakeCreateError> + 'static {
        let ledger = Rc::clone(&self.ledger);

        move |descriptor: &D| {
            let mut ledger = ledger.borrow_mut();

            if ledger.failures_pending > 0 {
                ledger.failures_pending = ledger.failures_pending.saturating_sub(1);

                return Err(FakeCreateError {
                    descriptor: format!("{descriptor:?}"),
                });
            }

            let serial = ledger.next_serial;
            ledger.next_serial = serial.checked_add(1).expect("serials do not run out");
            ledger.created.insert(serial, descriptor.clone());

            Ok(FakeResource {
                serial,
                descriptor: descriptor.clone(),
            })
        }
    }

    /// Returns a release callback bound to this factory.
    ///
    /// # Panics
    ///
    /// The callback panics if it is handed a resource it has already released or one this
    /// factory never created.
    pub fn releaser(&self) -> impl FnMut(&FakeResource<D>) + 'static {
        let ledger = Rc::clone(&self.ledger);

        move |resource: &FakeResource<D>| {
            let mut ledger = ledger.borrow_mut();

            assert!(
                ledger.created.contains_key(&resource.serial),
                "released resource #{} that this factory never created",
                resource.serial
            );
            assert!(
                !ledger.released.contains(&resource.serial),
                "resource #{} released twice",
                resource.serial
            );

            ledger.released.push(resource.serial);
        }
    }

    /// Makes the next `count` create calls fail with [`FakeCreateError`].
    pub fn fail_next(&self, count: usize) {
        self.ledger.borrow_mut().failures_pending = count;
    }

    /// Returns the number of resources created so far.
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.ledger.borrow().created.len()
    }

    /// Returns the number of resources released so far.
    #[must_use]
    pub fn released_count(&self) -> usize {
        self.ledger.borrow().released.len()
    }

    /// Returns the number of created resources that have not been released.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.created_count().saturating_sub(self.released_count())
    }

    /// Returns the serials of released resources in release order.
    #[must_use]
    pub fn released_serials(&self) -> Vec<u64> {
        self.ledger.borrow().released.clone()
    }

    /// Returns the descriptors of all created resources in creation order.
    #[must_use]
    pub fn created_descriptors(&self) -> Vec<D> {
        self.ledger.borrow().created.values().cloned().collect()
    }

    /// Returns whether the resource with `serial` has been released.
    #[must_use]
    pub fn is_released(&self, serial: u64) -> bool {
        self.ledger.borrow().released.contains(&serial)
    }

    /// Asserts that every resource this factory created has been released.
    ///
    /// # Panics
    ///
    /// Panics if any created resource is still live.
    pub fn assert_all_released(&self) {
        let ledger = self.ledger.borrow();

        let leaked: Vec<u64> = ledger
            .created
            .keys()
            .filter(|serial| !ledger.released.contains(serial))
            .copied()
            .collect();

        assert!(leaked.is_empty(), "resources never released: {leaked:?}");
    }
}

impl<D: Clone + Debug + 'static> Default for FakeFactory<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for FakeFactory<D> {
    fn clone(&self) -> Self {
        Self {
            ledger: Rc::clone(&self.ledger),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn watchdog_returns_body_result() {
        assert_eq!(with_watchdog(|| "done"), "done");
    }

    #[test]
    fn factory_tracks_lifecycle() {
        let factory = FakeFactory::<u32>::new();
        let mut create = factory.creator();
        let mut release = factory.releaser();

        let a = create(&7).unwrap();
        let b = create(&9).unwrap();
        assert_eq!((a.serial, b.serial), (0, 1));
        assert_eq!(factory.live_count(), 2);

        release(&b);
        assert!(factory.is_released(1));
        release(&a);

        assert_eq!(factory.released_serials(), vec![1, 0]);
        assert_eq!(factory.created_descriptors(), vec![7, 9]);
        factory.assert_all_released();
    }

    #[test]
    fn injected_failures_are_consumed() {
        let factory = FakeFactory::<u32>::new();
        let mut create = factory.creator();

        factory.fail_next(1);

        assert!(create(&1).is_err());
        assert!(create(&1).is_ok());
        assert_eq!(factory.created_count(), 1);
    }

    #[test]
    #[should_panic(expected = "released twice")]
    fn double_release_panics() {
        let factory = FakeFactory::<u32>::new();
        let resource = factory.creator()(&1).unwrap();
        let mut release = factory.releaser();

        release(&resource);
        release(&resource);
    }

    #[test]
    #[should_panic(expected = "resources never released")]
    fn leak_is_detected() {
        let factory = FakeFactory::<u32>::new();
        let _resource = factory.creator()(&1).unwrap();

        factory.assert_all_released();
    }
}
