use std::fmt;
use std::num::NonZero;

use crate::{Error, Result};

/// Rounding rule that a [`BatchedPool`][crate::BatchedPool] applies to requested element counts.
///
/// Rounding collapses many slightly different requests onto a small set of free list buckets,
/// trading a bounded amount of over-allocation for fewer distinct resources and fewer calls to
/// the create callback.
///
/// The rounded count of a request is computed as follows:
///
/// 1. The request is raised to at least `base_size`.
/// 2. If `batch_size` is non-zero, the result is rounded up to the next multiple of `batch_size`.
///
/// # Example
///
/// ```rust
/// use std::num::NonZero;
///
/// use lease_pool::BatchPolicy;
///
/// let policy = BatchPolicy::new(NonZero::new(4).unwrap(), 8);
///
/// assert_eq!(policy.batched_count(0).unwrap(), 8);
/// assert_eq!(policy.batched_count(1).unwrap(), 8);
/// assert_eq!(policy.batched_count(8).unwrap(), 8);
/// assert_eq!(policy.batched_count(9).unwrap(), 16);
///
/// // Counts that cannot be rounded without overflowing are rejected.
/// assert!(policy.batched_count(usize::MAX).is_err());
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct BatchPolicy {
    base_size: NonZero<usize>,
    batch_size: usize,
}

impl BatchPolicy {
    /// Creates a policy with the given floor and batch granularity.
    ///
    /// A `batch_size` of zero disables rounding to a multiple; only the floor applies.
    #[must_use]
    pub const fn new(base_size: NonZero<usize>, batch_size: usize) -> Self {
        Self {
            base_size,
            batch_size,
        }
    }

    /// The minimum element count of any resource created under this policy.
    #[must_use]
    pub const fn base_size(&self) -> NonZero<usize> {
        self.base_size
    }

    /// The granularity that element counts are rounded up to, or zero if rounding is disabled.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Returns the element count that a request for `requested` elements is rounded to.
    ///
    /// The result is never smaller than `requested` and never smaller than the base size, so a
    /// request for zero elements still yields a usable resource.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BatchOverflow`] if the rounded count does not fit in `usize`.
    pub fn batched_count(&self, requested: usize) -> Result<usize> {
        let adjusted = requested.max(self.base_size.get());

        if self.batch_size == 0 {
            return Ok(adjusted);
        }

        adjusted
            .checked_next_multiple_of(self.batch_size)
            .ok_or(Error::BatchOverflow { requested })
    }

    /// Returns whether a resource holding `current` elements is exactly what this policy would
    /// allocate for a request of `desired` elements.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BatchOverflow`] if `desired` cannot be rounded.
    pub fn is_satisfied_by(&self, current: usize, desired: usize) -> Result<bool> {
        Ok(current == self.batched_count(desired)?)
    }
}

impl Default for BatchPolicy {
    /// A policy with a base size of 1 and rounding disabled.
    fn default() -> Self {
        Self::new(NonZero::<usize>::MIN, 0)
    }
}

impl fmt::Display for BatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "base {} batch {}", self.base_size, self.batch_size)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn policy(base_size: usize, batch_size: usize) -> BatchPolicy {
        BatchPolicy::new(NonZero::new(base_size).unwrap(), batch_size)
    }

    #[test]
    fn rounds_up_to_batch_multiple() {
        let policy = policy(4, 8);

        assert_eq!(policy.batched_count(1).unwrap(), 8);
        assert_eq!(policy.batched_count(8).unwrap(), 8);
        assert_eq!(policy.batched_count(9).unwrap(), 16);
        assert_eq!(policy.batched_count(16).unwrap(), 16);
        assert_eq!(policy.batched_count(17).unwrap(), 24);
    }

    #[test]
    fn zero_request_floors_to_base() {
        assert_eq!(policy(4, 8).batched_count(0).unwrap(), 8);
        assert_eq!(policy(4, 0).batched_count(0).unwrap(), 4);
        assert_eq!(BatchPolicy::default().batched_count(0).unwrap(), 1);
    }

    #[test]
    fn zero_batch_size_only_applies_floor() {
        let policy = policy(10, 0);

        assert_eq!(policy.batched_count(3).unwrap(), 10);
        assert_eq!(policy.batched_count(10).unwrap(), 10);
        assert_eq!(policy.batched_count(11).unwrap(), 11);
    }

    #[test]
    fn base_larger_than_batch_rounds_the_floor() {
        let policy = policy(20, 8);

        assert_eq!(policy.batched_count(1).unwrap(), 24);
        assert_eq!(policy.batched_count(25).unwrap(), 32);
    }

    #[test]
    fn never_rounds_below_request() {
        let policy = policy(3, 7);

        for requested in 0..200 {
            let rounded = policy.batched_count(requested).unwrap();
            assert!(rounded >= requested);
            assert!(rounded >= 3);
            assert_eq!(rounded % 7, 0);
        }
    }

    #[test]
    fn is_satisfied_by_compares_against_rounded_request() {
        let policy = policy(4, 8);

        assert!(policy.is_satisfied_by(8, 1).unwrap());
        assert!(policy.is_satisfied_by(16, 9).unwrap());
        assert!(!policy.is_satisfied_by(16, 8).unwrap());
        assert!(!policy.is_satisfied_by(9, 9).unwrap());
    }

    #[test]
    fn overflowing_rounding_is_rejected() {
        let policy = policy(1, 8);

        assert!(matches!(
            policy.batched_count(usize::MAX),
            Err(Error::BatchOverflow {
                requested: usize::MAX
            })
        ));
        assert!(matches!(
            policy.batched_count(usize::MAX - 2),
            Err(Error::BatchOverflow { .. })
        ));
        assert!(matches!(
            policy.is_satisfied_by(8, usize::MAX),
            Err(Error::BatchOverflow { .. })
        ));

        // The largest multiple of the batch size still rounds successfully.
        let largest = usize::MAX - usize::MAX % 8;
        assert_eq!(policy.batched_count(largest).unwrap(), largest);
    }

    #[test]
    fn unbatched_policy_never_overflows() {
        assert_eq!(policy(1, 0).batched_count(usize::MAX).unwrap(), usize::MAX);
    }

    #[test]
    fn display_lists_both_settings() {
        assert_eq!(policy(4, 8).to_string(), "base 4 batch 8");
    }
}
