//! Guard-generic test functions shared by the integration tests.
//!
//! Both reclamation strategies must satisfy the same contract, so the
//! actual test bodies live here, generic over `G: Guard`, and the `tests/`
//! directories of the individual crates instantiate them with their guard.

pub mod skip_list_core_tests;

use std::cmp::Ordering;

/// An `f64` measurement with a total order, for driving the list with the
/// kind of values the metrics layer stores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading(pub f64);

impl Eq for Reading {}

impl PartialOrd for Reading {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Reading {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}
