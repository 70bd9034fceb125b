//! Registered test cases

pub mod hammer;

use crate::case::CaseDescriptor;

/// Every case known to the suite, in run order
pub fn registry() -> Vec<CaseDescriptor> {
    hammer::CASES.to_vec()
}
