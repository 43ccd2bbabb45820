//! Fixtures for unit tests
//!
//! Chains here run on an in-memory store at a low difficulty so that mining
//! in tests finishes quickly.

pub mod test_utils;

pub use test_utils::*;
