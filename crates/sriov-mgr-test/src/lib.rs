//! Test infrastructure for the SR-IOV network driver
//!
//! Provides:
//! - [`MockNetdev`]: an in-memory [`sriov_common::NetdevOps`] with call
//!   capture and fault injection
//! - [`fixtures`]: reusable device scenarios for manager tests

pub mod fixtures;
mod mock;

pub use fixtures::*;
pub use mock::MockNetdev;
