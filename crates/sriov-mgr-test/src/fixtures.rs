//! Test fixtures for common driver scenarios
//!
//! Provides reusable device setups for VF manager testing

use std::sync::Arc;

use crate::MockNetdev;

/// A fresh SR-IOV capable device: `max_vfs` supported, none enabled.
pub fn fresh_device(max_vfs: u32) -> Arc<MockNetdev> {
    Arc::new(MockNetdev::new(max_vfs))
}

/// A device already switched into SR-IOV mode with all VFs exposed.
pub fn enabled_device(max_vfs: u32) -> Arc<MockNetdev> {
    Arc::new(MockNetdev::new(max_vfs).with_enabled_vfs(max_vfs))
}

/// A device whose VF enumeration fails after enable succeeds.
///
/// Exercises the discovery rollback path (state must return to disabled).
pub fn broken_enumeration_device(max_vfs: u32) -> Arc<MockNetdev> {
    Arc::new(MockNetdev::new(max_vfs).fail_list())
}

/// A device that rejects the switch into SR-IOV mode.
pub fn unsupported_device() -> Arc<MockNetdev> {
    Arc::new(MockNetdev::new(0).fail_capability_query())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sriov_common::NetdevOps;

    #[tokio::test]
    async fn test_fresh_device() {
        let dev = fresh_device(4);
        assert_eq!(dev.max_vf_count("eth0").await.unwrap(), 4);
        assert_eq!(dev.enabled_vf_count("eth0").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_enabled_device() {
        let dev = enabled_device(4);
        assert_eq!(dev.enabled_vf_count("eth0").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_unsupported_device() {
        let dev = unsupported_device();
        assert!(dev.max_vf_count("eth0").await.is_err());
    }
}
