//! Common infrastructure for the SR-IOV container network driver.
//!
//! This crate provides the pieces shared between the VF resource manager
//! daemon and its test tooling:
//!
//! - [`error`]: Error taxonomy for driver operations
//! - [`netdev`]: The [`NetdevOps`] device-primitive trait the manager
//!   core consumes
//! - [`sysfs`]: Production [`NetdevOps`] implementation backed by sysfs
//!   and `ip link`
//! - [`shell`]: Safe shell command execution with proper quoting
//!
//! # Architecture
//!
//! The VF resource manager follows this pattern:
//!
//! 1. Network creation queries device capability and enables SR-IOV mode
//! 2. A single discovery pass populates the per-network VF pool
//! 3. Endpoint creation loans a VF out of the pool (MAC/VLAN applied,
//!    driver rebind cycle performed)
//! 4. Endpoint deletion returns the VF; network deletion disables SR-IOV
//!
//! All kernel-level device manipulation sits behind [`NetdevOps`], so the
//! manager core stays free of sysfs details and fully testable with a
//! mock device.

pub mod error;
pub mod netdev;
pub mod shell;
pub mod sysfs;

// Re-export commonly used items at crate root
pub use error::{SriovError, SriovResult};
pub use netdev::NetdevOps;
pub use sysfs::SysfsNetdev;

/// Highest valid 802.1Q VLAN id; 0 means "untagged".
pub const MAX_VLAN_ID: u16 = 4095;
