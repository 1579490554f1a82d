//! Device-primitive trait consumed by the VF resource manager.
//!
//! The manager core never touches sysfs or netlink itself. All kernel-level
//! device manipulation goes through this narrow trait, implemented by
//! [`crate::sysfs::SysfsNetdev`] in production and by a mock in tests.

use async_trait::async_trait;

use crate::error::SriovResult;

/// Low-level operations against an SR-IOV capable physical device.
///
/// VFs are identified by their sysfs directory name under the parent
/// device (e.g., `virtfn0`), which is stable across driver rebinds; the
/// VF's network interface name is not, and must be re-resolved after a
/// bind cycle.
///
/// # Error policy
///
/// Capability queries and enumeration return hard errors. The attribute
/// setters (`set_vf_default_mac`, `set_vf_vlan`) and the bind cycle
/// (`unbind_vf`, `bind_vf`) report errors too, but callers may choose to
/// treat them as best-effort depending on their configuration policy.
#[async_trait]
pub trait NetdevOps: Send + Sync {
    /// Returns the maximum number of VFs the device supports.
    async fn max_vf_count(&self, dev: &str) -> SriovResult<u32>;

    /// Returns the number of VFs currently enabled on the device.
    async fn enabled_vf_count(&self, dev: &str) -> SriovResult<u32>;

    /// Switches the device into SR-IOV mode, exposing its maximum VF count.
    async fn enable_sriov(&self, dev: &str) -> SriovResult<()>;

    /// Switches the device out of SR-IOV mode.
    async fn disable_sriov(&self, dev: &str) -> SriovResult<()>;

    /// Enumerates the VF device names currently present on the device.
    async fn list_vf_devices(&self, dev: &str) -> SriovResult<Vec<String>>;

    /// Resolves a VF's current network interface name.
    ///
    /// Returns `Ok(None)` if the VF has no netdev (e.g., mid-rebind).
    async fn vf_netdev_name(&self, dev: &str, vf: &str) -> SriovResult<Option<String>>;

    /// Resolves a VF's PCI address (e.g., `0000:03:10.2`).
    ///
    /// Returns `Ok(None)` if the address cannot be determined.
    async fn vf_pci_address(&self, dev: &str, vf: &str) -> SriovResult<Option<String>>;

    /// Assigns the driver's default MAC address to a VF.
    async fn set_vf_default_mac(&self, dev: &str, vf: &str, vf_netdev: &str) -> SriovResult<()>;

    /// Sets a VF's VLAN tag.
    async fn set_vf_vlan(&self, dev: &str, vf: &str, vlan: u16) -> SriovResult<()>;

    /// Unbinds a VF from its driver.
    async fn unbind_vf(&self, dev: &str, pci_address: &str) -> SriovResult<()>;

    /// Rebinds a VF to its driver.
    ///
    /// Required after attribute changes that only take effect across a
    /// driver unbind/rebind cycle.
    async fn bind_vf(&self, dev: &str, pci_address: &str) -> SriovResult<()>;
}
