//! In-memory mock of the device-primitive layer.
//!
//! Captures every call as a readable string and supports fault injection
//! for the failure paths the manager must handle (capability query,
//! enable, enumeration, post-rebind name resolution, attribute setters).

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use sriov_common::{NetdevOps, SriovError, SriovResult};

#[derive(Debug, Default)]
struct MockState {
    max_vfs: u32,
    enabled_vfs: u32,
    vf_devices: Vec<String>,
    calls: Vec<String>,
    fail_capability_query: bool,
    fail_enable: bool,
    fail_list: bool,
    fail_config: bool,
    unresolvable_vfs: HashSet<String>,
}

/// Mock SR-IOV capable device.
///
/// By default the device supports `max_vfs` VFs and has none enabled.
/// Enabling SR-IOV exposes `virtfn0..virtfnN-1`; each VF resolves to the
/// interface name `<dev>v<index>` and PCI address `0000:03:10.<index>`.
pub struct MockNetdev {
    state: Mutex<MockState>,
}

impl MockNetdev {
    /// Creates a device supporting `max_vfs` VFs, SR-IOV disabled.
    pub fn new(max_vfs: u32) -> Self {
        Self {
            state: Mutex::new(MockState {
                max_vfs,
                ..Default::default()
            }),
        }
    }

    /// Marks the device as already in SR-IOV mode with `count` VFs enabled.
    pub fn with_enabled_vfs(self, count: u32) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.enabled_vfs = count;
            state.vf_devices = (0..count).map(|i| format!("virtfn{i}")).collect();
        }
        self
    }

    /// Makes capability queries fail (device does not support SR-IOV).
    pub fn fail_capability_query(self) -> Self {
        self.state.lock().unwrap().fail_capability_query = true;
        self
    }

    /// Makes the enable primitive fail.
    pub fn fail_enable(self) -> Self {
        self.state.lock().unwrap().fail_enable = true;
        self
    }

    /// Makes VF enumeration fail.
    pub fn fail_list(self) -> Self {
        self.state.lock().unwrap().fail_list = true;
        self
    }

    /// Makes the attribute setters and the bind cycle fail.
    pub fn fail_config(self) -> Self {
        self.state.lock().unwrap().fail_config = true;
        self
    }

    /// Makes interface-name resolution return `None` for the given VF.
    pub fn fail_resolve(self, vf: &str) -> Self {
        self.state.lock().unwrap().unresolvable_vfs.insert(vf.to_string());
        self
    }

    /// Returns every captured call, oldest first.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Clears the captured call log.
    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl NetdevOps for MockNetdev {
    async fn max_vf_count(&self, dev: &str) -> SriovResult<u32> {
        self.record(format!("max_vf_count {dev}"));
        let state = self.state.lock().unwrap();
        if state.fail_capability_query {
            return Err(SriovError::capability_query(dev, "injected failure"));
        }
        Ok(state.max_vfs)
    }

    async fn enabled_vf_count(&self, dev: &str) -> SriovResult<u32> {
        self.record(format!("enabled_vf_count {dev}"));
        let state = self.state.lock().unwrap();
        if state.fail_capability_query {
            return Err(SriovError::capability_query(dev, "injected failure"));
        }
        Ok(state.enabled_vfs)
    }

    async fn enable_sriov(&self, dev: &str) -> SriovResult<()> {
        self.record(format!("enable_sriov {dev}"));
        let mut state = self.state.lock().unwrap();
        if state.fail_enable {
            return Err(SriovError::capability_query(dev, "enable rejected"));
        }
        state.enabled_vfs = state.max_vfs;
        state.vf_devices = (0..state.max_vfs).map(|i| format!("virtfn{i}")).collect();
        Ok(())
    }

    async fn disable_sriov(&self, dev: &str) -> SriovResult<()> {
        self.record(format!("disable_sriov {dev}"));
        let mut state = self.state.lock().unwrap();
        state.enabled_vfs = 0;
        state.vf_devices.clear();
        Ok(())
    }

    async fn list_vf_devices(&self, dev: &str) -> SriovResult<Vec<String>> {
        self.record(format!("list_vf_devices {dev}"));
        let state = self.state.lock().unwrap();
        if state.fail_list {
            return Err(SriovError::discovery(dev, "enumeration rejected"));
        }
        Ok(state.vf_devices.clone())
    }

    async fn vf_netdev_name(&self, dev: &str, vf: &str) -> SriovResult<Option<String>> {
        self.record(format!("vf_netdev_name {dev} {vf}"));
        let state = self.state.lock().unwrap();
        if state.unresolvable_vfs.contains(vf) {
            return Ok(None);
        }
        let index = vf.strip_prefix("virtfn").unwrap_or("0");
        Ok(Some(format!("{dev}v{index}")))
    }

    async fn vf_pci_address(&self, dev: &str, vf: &str) -> SriovResult<Option<String>> {
        self.record(format!("vf_pci_address {dev} {vf}"));
        let index = vf.strip_prefix("virtfn").unwrap_or("0");
        Ok(Some(format!("0000:03:10.{index}")))
    }

    async fn set_vf_default_mac(&self, dev: &str, vf: &str, vf_netdev: &str) -> SriovResult<()> {
        self.record(format!("set_vf_default_mac {dev} {vf} {vf_netdev}"));
        if self.state.lock().unwrap().fail_config {
            return Err(SriovError::device_config("set_vf_default_mac", dev, "injected failure"));
        }
        Ok(())
    }

    async fn set_vf_vlan(&self, dev: &str, vf: &str, vlan: u16) -> SriovResult<()> {
        self.record(format!("set_vf_vlan {dev} {vf} {vlan}"));
        if self.state.lock().unwrap().fail_config {
            return Err(SriovError::device_config("set_vf_vlan", dev, "injected failure"));
        }
        Ok(())
    }

    async fn unbind_vf(&self, dev: &str, pci_address: &str) -> SriovResult<()> {
        self.record(format!("unbind_vf {dev} {pci_address}"));
        if self.state.lock().unwrap().fail_config {
            return Err(SriovError::device_config("unbind_vf", dev, "injected failure"));
        }
        Ok(())
    }

    async fn bind_vf(&self, dev: &str, pci_address: &str) -> SriovResult<()> {
        self.record(format!("bind_vf {dev} {pci_address}"));
        if self.state.lock().unwrap().fail_config {
            return Err(SriovError::device_config("bind_vf", dev, "injected failure"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enable_populates_vf_list() {
        let dev = MockNetdev::new(4);
        assert_eq!(dev.enabled_vf_count("eth0").await.unwrap(), 0);

        dev.enable_sriov("eth0").await.unwrap();
        assert_eq!(dev.enabled_vf_count("eth0").await.unwrap(), 4);
        assert_eq!(
            dev.list_vf_devices("eth0").await.unwrap(),
            vec!["virtfn0", "virtfn1", "virtfn2", "virtfn3"]
        );
    }

    #[tokio::test]
    async fn test_pre_enabled_device() {
        let dev = MockNetdev::new(8).with_enabled_vfs(8);
        assert_eq!(dev.enabled_vf_count("eth0").await.unwrap(), 8);
        assert_eq!(dev.list_vf_devices("eth0").await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_resolution() {
        let dev = MockNetdev::new(4).with_enabled_vfs(4).fail_resolve("virtfn2");
        assert_eq!(
            dev.vf_netdev_name("eth0", "virtfn1").await.unwrap(),
            Some("eth0v1".to_string())
        );
        assert_eq!(dev.vf_netdev_name("eth0", "virtfn2").await.unwrap(), None);
        assert_eq!(
            dev.vf_pci_address("eth0", "virtfn3").await.unwrap(),
            Some("0000:03:10.3".to_string())
        );
    }

    #[tokio::test]
    async fn test_call_capture() {
        let dev = MockNetdev::new(2);
        dev.enable_sriov("eth0").await.unwrap();
        dev.set_vf_vlan("eth0", "virtfn0", 100).await.unwrap();

        let calls = dev.calls();
        assert_eq!(calls[0], "enable_sriov eth0");
        assert_eq!(calls[1], "set_vf_vlan eth0 virtfn0 100");

        dev.clear_calls();
        assert!(dev.calls().is_empty());
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let dev = MockNetdev::new(4).fail_enable();
        assert!(dev.enable_sriov("eth0").await.is_err());

        let dev = MockNetdev::new(4).with_enabled_vfs(4).fail_list();
        assert!(dev.list_vf_devices("eth0").await.is_err());

        let dev = MockNetdev::new(4).fail_capability_query();
        assert!(dev.max_vf_count("eth0").await.is_err());
    }
}
