//! Sysfs-backed implementation of [`NetdevOps`].
//!
//! SR-IOV capability and VF enumeration live under
//! `/sys/class/net/<dev>/device/`:
//!
//! - `sriov_totalvfs`: maximum VF count the device supports
//! - `sriov_numvfs`: currently enabled VF count (writable)
//! - `virtfn<N>`: symlink to the VF's PCI device, one per enabled VF
//! - `virtfn<N>/net/<ifname>`: the VF's network interface, when bound
//!
//! Driver bind/unbind goes through `/sys/bus/pci`; VF MAC and VLAN
//! attributes go through `ip link set`, which has no sysfs equivalent.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{SriovError, SriovResult};
use crate::netdev::NetdevOps;
use crate::shell::{self, shellquote, IP_CMD};

/// Sysfs attribute holding the maximum VF count.
const SRIOV_TOTALVFS: &str = "sriov_totalvfs";

/// Sysfs attribute holding (and controlling) the enabled VF count.
const SRIOV_NUMVFS: &str = "sriov_numvfs";

/// Prefix of per-VF entries under the parent PCI device directory.
const VIRTFN_PREFIX: &str = "virtfn";

/// Extracts the numeric VF index from a `virtfn<N>` device name.
pub fn vf_index(vf: &str) -> Option<u32> {
    vf.strip_prefix(VIRTFN_PREFIX)?.parse().ok()
}

/// Derives the default MAC address for a VF from its parent's MAC.
///
/// Sets the locally-administered bit and replaces the last octet with the
/// VF index, giving each VF a stable, predictable address.
pub fn default_vf_mac(pf_mac: &str, index: u32) -> Option<String> {
    let mut octets = [0u8; 6];
    let parts: Vec<&str> = pf_mac.trim().split(':').collect();
    if parts.len() != 6 {
        return None;
    }
    for (i, part) in parts.iter().enumerate() {
        octets[i] = u8::from_str_radix(part, 16).ok()?;
    }
    octets[0] |= 0x02; // locally administered
    octets[0] &= !0x01; // never multicast
    octets[5] = index as u8;
    Some(format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        octets[0], octets[1], octets[2], octets[3], octets[4], octets[5]
    ))
}

/// [`NetdevOps`] implementation backed by sysfs and `ip link`.
pub struct SysfsNetdev {
    /// Root of the network class tree (default `/sys/class/net`).
    net_root: PathBuf,
    /// Root of the PCI bus tree (default `/sys/bus/pci`).
    pci_root: PathBuf,
}

impl SysfsNetdev {
    /// Creates a handle against the live sysfs trees.
    pub fn new() -> Self {
        Self {
            net_root: PathBuf::from("/sys/class/net"),
            pci_root: PathBuf::from("/sys/bus/pci"),
        }
    }

    /// Creates a handle against alternate roots (used by tests).
    pub fn with_roots(net_root: impl Into<PathBuf>, pci_root: impl Into<PathBuf>) -> Self {
        Self {
            net_root: net_root.into(),
            pci_root: pci_root.into(),
        }
    }

    /// Path of the parent PCI device directory for a netdev.
    fn device_dir(&self, dev: &str) -> PathBuf {
        self.net_root.join(dev).join("device")
    }

    async fn read_attr(&self, path: &Path) -> SriovResult<String> {
        tokio::fs::read_to_string(path)
            .await
            .map(|s| s.trim().to_string())
            .map_err(|e| SriovError::sysfs(path.display().to_string(), e))
    }

    async fn write_attr(&self, path: &Path, value: &str) -> SriovResult<()> {
        tokio::fs::write(path, value)
            .await
            .map_err(|e| SriovError::sysfs(path.display().to_string(), e))
    }

    async fn read_vf_count(&self, dev: &str, attr: &str) -> SriovResult<u32> {
        let path = self.device_dir(dev).join(attr);
        let raw = self
            .read_attr(&path)
            .await
            .map_err(|e| SriovError::capability_query(dev, e.to_string()))?;
        raw.parse()
            .map_err(|_| SriovError::capability_query(dev, format!("unparseable {attr}: '{raw}'")))
    }
}

impl Default for SysfsNetdev {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetdevOps for SysfsNetdev {
    async fn max_vf_count(&self, dev: &str) -> SriovResult<u32> {
        self.read_vf_count(dev, SRIOV_TOTALVFS).await
    }

    async fn enabled_vf_count(&self, dev: &str) -> SriovResult<u32> {
        self.read_vf_count(dev, SRIOV_NUMVFS).await
    }

    async fn enable_sriov(&self, dev: &str) -> SriovResult<()> {
        let max = self.max_vf_count(dev).await?;
        let path = self.device_dir(dev).join(SRIOV_NUMVFS);
        self.write_attr(&path, &max.to_string()).await?;
        debug!(device = dev, vfs = max, "Enabled SR-IOV");
        Ok(())
    }

    async fn disable_sriov(&self, dev: &str) -> SriovResult<()> {
        let path = self.device_dir(dev).join(SRIOV_NUMVFS);
        self.write_attr(&path, "0").await?;
        debug!(device = dev, "Disabled SR-IOV");
        Ok(())
    }

    async fn list_vf_devices(&self, dev: &str) -> SriovResult<Vec<String>> {
        let dir = self.device_dir(dev);
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| SriovError::sysfs(dir.display().to_string(), e))?;

        let mut vfs: Vec<String> = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SriovError::sysfs(dir.display().to_string(), e))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if vf_index(&name).is_some() {
                vfs.push(name);
            }
        }
        // readdir order is arbitrary; keep the pool in index order
        vfs.sort_by_key(|name| vf_index(name));
        Ok(vfs)
    }

    async fn vf_netdev_name(&self, dev: &str, vf: &str) -> SriovResult<Option<String>> {
        let net_dir = self.device_dir(dev).join(vf).join("net");
        let mut entries = match tokio::fs::read_dir(&net_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SriovError::sysfs(net_dir.display().to_string(), e)),
        };
        match entries.next_entry().await {
            Ok(Some(entry)) => Ok(Some(entry.file_name().to_string_lossy().to_string())),
            Ok(None) => Ok(None),
            Err(e) => Err(SriovError::sysfs(net_dir.display().to_string(), e)),
        }
    }

    async fn vf_pci_address(&self, dev: &str, vf: &str) -> SriovResult<Option<String>> {
        let link = self.device_dir(dev).join(vf);
        match tokio::fs::read_link(&link).await {
            Ok(target) => Ok(target
                .file_name()
                .map(|name| name.to_string_lossy().to_string())),
            Err(e) => {
                debug!(device = dev, vf = vf, error = %e, "No PCI address for VF");
                Ok(None)
            }
        }
    }

    async fn set_vf_default_mac(&self, dev: &str, vf: &str, vf_netdev: &str) -> SriovResult<()> {
        let index = vf_index(vf)
            .ok_or_else(|| SriovError::device_config("set_vf_default_mac", dev, format!("bad VF name '{vf}'")))?;
        let addr_path = self.net_root.join(dev).join("address");
        let pf_mac = self.read_attr(&addr_path).await?;
        let mac = default_vf_mac(&pf_mac, index).ok_or_else(|| {
            SriovError::device_config("set_vf_default_mac", dev, format!("bad parent MAC '{pf_mac}'"))
        })?;

        let cmd = format!(
            "{} link set dev {} vf {} mac {}",
            IP_CMD,
            shellquote(dev),
            index,
            mac
        );
        shell::exec_or_throw(&cmd).await?;
        debug!(device = dev, vf = vf, netdev = vf_netdev, mac = %mac, "Set VF default MAC");
        Ok(())
    }

    async fn set_vf_vlan(&self, dev: &str, vf: &str, vlan: u16) -> SriovResult<()> {
        let index = vf_index(vf)
            .ok_or_else(|| SriovError::device_config("set_vf_vlan", dev, format!("bad VF name '{vf}'")))?;
        let cmd = format!(
            "{} link set dev {} vf {} vlan {}",
            IP_CMD,
            shellquote(dev),
            index,
            vlan
        );
        shell::exec_or_throw(&cmd).await?;
        debug!(device = dev, vf = vf, vlan = vlan, "Set VF VLAN");
        Ok(())
    }

    async fn unbind_vf(&self, _dev: &str, pci_address: &str) -> SriovResult<()> {
        let path = self
            .pci_root
            .join("devices")
            .join(pci_address)
            .join("driver")
            .join("unbind");
        match tokio::fs::write(&path, pci_address).await {
            Ok(()) => Ok(()),
            // no driver bound means nothing to unbind
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SriovError::sysfs(path.display().to_string(), e)),
        }
    }

    async fn bind_vf(&self, _dev: &str, pci_address: &str) -> SriovResult<()> {
        // drivers_probe rebinds the device to its default driver
        let path = self.pci_root.join("drivers_probe");
        self.write_attr(&path, pci_address).await
    }
}
