//! Per-network VF bookkeeping: SR-IOV state machine, discovery, and the
//! free-VF pool.
//!
//! A [`SriovNetwork`] owns its pool exclusively. It performs no locking;
//! callers serialize access (the daemon holds one coarse lock around the
//! whole manager).

use std::collections::HashSet;

use tracing::{debug, warn};

use sriov_common::{NetdevOps, SriovError, SriovResult};

use crate::types::{ConfigPolicy, NetworkOptions, VfState};

/// One logical network backed by an SR-IOV capable physical device.
///
/// Lifecycle: born by [`probe`](SriovNetwork::probe), populated once by
/// [`discover`](SriovNetwork::discover), then cycles through
/// [`alloc_vf`](SriovNetwork::alloc_vf) / [`free_vf`](SriovNetwork::free_vf)
/// until [`disable`](SriovNetwork::disable) at network deletion.
#[derive(Debug)]
pub struct SriovNetwork {
    /// Network id assigned by the driver layer.
    id: String,

    /// Physical device backing this network.
    parent_dev: String,

    /// SR-IOV mode of the physical device.
    state: VfState,

    /// VF capacity reported by the device; fixed after probe.
    max_vf_count: u32,

    /// Free VF device names, stack order (last discovered / last freed on top).
    free_vfs: Vec<String>,

    /// VF device names currently on loan to endpoints.
    allocated_vfs: HashSet<String>,

    /// VF count observed by the single discovery pass; 0 = not yet discovered.
    discovered_count: usize,

    /// VLAN id applied to allocated VFs; 0 = untagged.
    vlan: u16,

    /// Hardware configuration policy for allocation.
    policy: ConfigPolicy,

    /// Gateway address from IPAM, held for the driver layer.
    gateway: Option<String>,
}

impl SriovNetwork {
    /// Queries the physical device and builds the network in its observed
    /// initial state.
    ///
    /// The device is never assumed fresh: a non-zero enabled-VF count means
    /// something already switched it into SR-IOV mode, and the state machine
    /// starts as enabled.
    pub async fn probe(
        netdev: &dyn NetdevOps,
        id: impl Into<String>,
        parent_dev: impl Into<String>,
        opts: &NetworkOptions,
    ) -> SriovResult<Self> {
        let id = id.into();
        let parent_dev = parent_dev.into();

        let max_vf_count = netdev.max_vf_count(&parent_dev).await?;
        let enabled = netdev.enabled_vf_count(&parent_dev).await?;
        let state = if enabled != 0 {
            VfState::Enabled
        } else {
            VfState::Disabled
        };

        debug!(
            network = %id,
            device = %parent_dev,
            max_vfs = max_vf_count,
            enabled_vfs = enabled,
            state = state.as_str(),
            "Probed SR-IOV device"
        );

        Ok(Self {
            id,
            parent_dev,
            state,
            max_vf_count,
            free_vfs: Vec::new(),
            allocated_vfs: HashSet::new(),
            discovered_count: 0,
            vlan: opts.vlan,
            policy: opts.policy,
            gateway: opts.gateway.clone(),
        })
    }

    /// Enables SR-IOV mode if needed and enumerates the VF pool.
    ///
    /// Runs at most once: a non-zero discovered count makes this a no-op.
    /// If enumeration fails after the device was switched into SR-IOV mode,
    /// the state is rolled back to disabled before the error propagates, so
    /// no device is left enabled with an empty inventory.
    pub async fn discover(&mut self, netdev: &dyn NetdevOps) -> SriovResult<()> {
        if self.state == VfState::Disabled {
            netdev.enable_sriov(&self.parent_dev).await?;
            self.state = VfState::Enabled;
        }

        if self.discovered_count == 0 {
            match netdev.list_vf_devices(&self.parent_dev).await {
                Ok(vfs) => {
                    self.discovered_count = vfs.len();
                    self.free_vfs = vfs;
                }
                Err(e) => {
                    self.disable(netdev).await;
                    return Err(e);
                }
            }
        }

        debug!(
            network = %self.id,
            discovered = self.discovered_count,
            "VF discovery complete"
        );
        Ok(())
    }

    /// Switches the device out of SR-IOV mode and discards the pool.
    ///
    /// Best-effort: deletion must not be blockable, so a failing disable
    /// primitive is logged and the bookkeeping cleared regardless.
    pub async fn disable(&mut self, netdev: &dyn NetdevOps) {
        if let Err(e) = netdev.disable_sriov(&self.parent_dev).await {
            warn!(
                network = %self.id,
                device = %self.parent_dev,
                error = %e,
                "Failed to disable SR-IOV"
            );
        }
        self.state = VfState::Disabled;
        self.free_vfs.clear();
        self.allocated_vfs.clear();
        self.discovered_count = 0;
    }

    /// Loans out one VF: pops the top of the pool, applies MAC/VLAN, runs
    /// the driver bind cycle, and re-resolves the interface name.
    ///
    /// Returns `(vf_name, netdev_name)`. On any abort the popped VF goes
    /// back onto the pool first, so a failed allocation never shrinks the
    /// inventory.
    pub async fn alloc_vf(&mut self, netdev: &dyn NetdevOps) -> SriovResult<(String, String)> {
        let vf = match self.free_vfs.pop() {
            Some(vf) => vf,
            None => return Err(SriovError::resource_exhausted(&self.id)),
        };

        match self.configure_vf(netdev, &vf).await {
            Ok(netdev_name) => {
                self.allocated_vfs.insert(vf.clone());
                debug!(
                    network = %self.id,
                    vf = %vf,
                    netdev = %netdev_name,
                    free = self.free_vfs.len(),
                    "Allocated VF"
                );
                Ok((vf, netdev_name))
            }
            Err(e) => {
                self.free_vfs.push(vf);
                Err(e)
            }
        }
    }

    /// Returns a VF to the pool.
    ///
    /// Rejects names that are not currently on loan; freeing twice or
    /// freeing a foreign name would otherwise corrupt the pool's
    /// uniqueness invariant.
    pub fn free_vf(&mut self, vf: &str) -> SriovResult<()> {
        if !self.allocated_vfs.remove(vf) {
            return Err(SriovError::vf_not_allocated(vf, &self.id));
        }
        self.free_vfs.push(vf.to_string());
        debug!(network = %self.id, vf = %vf, free = self.free_vfs.len(), "Freed VF");
        Ok(())
    }

    /// Runs the hardware configuration sequence for one VF and resolves
    /// its final interface name.
    async fn configure_vf(&self, netdev: &dyn NetdevOps, vf: &str) -> SriovResult<String> {
        let dev = &self.parent_dev;

        let initial_name = match netdev.vf_netdev_name(dev, vf).await? {
            Some(name) => name,
            None => {
                return Err(SriovError::device_config(
                    "resolve_vf_netdev",
                    dev,
                    format!("VF '{vf}' has no network interface"),
                ))
            }
        };

        if let Some(pci) = netdev.vf_pci_address(dev, vf).await? {
            let res = netdev.set_vf_default_mac(dev, vf, &initial_name).await;
            self.policy_check("set_vf_default_mac", res)?;

            if self.vlan > 0 {
                let res = netdev.set_vf_vlan(dev, vf, self.vlan).await;
                self.policy_check("set_vf_vlan", res)?;
            }

            // MAC/VLAN changes only take effect across a driver rebind
            let res = netdev.unbind_vf(dev, &pci).await;
            self.policy_check("unbind_vf", res)?;
            let res = netdev.bind_vf(dev, &pci).await;
            self.policy_check("bind_vf", res)?;
        }

        // the interface name can change across the unbind/bind sequence
        match netdev.vf_netdev_name(dev, vf).await? {
            Some(name) => Ok(name),
            None => Err(SriovError::device_config(
                "resolve_vf_netdev",
                dev,
                format!("VF '{vf}' lost its network interface after rebind"),
            )),
        }
    }

    /// Applies the configuration policy to one hardware step's result.
    fn policy_check(&self, operation: &str, result: SriovResult<()>) -> SriovResult<()> {
        match result {
            Ok(()) => Ok(()),
            Err(e) if self.policy == ConfigPolicy::Strict => Err(e),
            Err(e) => {
                warn!(
                    network = %self.id,
                    operation = operation,
                    error = %e,
                    "Hardware configuration step failed, continuing (best-effort)"
                );
                Ok(())
            }
        }
    }

    /// Network id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Backing physical device name.
    pub fn parent_dev(&self) -> &str {
        &self.parent_dev
    }

    /// Current SR-IOV state.
    pub fn state(&self) -> VfState {
        self.state
    }

    /// VF capacity reported by the device at probe time.
    pub fn max_vf_count(&self) -> u32 {
        self.max_vf_count
    }

    /// VLAN id, 0 when untagged.
    pub fn vlan(&self) -> u16 {
        self.vlan
    }

    /// Gateway address held for the driver layer.
    pub fn gateway(&self) -> Option<&str> {
        self.gateway.as_deref()
    }

    /// Number of VFs currently free.
    pub fn free_count(&self) -> usize {
        self.free_vfs.len()
    }

    /// Number of VFs currently on loan.
    pub fn allocated_count(&self) -> usize {
        self.allocated_vfs.len()
    }

    /// VF count observed by the discovery pass.
    pub fn discovered_count(&self) -> usize {
        self.discovered_count
    }
}
