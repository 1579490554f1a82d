//! SriovMgr - the VF resource manager facade.
//!
//! Implements the four operations the driver/RPC layer calls:
//! create/delete network and create/delete endpoint. All device
//! manipulation goes through the injected [`NetdevOps`] collaborator.
//!
//! The manager performs no internal locking; the daemon serializes calls
//! with one coarse lock (see `main.rs`).

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use sriov_common::{NetdevOps, SriovError, SriovResult, MAX_VLAN_ID};

use crate::network::SriovNetwork;
use crate::registry::NetworkRegistry;
use crate::types::{EndpointBinding, EndpointInterface, NetworkOptions};

/// VF resource manager for the SR-IOV network driver.
///
/// Operation flow:
/// 1. `create_network` validates the VLAN, probes the device, runs the
///    single discovery pass, and registers the network
/// 2. `create_endpoint` loans one VF out of the network's pool
/// 3. `delete_endpoint` returns the VF
/// 4. `delete_network` disables SR-IOV and unregisters
pub struct SriovMgr {
    /// Device-primitive layer.
    netdev: Arc<dyn NetdevOps>,

    /// All registered networks, keyed by network id.
    registry: NetworkRegistry,

    /// Endpoint bindings, keyed by endpoint id.
    endpoints: HashMap<String, EndpointBinding>,
}

impl SriovMgr {
    /// Creates a manager with an empty registry.
    pub fn new(netdev: Arc<dyn NetdevOps>) -> Self {
        Self {
            netdev,
            registry: NetworkRegistry::new(),
            endpoints: HashMap::new(),
        }
    }

    /// Creates a logical network backed by `parent_dev`.
    ///
    /// Validation (VLAN range, VLAN uniqueness, duplicate id) happens
    /// before any device state is touched. Discovery failures leave no
    /// partially-enabled network behind: the state machine rolls back and
    /// nothing is registered.
    #[instrument(skip(self, opts))]
    pub async fn create_network(
        &mut self,
        id: &str,
        parent_dev: &str,
        opts: NetworkOptions,
    ) -> SriovResult<()> {
        if opts.vlan > MAX_VLAN_ID {
            return Err(SriovError::VlanOutOfRange {
                vlan: u32::from(opts.vlan),
            });
        }
        if let Some(holder) = self.registry.vlan_holder(opts.vlan) {
            return Err(SriovError::vlan_in_use(opts.vlan, holder));
        }
        if self.registry.contains(id) {
            return Err(SriovError::NetworkExists { id: id.to_string() });
        }

        let mut network = SriovNetwork::probe(&*self.netdev, id, parent_dev, &opts).await?;
        network.discover(&*self.netdev).await?;

        let discovered = network.discovered_count();
        self.registry.register(network)?;

        info!(
            network = id,
            device = parent_dev,
            vlan = opts.vlan,
            vfs = discovered,
            "Created SR-IOV network"
        );
        Ok(())
    }

    /// Deletes a logical network: disables SR-IOV (best-effort) and
    /// removes the registry entry.
    ///
    /// Outstanding endpoints are a caller error; their bindings are
    /// dropped with a warning since the pool they would return to is gone.
    #[instrument(skip(self))]
    pub async fn delete_network(&mut self, id: &str) -> SriovResult<()> {
        let mut network = self.registry.unregister(id)?;
        network.disable(&*self.netdev).await;

        let stale = self
            .endpoints
            .iter()
            .filter(|(_, b)| b.network_id == id)
            .count();
        if stale > 0 {
            warn!(
                network = id,
                endpoints = stale,
                "Deleting network with outstanding endpoints"
            );
            self.endpoints.retain(|_, b| b.network_id != id);
        }

        info!(network = id, remaining = self.registry.len(), "Deleted SR-IOV network");
        Ok(())
    }

    /// Creates an endpoint: allocates one VF and returns the attachment
    /// descriptor carrying its interface name and address.
    #[instrument(skip(self, requested_address))]
    pub async fn create_endpoint(
        &mut self,
        network_id: &str,
        endpoint_id: &str,
        requested_address: Option<String>,
    ) -> SriovResult<EndpointInterface> {
        let network = self.registry.get_mut(network_id)?;
        let (vf_name, netdev_name) = network.alloc_vf(&*self.netdev).await?;

        self.endpoints.insert(
            endpoint_id.to_string(),
            EndpointBinding {
                network_id: network_id.to_string(),
                vf_name: vf_name.clone(),
                netdev_name: netdev_name.clone(),
                address: requested_address.clone(),
            },
        );

        debug!(
            network = network_id,
            endpoint = endpoint_id,
            vf = %vf_name,
            netdev = %netdev_name,
            "Created endpoint"
        );
        Ok(EndpointInterface {
            dev_name: netdev_name,
            address: requested_address,
        })
    }

    /// Deletes an endpoint and returns its VF to the owning pool.
    #[instrument(skip(self))]
    pub async fn delete_endpoint(
        &mut self,
        network_id: &str,
        endpoint_id: &str,
    ) -> SriovResult<()> {
        let owns = self
            .endpoints
            .get(endpoint_id)
            .is_some_and(|b| b.network_id == network_id);
        if !owns {
            return Err(SriovError::endpoint_not_found(network_id, endpoint_id));
        }

        let network = self.registry.get_mut(network_id)?;
        let binding = match self.endpoints.remove(endpoint_id) {
            Some(binding) => binding,
            None => return Err(SriovError::endpoint_not_found(network_id, endpoint_id)),
        };
        network.free_vf(&binding.vf_name)?;

        debug!(
            network = network_id,
            endpoint = endpoint_id,
            vf = %binding.vf_name,
            "Deleted endpoint"
        );
        Ok(())
    }

    /// Looks up a registered network (read-only).
    pub fn network(&self, id: &str) -> SriovResult<&SriovNetwork> {
        self.registry.get(id)
    }

    /// Looks up an endpoint binding.
    pub fn endpoint(&self, endpoint_id: &str) -> Option<&EndpointBinding> {
        self.endpoints.get(endpoint_id)
    }

    /// Number of registered networks.
    pub fn network_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of live endpoint bindings.
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VfState;
    use sriov_mgr_test::{fresh_device, MockNetdev};

    #[tokio::test]
    async fn test_create_network_rejects_bad_vlan_before_probe() {
        let dev = fresh_device(4);
        let mut mgr = SriovMgr::new(dev.clone());

        let err = mgr
            .create_network("net1", "eth0", NetworkOptions::new().with_vlan(5000))
            .await
            .unwrap_err();
        assert!(matches!(err, SriovError::VlanOutOfRange { vlan: 5000 }));
        // rejected before any device primitive ran
        assert!(dev.calls().is_empty());
        assert_eq!(mgr.network_count(), 0);

        // 4095 is the last valid id
        mgr.create_network("net1", "eth0", NetworkOptions::new().with_vlan(4095))
            .await
            .unwrap();
        assert_eq!(mgr.network("net1").unwrap().vlan(), 4095);
    }

    #[tokio::test]
    async fn test_create_network_rejects_vlan_conflict_untouched_state() {
        let dev = fresh_device(4);
        let mut mgr = SriovMgr::new(dev.clone());

        mgr.create_network("net1", "eth0", NetworkOptions::new().with_vlan(10))
            .await
            .unwrap();
        dev.clear_calls();

        let err = mgr
            .create_network("net2", "eth1", NetworkOptions::new().with_vlan(10))
            .await
            .unwrap_err();
        assert!(matches!(err, SriovError::VlanInUse { vlan: 10, .. }));

        // rejected before any device primitive ran
        assert!(dev.calls().is_empty());
        assert_eq!(mgr.network("net1").unwrap().state(), VfState::Enabled);
        assert_eq!(mgr.network_count(), 1);
    }

    #[tokio::test]
    async fn test_create_network_rejects_duplicate_id() {
        let dev = fresh_device(4);
        let mut mgr = SriovMgr::new(dev);

        mgr.create_network("net1", "eth0", NetworkOptions::new())
            .await
            .unwrap();
        let err = mgr
            .create_network("net1", "eth0", NetworkOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SriovError::NetworkExists { .. }));
    }

    #[tokio::test]
    async fn test_discovery_failure_leaves_no_registration() {
        let dev = Arc::new(MockNetdev::new(4).fail_list());
        let mut mgr = SriovMgr::new(dev.clone());

        let err = mgr
            .create_network("net1", "eth0", NetworkOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SriovError::Discovery { .. }));
        assert_eq!(mgr.network_count(), 0);
        // rollback disabled the device again
        assert!(dev.calls().contains(&"disable_sriov eth0".to_string()));
    }

    #[tokio::test]
    async fn test_endpoint_round_trip() {
        let dev = fresh_device(4);
        let mut mgr = SriovMgr::new(dev);
        mgr.create_network("net1", "eth0", NetworkOptions::new())
            .await
            .unwrap();

        let iface = mgr
            .create_endpoint("net1", "ep1", Some("10.0.0.2/24".to_string()))
            .await
            .unwrap();
        assert_eq!(iface.dev_name, "eth0v3");
        assert_eq!(iface.address.as_deref(), Some("10.0.0.2/24"));
        assert_eq!(mgr.endpoint_count(), 1);
        assert_eq!(mgr.endpoint("ep1").unwrap().vf_name, "virtfn3");

        mgr.delete_endpoint("net1", "ep1").await.unwrap();
        assert_eq!(mgr.endpoint_count(), 0);
        assert_eq!(mgr.network("net1").unwrap().free_count(), 4);
    }

    #[tokio::test]
    async fn test_delete_endpoint_unknown_id() {
        let dev = fresh_device(4);
        let mut mgr = SriovMgr::new(dev);
        mgr.create_network("net1", "eth0", NetworkOptions::new())
            .await
            .unwrap();

        let err = mgr.delete_endpoint("net1", "ghost").await.unwrap_err();
        assert!(matches!(err, SriovError::EndpointNotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_endpoint_wrong_network() {
        let dev = fresh_device(4);
        let mut mgr = SriovMgr::new(dev);
        mgr.create_network("net1", "eth0", NetworkOptions::new())
            .await
            .unwrap();
        mgr.create_network("net2", "eth1", NetworkOptions::new())
            .await
            .unwrap();
        mgr.create_endpoint("net1", "ep1", None).await.unwrap();

        let err = mgr.delete_endpoint("net2", "ep1").await.unwrap_err();
        assert!(matches!(err, SriovError::EndpointNotFound { .. }));
        // binding survives the failed delete
        assert!(mgr.endpoint("ep1").is_some());
    }

    #[tokio::test]
    async fn test_delete_network_drops_stale_endpoints() {
        let dev = fresh_device(4);
        let mut mgr = SriovMgr::new(dev.clone());
        mgr.create_network("net1", "eth0", NetworkOptions::new())
            .await
            .unwrap();
        mgr.create_endpoint("net1", "ep1", None).await.unwrap();

        mgr.delete_network("net1").await.unwrap();
        assert_eq!(mgr.network_count(), 0);
        assert_eq!(mgr.endpoint_count(), 0);
        assert!(dev.calls().contains(&"disable_sriov eth0".to_string()));

        assert!(matches!(
            mgr.network("net1"),
            Err(SriovError::NetworkNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_network_fails() {
        let dev = fresh_device(4);
        let mut mgr = SriovMgr::new(dev);
        let err = mgr.delete_network("ghost").await.unwrap_err();
        assert!(matches!(err, SriovError::NetworkNotFound { .. }));
    }
}
