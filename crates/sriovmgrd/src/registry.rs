//! Process-wide network registry and cross-network VLAN enforcement.
//!
//! An explicit owned object, constructed by the manager at startup; no
//! lazily initialized global state. Registering an existing id and looking
//! up a missing id are hard errors.

use std::collections::HashMap;

use sriov_common::{SriovError, SriovResult};

use crate::network::SriovNetwork;

/// Mapping from network id to its [`SriovNetwork`].
#[derive(Debug, Default)]
pub struct NetworkRegistry {
    networks: HashMap<String, SriovNetwork>,
}

impl NetworkRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a network under its own id.
    ///
    /// Fails with [`SriovError::NetworkExists`] if the id is taken; the
    /// driver layer must delete before re-creating.
    pub fn register(&mut self, network: SriovNetwork) -> SriovResult<()> {
        let id = network.id().to_string();
        if self.networks.contains_key(&id) {
            return Err(SriovError::NetworkExists { id });
        }
        self.networks.insert(id, network);
        Ok(())
    }

    /// Removes and returns a network.
    pub fn unregister(&mut self, id: &str) -> SriovResult<SriovNetwork> {
        self.networks
            .remove(id)
            .ok_or_else(|| SriovError::NetworkNotFound { id: id.to_string() })
    }

    /// Looks up a network.
    pub fn get(&self, id: &str) -> SriovResult<&SriovNetwork> {
        self.networks
            .get(id)
            .ok_or_else(|| SriovError::NetworkNotFound { id: id.to_string() })
    }

    /// Looks up a network for mutation.
    pub fn get_mut(&mut self, id: &str) -> SriovResult<&mut SriovNetwork> {
        self.networks
            .get_mut(id)
            .ok_or_else(|| SriovError::NetworkNotFound { id: id.to_string() })
    }

    /// Returns the id of the network holding a non-zero VLAN, if any.
    ///
    /// VLAN 0 means untagged and is exempt from uniqueness.
    pub fn vlan_holder(&self, vlan: u16) -> Option<&str> {
        if vlan == 0 {
            return None;
        }
        self.networks
            .values()
            .find(|nw| nw.vlan() == vlan)
            .map(|nw| nw.id())
    }

    /// Returns true if the id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.networks.contains_key(id)
    }

    /// Number of registered networks.
    pub fn len(&self) -> usize {
        self.networks.len()
    }

    /// Returns true if no network is registered.
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    /// Iterates over registered networks in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &SriovNetwork> {
        self.networks.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NetworkOptions;
    use sriov_mgr_test::MockNetdev;

    async fn network(id: &str, vlan: u16) -> SriovNetwork {
        let netdev = MockNetdev::new(4);
        let opts = NetworkOptions::new().with_vlan(vlan);
        SriovNetwork::probe(&netdev, id, "eth0", &opts).await.unwrap()
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let mut registry = NetworkRegistry::new();
        assert!(registry.is_empty());

        registry.register(network("net1", 0).await).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("net1"));
        assert_eq!(registry.get("net1").unwrap().id(), "net1");
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let mut registry = NetworkRegistry::new();
        registry.register(network("net1", 0).await).unwrap();

        let err = registry.register(network("net1", 0).await).unwrap_err();
        assert!(matches!(err, SriovError::NetworkExists { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_unregister() {
        let mut registry = NetworkRegistry::new();
        registry.register(network("net1", 0).await).unwrap();

        let nw = registry.unregister("net1").unwrap();
        assert_eq!(nw.id(), "net1");
        assert!(registry.is_empty());

        let err = registry.unregister("net1").unwrap_err();
        assert!(matches!(err, SriovError::NetworkNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_lookup_fails() {
        let registry = NetworkRegistry::new();
        assert!(matches!(
            registry.get("ghost"),
            Err(SriovError::NetworkNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_vlan_holder() {
        let mut registry = NetworkRegistry::new();
        registry.register(network("net1", 100).await).unwrap();
        registry.register(network("net2", 200).await).unwrap();

        assert_eq!(registry.vlan_holder(100), Some("net1"));
        assert_eq!(registry.vlan_holder(200), Some("net2"));
        assert_eq!(registry.vlan_holder(300), None);
    }

    #[tokio::test]
    async fn test_vlan_zero_never_conflicts() {
        let mut registry = NetworkRegistry::new();
        registry.register(network("net1", 0).await).unwrap();
        registry.register(network("net2", 0).await).unwrap();

        assert_eq!(registry.vlan_holder(0), None);
    }
}
