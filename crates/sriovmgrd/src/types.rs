//! Type definitions for sriovmgrd

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// SR-IOV mode of a logical network's physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VfState {
    /// Device is not exposing VFs
    Disabled,
    /// Device is in SR-IOV mode; VFs may be allocated and freed
    Enabled,
}

impl VfState {
    /// Convert to string
    pub fn as_str(&self) -> &str {
        match self {
            VfState::Disabled => "disabled",
            VfState::Enabled => "enabled",
        }
    }
}

/// Policy for the hardware configuration steps during VF allocation
///
/// The MAC/VLAN setters and the driver bind cycle can fail without making
/// the VF unusable. Best-effort logs and continues; strict aborts the
/// allocation and returns the VF to the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigPolicy {
    /// Log configuration failures and hand the VF out anyway
    #[default]
    BestEffort,
    /// Abort the allocation on any configuration failure
    Strict,
}

impl FromStr for ConfigPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "strict" => ConfigPolicy::Strict,
            "best_effort" => ConfigPolicy::BestEffort,
            _ => ConfigPolicy::BestEffort, // Default to best-effort
        })
    }
}

impl ConfigPolicy {
    /// Convert to string
    pub fn as_str(&self) -> &str {
        match self {
            ConfigPolicy::BestEffort => "best_effort",
            ConfigPolicy::Strict => "strict",
        }
    }
}

/// Options supplied by the driver layer at network creation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkOptions {
    /// VLAN id in [0, 4095]; 0 means untagged
    pub vlan: u16,
    /// Gateway address from IPAM, opaque to the manager
    pub gateway: Option<String>,
    /// Hardware configuration policy
    pub policy: ConfigPolicy,
}

impl NetworkOptions {
    /// Create options with defaults (no VLAN, best-effort policy)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the VLAN id
    pub fn with_vlan(mut self, vlan: u16) -> Self {
        self.vlan = vlan;
        self
    }

    /// Set the gateway address
    pub fn with_gateway(mut self, gateway: impl Into<String>) -> Self {
        self.gateway = Some(gateway.into());
        self
    }

    /// Set the configuration policy
    pub fn with_policy(mut self, policy: ConfigPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// One container endpoint's loan of a VF
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointBinding {
    /// Owning network id
    pub network_id: String,
    /// VF device name on loan from the network's pool (e.g., "virtfn2")
    pub vf_name: String,
    /// The VF's network interface name after the bind cycle
    pub netdev_name: String,
    /// Address supplied by the caller, opaque to the manager
    pub address: Option<String>,
}

/// Attachment descriptor returned to the driver layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInterface {
    /// Network interface name of the assigned VF
    pub dev_name: String,
    /// Endpoint address (echoed from the caller when supplied)
    pub address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vf_state_as_str() {
        assert_eq!(VfState::Disabled.as_str(), "disabled");
        assert_eq!(VfState::Enabled.as_str(), "enabled");
    }

    #[test]
    fn test_config_policy_from_str() {
        assert_eq!(
            "strict".parse::<ConfigPolicy>().unwrap(),
            ConfigPolicy::Strict
        );
        assert_eq!(
            "best_effort".parse::<ConfigPolicy>().unwrap(),
            ConfigPolicy::BestEffort
        );
        assert_eq!(
            "invalid".parse::<ConfigPolicy>().unwrap(),
            ConfigPolicy::BestEffort
        );
    }

    #[test]
    fn test_network_options_builder() {
        let opts = NetworkOptions::new()
            .with_vlan(100)
            .with_gateway("192.168.1.1/24")
            .with_policy(ConfigPolicy::Strict);
        assert_eq!(opts.vlan, 100);
        assert_eq!(opts.gateway.as_deref(), Some("192.168.1.1/24"));
        assert_eq!(opts.policy, ConfigPolicy::Strict);

        let opts = NetworkOptions::new();
        assert_eq!(opts.vlan, 0);
        assert_eq!(opts.policy, ConfigPolicy::BestEffort);
    }
}
