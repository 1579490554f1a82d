//! Error types for SR-IOV network driver operations.
//!
//! This module defines the error taxonomy used throughout the driver
//! crates. All errors implement `std::error::Error` via `thiserror`.

use std::io;
use thiserror::Error;

/// Result type alias for SR-IOV driver operations.
pub type SriovResult<T> = Result<T, SriovError>;

/// Errors that can occur during SR-IOV network driver operations.
#[derive(Debug, Error)]
pub enum SriovError {
    /// VLAN id outside the valid [0, 4095] range.
    #[error("VLAN id {vlan} out of range (max 4095)")]
    VlanOutOfRange {
        /// The offending VLAN id.
        vlan: u32,
    },

    /// VLAN id already claimed by another registered network.
    #[error("VLAN id {vlan} already in use by network '{network}'")]
    VlanInUse {
        /// The contested VLAN id.
        vlan: u16,
        /// The network currently holding it.
        network: String,
    },

    /// SR-IOV capability query failed (device unsupported or sysfs error).
    #[error("SR-IOV capability query failed for device '{device}': {message}")]
    CapabilityQuery {
        /// The physical device name.
        device: String,
        /// Error detail.
        message: String,
    },

    /// VF discovery failed after the device was switched into SR-IOV mode.
    #[error("VF discovery failed for device '{device}': {message}")]
    Discovery {
        /// The physical device name.
        device: String,
        /// Error detail.
        message: String,
    },

    /// No free VF left in the network's pool.
    #[error("No free VF available in network '{network}'")]
    ResourceExhausted {
        /// The network whose pool is empty.
        network: String,
    },

    /// Network id already registered.
    #[error("Network '{id}' already exists")]
    NetworkExists {
        /// The duplicate network id.
        id: String,
    },

    /// Network id not found in the registry.
    #[error("Network '{id}' not found")]
    NetworkNotFound {
        /// The missing network id.
        id: String,
    },

    /// Endpoint id not found in the given network.
    #[error("Endpoint '{endpoint}' not found in network '{network}'")]
    EndpointNotFound {
        /// The network id.
        network: String,
        /// The missing endpoint id.
        endpoint: String,
    },

    /// Attempt to free a VF that is not on loan from the pool.
    #[error("VF '{vf}' is not allocated from network '{network}'")]
    VfNotAllocated {
        /// The VF device name.
        vf: String,
        /// The owning network id.
        network: String,
    },

    /// Hardware configuration step failed under strict config policy.
    #[error("Device configuration failed: {operation} on '{device}': {message}")]
    DeviceConfig {
        /// The operation that failed (e.g., "set_vf_vlan", "bind_vf").
        operation: String,
        /// The physical device name.
        device: String,
        /// Error detail.
        message: String,
    },

    /// Sysfs read/write failed.
    #[error("Sysfs access failed for '{path}': {source}")]
    Sysfs {
        /// The sysfs path involved.
        path: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Failed to execute a shell command (spawn error).
    #[error("Failed to execute shell command '{command}': {source}")]
    ShellExec {
        /// The command that failed to execute.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Shell command returned non-zero exit code.
    #[error("Shell command failed: '{command}' (exit code {exit_code}): {output}")]
    ShellCommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },

    /// Internal error (unexpected state).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl SriovError {
    /// Creates a VLAN-in-use error.
    pub fn vlan_in_use(vlan: u16, network: impl Into<String>) -> Self {
        Self::VlanInUse {
            vlan,
            network: network.into(),
        }
    }

    /// Creates a capability query error.
    pub fn capability_query(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CapabilityQuery {
            device: device.into(),
            message: message.into(),
        }
    }

    /// Creates a discovery error.
    pub fn discovery(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Discovery {
            device: device.into(),
            message: message.into(),
        }
    }

    /// Creates a resource exhaustion error.
    pub fn resource_exhausted(network: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            network: network.into(),
        }
    }

    /// Creates an endpoint-not-found error.
    pub fn endpoint_not_found(network: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::EndpointNotFound {
            network: network.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Creates a VF-not-allocated error.
    pub fn vf_not_allocated(vf: impl Into<String>, network: impl Into<String>) -> Self {
        Self::VfNotAllocated {
            vf: vf.into(),
            network: network.into(),
        }
    }

    /// Creates a device configuration error.
    pub fn device_config(
        operation: impl Into<String>,
        device: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::DeviceConfig {
            operation: operation.into(),
            device: device.into(),
            message: message.into(),
        }
    }

    /// Creates a sysfs access error.
    pub fn sysfs(path: impl Into<String>, source: io::Error) -> Self {
        Self::Sysfs {
            path: path.into(),
            source,
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error indicates a transient condition
    /// that may succeed on retry.
    ///
    /// Only pool exhaustion qualifies: a free VF may appear once another
    /// endpoint is deleted. Everything else requires operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SriovError::ResourceExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SriovError::resource_exhausted("net1");
        assert_eq!(err.to_string(), "No free VF available in network 'net1'");
    }

    #[test]
    fn test_vlan_errors() {
        let err = SriovError::VlanOutOfRange { vlan: 5000 };
        assert_eq!(err.to_string(), "VLAN id 5000 out of range (max 4095)");

        let err = SriovError::vlan_in_use(100, "net1");
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("net1"));
    }

    #[test]
    fn test_capability_query_error() {
        let err = SriovError::capability_query("eth0", "sriov_totalvfs missing");
        assert!(err.to_string().contains("eth0"));
        assert!(err.to_string().contains("sriov_totalvfs missing"));
    }

    #[test]
    fn test_vf_not_allocated() {
        let err = SriovError::vf_not_allocated("virtfn2", "net1");
        assert_eq!(
            err.to_string(),
            "VF 'virtfn2' is not allocated from network 'net1'"
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(SriovError::resource_exhausted("net1").is_retryable());
        assert!(!SriovError::internal("bug").is_retryable());
        assert!(!SriovError::VlanOutOfRange { vlan: 9000 }.is_retryable());
        assert!(!SriovError::discovery("eth0", "enumeration failed").is_retryable());
    }
}
