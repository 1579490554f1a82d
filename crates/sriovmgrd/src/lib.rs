//! sriovmgrd - SR-IOV VF resource manager for the container network driver
//!
//! Tracks which virtual functions of an SR-IOV capable NIC are free or
//! assigned, hands one out per container endpoint, reclaims it on
//! teardown, and enforces one VLAN tag per logical network with no
//! cross-network collisions.

mod network;
mod registry;
mod sriov_mgr;
mod types;

pub use network::SriovNetwork;
pub use registry::NetworkRegistry;
pub use sriov_mgr::SriovMgr;
pub use types::*;
