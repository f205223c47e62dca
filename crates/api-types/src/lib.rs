//! Shared API type definitions
//!
//! This crate contains the response types served by the daemon accounting
//! exposition API, so that consumers (dashboards, the scheduling engine's
//! debug tooling) can deserialize them without depending on the core crate.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// Counts of cached daemon pods by classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DaemonCacheStats {
    /// Pods owned by the built-in DaemonSet controller
    pub builtin_daemon_pods: usize,
    /// Pods owned by a configured other-daemon owner kind
    pub other_daemon_pods: usize,
    /// Nodes with at least one cached daemon pod
    pub nodes: usize,
}

impl DaemonCacheStats {
    /// Total number of cached daemon pods
    pub fn total_pods(&self) -> usize {
        self.builtin_daemon_pods + self.other_daemon_pods
    }
}

/// Resources reserved on a node by daemon pods
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeReservedCapacity {
    /// Node name
    pub node_name: String,
    /// Resource name to canonical quantity string, e.g. `cpu` -> `100m`
    pub reserved: BTreeMap<String, String>,
}

/// Response for the cache statistics endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Whether the request was successful
    pub success: bool,
    /// Statistics data (present when successful)
    pub data: Option<DaemonCacheStats>,
    /// Response message
    pub message: String,
}

/// Response for a single node's reserved capacity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeReservedResponse {
    /// Whether the request was successful
    pub success: bool,
    /// Reserved capacity (present when successful)
    pub data: Option<NodeReservedCapacity>,
    /// Response message
    pub message: String,
}

/// Response listing the reserved capacity of every tracked node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeReservationsResponse {
    /// Whether the request was successful
    pub success: bool,
    /// One entry per node, ordered by node name
    pub data: Vec<NodeReservedCapacity>,
    /// Response message
    pub message: String,
}

/// Response listing the configured other-daemon owner kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerKindsResponse {
    /// Whether the request was successful
    pub success: bool,
    /// Entries in `group/version/kind` form, sorted
    pub data: Vec<String>,
    /// Response message
    pub message: String,
}
