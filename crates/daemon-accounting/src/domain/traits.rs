//! Traits at the seam between the daemon pod cache and its readers

use std::sync::Arc;

use super::cache::DaemonPodRecord;

/// Read access to daemon pods grouped by node
pub trait DaemonPodRepository: Send + Sync {
    /// All daemon pods currently recorded on `node_name`, empty for unknown nodes
    fn pods_on_node(&self, node_name: &str) -> Vec<Arc<DaemonPodRecord>>;

    /// Names of all nodes with at least one recorded daemon pod
    fn node_names(&self) -> Vec<String>;
}
