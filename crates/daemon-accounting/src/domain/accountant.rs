//! Per-node capacity accounting for daemon pods.
//!
//! This is what the scheduling engine consults while simulating: which pods
//! may trigger provisioning or be displaced, how much of a node daemon pods
//! already hold, and how much a fresh node from a template will lose to them.

use std::sync::Arc;

use api_types::NodeReservedCapacity;
use tracing::debug;

use super::cache::DaemonPodCache;
use super::cache::PodSnapshot;
use super::classifier::classify;
use super::classifier::ClassificationContext;
use super::classifier::PodClassification;
use super::owner_kind::OwnerKindRegistry;
use super::quantity::ResourceList;
use super::traits::DaemonPodRepository;

/// Computes reserved capacity from a daemon pod repository
#[derive(Debug)]
pub struct NodeCapacityAccountant<R = DaemonPodCache> {
    registry: Arc<OwnerKindRegistry>,
    repository: Arc<R>,
}

impl<R> Clone for NodeCapacityAccountant<R> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
        }
    }
}

impl<R: DaemonPodRepository> NodeCapacityAccountant<R> {
    pub fn new(registry: Arc<OwnerKindRegistry>, repository: Arc<R>) -> Self {
        Self {
            registry,
            repository,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub fn registry(&self) -> &Arc<OwnerKindRegistry> {
        &self.registry
    }

    pub fn classify(&self, pod: &PodSnapshot) -> PodClassification {
        classify(&pod.owner_references, &self.registry)
    }

    /// Whether a pending `pod` may justify adding a node. Daemon pods never do.
    pub fn is_provisionable(&self, pod: &PodSnapshot) -> bool {
        !self.classify(pod).is_daemon()
    }

    /// Whether `pod` may be moved elsewhere when draining a node. Daemon pods may not.
    pub fn is_reschedulable(&self, pod: &PodSnapshot) -> bool {
        !self.classify(pod).is_daemon()
    }

    /// Sum of the requests of all daemon pods recorded on `node_name`.
    ///
    /// Records are immutable shared values, so each one is summed whole even
    /// while the cache is being updated concurrently.
    pub fn reserved_capacity(&self, node_name: &str) -> ResourceList {
        self.repository
            .pods_on_node(node_name)
            .iter()
            .map(|record| &record.resource_requests)
            .collect()
    }

    /// `allocatable` minus reserved capacity, clamped at zero per resource.
    pub fn remaining_capacity(&self, node_name: &str, allocatable: &ResourceList) -> ResourceList {
        allocatable.saturating_sub(&self.reserved_capacity(node_name))
    }

    /// Whether `candidate` fits on `node_name` next to its daemon pods.
    ///
    /// A candidate that is itself recorded on the node is not counted twice.
    pub fn can_admit(
        &self,
        node_name: &str,
        allocatable: &ResourceList,
        candidate: &PodSnapshot,
    ) -> bool {
        let reserved: ResourceList = self
            .repository
            .pods_on_node(node_name)
            .iter()
            .filter(|record| record.identity != candidate.identity)
            .map(|record| &record.resource_requests)
            .collect();
        let remaining = allocatable.saturating_sub(&reserved);
        let fits = candidate.resource_requests.fits_within(&remaining);

        debug!(
            node_name = node_name,
            pod = %candidate.identity,
            fits = fits,
            "Evaluated pod admission against daemon overhead"
        );
        fits
    }

    /// Overhead a new node built from a template will carry.
    ///
    /// `pods` are the pods expected to land on such a node; only daemon pods
    /// (built-in or other) contribute.
    pub fn template_reserved_capacity(&self, pods: &[PodSnapshot]) -> ResourceList {
        pods.iter()
            .filter(|pod| self.classify(pod).is_daemon())
            .map(|pod| &pod.resource_requests)
            .collect()
    }

    /// Reserved capacity of one node in exposition form.
    pub fn node_reservation(&self, node_name: &str) -> NodeReservedCapacity {
        NodeReservedCapacity {
            node_name: node_name.to_string(),
            reserved: self.reserved_capacity(node_name).to_string_map(),
        }
    }

    /// Reserved capacity of every tracked node, ordered by node name.
    pub fn node_reservations(&self) -> Vec<NodeReservedCapacity> {
        let mut nodes = self.repository.node_names();
        nodes.sort();
        nodes
            .iter()
            .map(|node_name| self.node_reservation(node_name))
            .collect()
    }
}

impl<R> ClassificationContext for NodeCapacityAccountant<R> {
    fn owner_kind_registry(&self) -> Option<&OwnerKindRegistry> {
        Some(self.registry.as_ref())
    }
}
