//! Types stored in and handed to the daemon pod cache

use std::fmt;

use crate::domain::classifier::OwnerRef;
use crate::domain::classifier::PodClassification;
use crate::domain::quantity::ResourceList;

/// Key identifying a pod in the cache
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct PodIdentity {
    pub namespace: String,
    pub name: String,
}

impl PodIdentity {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for PodIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Point-in-time view of a pod as delivered by the watch layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodSnapshot {
    pub identity: PodIdentity,
    /// Node the pod is bound to, `None` while pending
    pub node_name: Option<String>,
    /// Owner references in object order
    pub owner_references: Vec<OwnerRef>,
    /// Effective requests of the whole pod
    pub resource_requests: ResourceList,
    /// The pod reached phase Succeeded or Failed
    pub terminal: bool,
}

impl PodSnapshot {
    pub fn new(identity: PodIdentity) -> Self {
        Self {
            identity,
            node_name: None,
            owner_references: Vec::new(),
            resource_requests: ResourceList::new(),
            terminal: false,
        }
    }

    pub fn with_node(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = Some(node_name.into());
        self
    }

    pub fn with_owner(mut self, owner: OwnerRef) -> Self {
        self.owner_references.push(owner);
        self
    }

    pub fn with_requests(mut self, requests: ResourceList) -> Self {
        self.resource_requests = requests;
        self
    }

    pub fn with_terminal(mut self, terminal: bool) -> Self {
        self.terminal = terminal;
        self
    }

    /// Node binding, treating an empty node name as unbound.
    pub fn bound_node(&self) -> Option<&str> {
        self.node_name.as_deref().filter(|node| !node.is_empty())
    }
}

/// A daemon pod known to run on a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonPodRecord {
    pub identity: PodIdentity,
    pub node_name: String,
    pub resource_requests: ResourceList,
    /// Either [`PodClassification::BuiltinDaemon`] or [`PodClassification::OtherDaemon`]
    pub classification: PodClassification,
}

/// What an upsert did to the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A record was inserted or replaced
    Stored(PodClassification),
    /// A previously cached record was evicted
    Removed,
    /// Nothing was cached before or after
    Ignored,
}
