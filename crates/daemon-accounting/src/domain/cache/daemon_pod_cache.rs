//! Concurrent daemon pod cache
//!
//! Records are keyed by pod identity, with a secondary node -> identities index
//! so that "all daemon pods on node N" is a single lookup. Both maps are
//! sharded, so writers for unrelated pods or nodes do not contend on one lock.
//!
//! Lock order is always `records` entry, then `node_index` entry. Readers never
//! hold a `node_index` guard while touching `records`.

use std::collections::HashSet;
use std::sync::Arc;

use api_types::DaemonCacheStats;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::types::DaemonPodRecord;
use super::types::PodIdentity;
use super::types::PodSnapshot;
use super::types::UpsertOutcome;
use crate::domain::classifier::classify;
use crate::domain::classifier::PodClassification;
use crate::domain::owner_kind::OwnerKindRegistry;
use crate::domain::traits::DaemonPodRepository;

/// Cache of daemon pods bound to nodes
#[derive(Debug)]
pub struct DaemonPodCache {
    registry: Arc<OwnerKindRegistry>,
    /// pod identity -> record
    records: DashMap<PodIdentity, Arc<DaemonPodRecord>>,
    /// node name -> identities of daemon pods bound to it
    node_index: DashMap<String, HashSet<PodIdentity>>,
}

impl DaemonPodCache {
    pub fn new(registry: Arc<OwnerKindRegistry>) -> Self {
        Self {
            registry,
            records: DashMap::new(),
            node_index: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<OwnerKindRegistry> {
        &self.registry
    }

    /// Apply an add or update event.
    ///
    /// The pod is classified afresh every time. A daemon pod bound to a node is
    /// stored (replacing any previous record and moving it between nodes if the
    /// binding changed). Anything else, including ordinary, unbound and
    /// terminal pods, evicts a stale record for the same identity.
    pub fn upsert(&self, pod: &PodSnapshot) -> UpsertOutcome {
        let classification = classify(&pod.owner_references, &self.registry);

        match pod.bound_node() {
            Some(node_name) if classification.is_daemon() && !pod.terminal => {
                self.store(DaemonPodRecord {
                    identity: pod.identity.clone(),
                    node_name: node_name.to_string(),
                    resource_requests: pod.resource_requests.clone(),
                    classification,
                });
                UpsertOutcome::Stored(classification)
            }
            _ => match self.remove(&pod.identity) {
                Some(previous) => {
                    debug!(
                        pod = %pod.identity,
                        node_name = %previous.node_name,
                        classification = %classification,
                        terminal = pod.terminal,
                        "Evicted daemon pod record after update"
                    );
                    UpsertOutcome::Removed
                }
                None => UpsertOutcome::Ignored,
            },
        }
    }

    /// Apply a delete event. Idempotent.
    pub fn remove(&self, identity: &PodIdentity) -> Option<Arc<DaemonPodRecord>> {
        match self.records.entry(identity.clone()) {
            Entry::Occupied(entry) => {
                let record = entry.get().clone();
                self.unindex(&record.node_name, identity);
                entry.remove();
                debug!(pod = %identity, node_name = %record.node_name, "Daemon pod removed");
                Some(record)
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Reconcile with a full relist of pods.
    ///
    /// Every listed pod is upserted and every cached identity missing from the
    /// list is removed. Returns the number of stale records dropped.
    pub fn resync(&self, pods: &[PodSnapshot]) -> usize {
        let listed: HashSet<&PodIdentity> = pods.iter().map(|pod| &pod.identity).collect();

        for pod in pods {
            self.upsert(pod);
        }

        let stale: Vec<PodIdentity> = self
            .records
            .iter()
            .filter(|entry| !listed.contains(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        for identity in &stale {
            self.remove(identity);
        }
        stale.len()
    }

    /// All daemon pods recorded on `node_name`.
    pub fn pods_on_node(&self, node_name: &str) -> Vec<Arc<DaemonPodRecord>> {
        let identities: Vec<PodIdentity> = match self.node_index.get(node_name) {
            Some(set) => set.iter().cloned().collect(),
            None => return Vec::new(),
        };

        identities
            .iter()
            .filter_map(|identity| self.records.get(identity).map(|entry| entry.value().clone()))
            // a concurrent move may have rebound the pod since the index read
            .filter(|record| record.node_name == node_name)
            .collect()
    }

    pub fn get(&self, identity: &PodIdentity) -> Option<Arc<DaemonPodRecord>> {
        self.records.get(identity).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, identity: &PodIdentity) -> bool {
        self.records.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sorted names of nodes with at least one daemon pod
    pub fn node_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .node_index
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Counts by classification; read only.
    pub fn stats(&self) -> DaemonCacheStats {
        let mut stats = DaemonCacheStats {
            nodes: self.node_index.len(),
            ..Default::default()
        };
        for entry in self.records.iter() {
            match entry.classification {
                PodClassification::BuiltinDaemon => stats.builtin_daemon_pods += 1,
                PodClassification::OtherDaemon => stats.other_daemon_pods += 1,
                PodClassification::Ordinary => {}
            }
        }
        stats
    }

    fn store(&self, record: DaemonPodRecord) {
        let identity = record.identity.clone();
        let record = Arc::new(record);

        match self.records.entry(identity.clone()) {
            Entry::Occupied(mut entry) => {
                let previous_node = entry.get().node_name.clone();
                if previous_node != record.node_name {
                    self.unindex(&previous_node, &identity);
                    self.index(&record.node_name, identity.clone());
                    debug!(
                        pod = %identity,
                        from = %previous_node,
                        to = %record.node_name,
                        "Daemon pod moved between nodes"
                    );
                }
                entry.insert(record);
            }
            Entry::Vacant(entry) => {
                self.index(&record.node_name, identity.clone());
                debug!(
                    pod = %identity,
                    node_name = %record.node_name,
                    classification = %record.classification,
                    "Daemon pod recorded"
                );
                entry.insert(record);
            }
        }
    }

    fn index(&self, node_name: &str, identity: PodIdentity) {
        self.node_index
            .entry(node_name.to_string())
            .or_default()
            .insert(identity);
    }

    fn unindex(&self, node_name: &str, identity: &PodIdentity) {
        if let Entry::Occupied(mut entry) = self.node_index.entry(node_name.to_string()) {
            entry.get_mut().remove(identity);
            if entry.get().is_empty() {
                entry.remove();
            }
        }
    }
}

impl DaemonPodRepository for DaemonPodCache {
    fn pods_on_node(&self, node_name: &str) -> Vec<Arc<DaemonPodRecord>> {
        DaemonPodCache::pods_on_node(self, node_name)
    }

    fn node_names(&self) -> Vec<String> {
        DaemonPodCache::node_names(self)
    }
}
