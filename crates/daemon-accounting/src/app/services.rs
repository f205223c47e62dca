use std::sync::Arc;

use crate::domain::accountant::NodeCapacityAccountant;
use crate::domain::cache::DaemonPodCache;
use crate::domain::owner_kind::OwnerKindRegistry;
use crate::infrastructure::k8s::PodWatcher;

/// Application dependencies - simple struct with Arc-wrapped services
pub struct ApplicationServices {
    pub registry: Arc<OwnerKindRegistry>,
    pub cache: Arc<DaemonPodCache>,
    pub accountant: Arc<NodeCapacityAccountant>,
    pub pod_watcher: Arc<PodWatcher>,
}
