//! Kubernetes integration module.
//!
//! Pods are watched cluster wide and converted into snapshots that feed the
//! daemon pod cache.
//!
//! The main components are:
//! - [`PodWatcher`]: Watches for pod add/update/delete/relist events
//! - [`EventDispatcher`]: Applies those events to the cache on a worker pool
//! - [`snapshot`]: Converts API pods, including effective resource requests

pub mod event_dispatcher;
pub mod pod_watcher;
pub mod snapshot;
pub mod types;

pub use event_dispatcher::EventDispatcher;
pub use pod_watcher::PodWatcher;
pub use snapshot::SnapshotError;
pub use types::KubernetesError;
pub use types::PodEvent;
