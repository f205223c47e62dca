//! Node-keyed cache of daemon pods (built-in and other daemons)

pub mod daemon_pod_cache;
pub mod types;

pub use daemon_pod_cache::DaemonPodCache;
pub use types::DaemonPodRecord;
pub use types::PodIdentity;
pub use types::PodSnapshot;
pub use types::UpsertOutcome;
