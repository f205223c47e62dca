use core::error::Error;

use crate::domain::cache::PodIdentity;
use crate::domain::cache::PodSnapshot;

/// Pod changes as seen by the informer, already converted to snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodEvent {
    /// A pod was added or updated
    Applied(PodSnapshot),
    /// A pod was deleted
    Deleted(PodIdentity),
    /// The watch was relisted; the snapshots are the complete current pod set
    Restarted(Vec<PodSnapshot>),
}

/// Errors that can occur during Kubernetes operations.
#[derive(Debug, derive_more::Display)]
pub enum KubernetesError {
    #[display("Failed to connect to Kubernetes API: {message}")]
    ConnectionFailed { message: String },
    #[display("Failed to watch pods: {message}")]
    WatchFailed { message: String },
    #[display("Failed to deliver pod event: {message}")]
    EventDeliveryFailed { message: String },
}

impl Error for KubernetesError {}
