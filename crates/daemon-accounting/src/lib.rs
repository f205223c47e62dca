//! Daemon capacity accounting for cluster autoscaling.
//!
//! Pods controlled by the built-in DaemonSet kind, or by any operator-configured
//! owner kind, are treated as daemon pods: they never justify provisioning a
//! node, are never moved off a node being drained, and their resource requests
//! are counted as overhead of the node they run on.

pub mod api;
pub mod app;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use domain::accountant::NodeCapacityAccountant;
pub use domain::cache::DaemonPodCache;
pub use domain::classifier::PodClassification;
pub use domain::owner_kind::OwnerKindRegistry;
