pub mod accountant;
pub mod cache;
pub mod classifier;
pub mod owner_kind;
pub mod quantity;
pub mod traits;

// Re-export the types most call sites need
pub use accountant::NodeCapacityAccountant;
pub use cache::DaemonPodCache;
pub use cache::DaemonPodRecord;
pub use cache::PodIdentity;
pub use cache::PodSnapshot;
pub use classifier::classify;
pub use classifier::classify_in_context;
pub use classifier::ClassificationContext;
pub use classifier::OwnerRef;
pub use classifier::PodClassification;
pub use owner_kind::ConfigError;
pub use owner_kind::OwnerKind;
pub use owner_kind::OwnerKindRegistry;
pub use quantity::ResourceList;
pub use quantity::ResourceQuantity;
