//! Conversion of API pods into [`PodSnapshot`]s.
//!
//! Requests are computed for the whole pod the way the scheduler sizes it:
//! regular containers and sidecars run together, ordinary init containers run
//! one at a time next to the sidecars started before them, and pod overhead
//! comes on top.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Container;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::api::core::v1::PodSpec;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use thiserror::Error;

use crate::domain::cache::PodIdentity;
use crate::domain::cache::PodSnapshot;
use crate::domain::classifier::OwnerRef;
use crate::domain::quantity::QuantityError;
use crate::domain::quantity::ResourceList;

const DEFAULT_NAMESPACE: &str = "default";
const RESTART_POLICY_ALWAYS: &str = "Always";
const TERMINAL_PHASES: [&str; 2] = ["Succeeded", "Failed"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("pod has no name")]
    MissingName,
    #[error("pod {pod}: invalid quantity in {source_name}: {source}")]
    InvalidQuantity {
        pod: PodIdentity,
        source_name: String,
        source: QuantityError,
    },
}

/// Namespace and name of `pod`; a missing namespace means `default`.
pub fn pod_identity(pod: &Pod) -> Result<PodIdentity, SnapshotError> {
    let name = pod
        .metadata
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or(SnapshotError::MissingName)?;
    let namespace = pod
        .metadata
        .namespace
        .as_deref()
        .filter(|namespace| !namespace.is_empty())
        .unwrap_or(DEFAULT_NAMESPACE);
    Ok(PodIdentity::new(namespace, name))
}

/// Build the snapshot the cache consumes from an API pod.
///
/// # Errors
///
/// - [`SnapshotError::MissingName`] if the pod has no name
/// - [`SnapshotError::InvalidQuantity`] if any request or overhead does not parse
pub fn to_snapshot(pod: &Pod) -> Result<PodSnapshot, SnapshotError> {
    let identity = pod_identity(pod)?;

    let requests = match &pod.spec {
        Some(spec) => effective_requests(&identity, spec)?,
        None => ResourceList::new(),
    };
    let terminal = pod
        .status
        .as_ref()
        .and_then(|status| status.phase.as_deref())
        .is_some_and(|phase| TERMINAL_PHASES.contains(&phase));

    let mut snapshot = PodSnapshot::new(identity)
        .with_requests(requests)
        .with_terminal(terminal);
    if let Some(node_name) = pod.spec.as_ref().and_then(|spec| spec.node_name.as_deref()) {
        snapshot = snapshot.with_node(node_name);
    }
    for owner in pod.metadata.owner_references.iter().flatten() {
        snapshot = snapshot.with_owner(OwnerRef::from_api_version(
            &owner.api_version,
            owner.kind.as_str(),
            owner.controller.unwrap_or(false),
        ));
    }
    Ok(snapshot)
}

/// Effective resource requests of a pod spec.
pub fn effective_requests(
    pod: &PodIdentity,
    spec: &PodSpec,
) -> Result<ResourceList, SnapshotError> {
    let mut requests = ResourceList::new();
    for container in &spec.containers {
        requests += &container_requests(pod, container)?;
    }

    let mut sidecars = ResourceList::new();
    let mut init_peak = ResourceList::new();
    for container in spec.init_containers.iter().flatten() {
        let own = container_requests(pod, container)?;
        if container.restart_policy.as_deref() == Some(RESTART_POLICY_ALWAYS) {
            requests += &own;
            sidecars += &own;
            init_peak.max_assign(&sidecars);
        } else {
            let mut running = own;
            running += &sidecars;
            init_peak.max_assign(&running);
        }
    }
    requests.max_assign(&init_peak);

    if let Some(overhead) = &spec.overhead {
        requests += &parse_quantities(pod, "overhead", overhead)?;
    }
    Ok(requests)
}

fn container_requests(
    pod: &PodIdentity,
    container: &Container,
) -> Result<ResourceList, SnapshotError> {
    match container
        .resources
        .as_ref()
        .and_then(|resources| resources.requests.as_ref())
    {
        Some(requests) => parse_quantities(pod, &format!("container {}", container.name), requests),
        None => Ok(ResourceList::new()),
    }
}

fn parse_quantities(
    pod: &PodIdentity,
    source_name: &str,
    quantities: &BTreeMap<String, Quantity>,
) -> Result<ResourceList, SnapshotError> {
    ResourceList::parse(quantities.iter().map(|(name, quantity)| (name.as_str(), &quantity.0)))
        .map_err(|source| SnapshotError::InvalidQuantity {
            pod: pod.clone(),
            source_name: source_name.to_string(),
            source,
        })
}
