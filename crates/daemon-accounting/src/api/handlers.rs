use std::sync::Arc;

use poem::handler;
use poem::web::Data;
use poem::web::Json;
use poem::web::Path;
use tracing::debug;

use super::NodeReservationsResponse;
use super::NodeReservedResponse;
use super::OwnerKindsResponse;
use super::StatsResponse;
use crate::domain::accountant::NodeCapacityAccountant;

/// Daemon pod cache statistics
#[handler]
pub async fn get_stats(
    accountant: Data<&Arc<NodeCapacityAccountant>>,
) -> poem::Result<Json<StatsResponse>> {
    let stats = accountant.repository().stats();

    Ok(Json(StatsResponse {
        success: true,
        data: Some(stats),
        message: format!("{} daemon pods on {} nodes", stats.total_pods(), stats.nodes),
    }))
}

/// Reserved capacity of every node with at least one daemon pod
#[handler]
pub async fn list_node_reservations(
    accountant: Data<&Arc<NodeCapacityAccountant>>,
) -> poem::Result<Json<NodeReservationsResponse>> {
    let reservations = accountant.node_reservations();

    Ok(Json(NodeReservationsResponse {
        success: true,
        message: format!("Reserved capacity of {} nodes", reservations.len()),
        data: reservations,
    }))
}

/// Reserved capacity of one node; unknown nodes reserve nothing
#[handler]
pub async fn get_node_reserved(
    Path(node_name): Path<String>,
    accountant: Data<&Arc<NodeCapacityAccountant>>,
) -> poem::Result<Json<NodeReservedResponse>> {
    let reservation = accountant.node_reservation(&node_name);
    debug!(
        node_name = %node_name,
        resources = reservation.reserved.len(),
        "Served node reservation"
    );

    Ok(Json(NodeReservedResponse {
        success: true,
        data: Some(reservation),
        message: format!("Reserved capacity of node {node_name}"),
    }))
}

/// Configured other-daemon owner kinds, sorted
#[handler]
pub async fn list_owner_kinds(
    accountant: Data<&Arc<NodeCapacityAccountant>>,
) -> poem::Result<Json<OwnerKindsResponse>> {
    let kinds: Vec<String> = accountant
        .registry()
        .iter()
        .map(ToString::to_string)
        .collect();

    Ok(Json(OwnerKindsResponse {
        success: true,
        message: format!("{} owner kinds configured", kinds.len()),
        data: kinds,
    }))
}
