use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::presence::Domain;
use crate::web::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceStatus {
    pub drones: usize,
    pub officers: usize,
    pub officers_in_sos: usize,
    pub dashboards: usize,
    pub video_producer: bool,
    pub video_viewers: usize,
}

#[utoipa::path(
    get,
    path = "/api/status",
    tag = "status",
    responses(
        (status = 200, description = "Connection and unit counts", body = ServiceStatus)
    )
)]
pub async fn service_status(State(state): State<AppState>) -> Json<ServiceStatus> {
    let officers = state.store.snapshot_all(Domain::Personnel);
    Json(ServiceStatus {
        drones: state.store.snapshot_all(Domain::Aerial).len(),
        officers: officers.len(),
        officers_in_sos: officers.iter().filter(|unit| unit.sos_active()).count(),
        dashboards: state.hub.observer_count(),
        video_producer: state.relay.has_producer(),
        video_viewers: state.relay.viewer_count(),
    })
}
