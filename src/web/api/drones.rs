use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::broadcast::{DashboardEvent, DroneView};
use crate::presence::{Domain, Location, UnitPatch};
use crate::web::api::error::{Ack, ApiResult, ErrorResponse};
use crate::web::api::validate;
use crate::web::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct DroneList {
    pub drones: Vec<DroneView>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DroneStatusRequest {
    pub is_live: bool,
    #[serde(default)]
    pub nickname: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DroneLocationRequest {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub alt: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default = "default_live")]
    pub is_live: bool,
    /// Capture time; defaults to the time of receipt.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

fn default_live() -> bool {
    true
}

#[utoipa::path(
    get,
    path = "/api/drones",
    tag = "drones",
    responses(
        (status = 200, description = "All tracked drones", body = DroneList)
    )
)]
pub async fn list_drones(State(state): State<AppState>) -> Json<DroneList> {
    let drones = state
        .store
        .snapshot_all(Domain::Aerial)
        .iter()
        .map(DroneView::from)
        .collect();
    Json(DroneList { drones })
}

#[utoipa::path(
    post,
    path = "/api/drones/{id}/status",
    tag = "drones",
    params(("id" = String, Path, description = "Drone id")),
    request_body = DroneStatusRequest,
    responses(
        (status = 200, description = "Status applied", body = Ack),
        (status = 400, description = "Validation error", body = ErrorResponse)
    )
)]
pub async fn drone_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<DroneStatusRequest>, JsonRejection>,
) -> ApiResult<Json<Ack>> {
    let Json(body) = body?;
    let id = validate::unit_id(&id)?;

    let before = state.store.get(Domain::Aerial, id).map(|unit| unit.live);
    let unit = state.store.upsert(
        Domain::Aerial,
        id,
        UnitPatch::at(Utc::now())
            .display_name(body.nickname)
            .live(body.is_live),
    );
    if before != Some(unit.live) {
        log::info!(
            "Drone '{}' {}",
            id,
            if unit.live { "connected" } else { "disconnected" }
        );
    }

    state.hub.publish(DashboardEvent::status(Domain::Aerial, &unit));
    Ok(Json(Ack::ok()))
}

#[utoipa::path(
    post,
    path = "/api/drones/{id}/location",
    tag = "drones",
    params(("id" = String, Path, description = "Drone id")),
    request_body = DroneLocationRequest,
    responses(
        (status = 200, description = "Location applied", body = Ack),
        (status = 400, description = "Validation error", body = ErrorResponse)
    )
)]
pub async fn drone_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<DroneLocationRequest>, JsonRejection>,
) -> ApiResult<Json<Ack>> {
    let Json(body) = body?;
    let id = validate::unit_id(&id)?;
    validate::coordinates(body.lat, body.lng)?;
    validate::finite("speed", body.speed)?;
    validate::finite("alt", body.alt)?;
    validate::finite("heading", body.heading)?;

    let timestamp = body.timestamp.unwrap_or_else(Utc::now);
    let location = Location {
        speed: body.speed,
        alt: body.alt,
        heading: body.heading,
        ..Location::new(body.lat, body.lng, timestamp)
    };
    let unit = state.store.upsert(
        Domain::Aerial,
        id,
        UnitPatch::at(timestamp)
            .display_name(body.nickname)
            .live(body.is_live)
            .location(location),
    );

    state.hub.publish(DashboardEvent::location(Domain::Aerial, &unit));
    Ok(Json(Ack::ok()))
}
