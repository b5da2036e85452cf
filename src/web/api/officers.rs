use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::broadcast::{DashboardEvent, OfficerView};
use crate::presence::{Domain, Location, TrackedUnit, UnitPatch};
use crate::storage::KnownPersonnel;
use crate::web::api::error::{Ack, ApiResult, ErrorResponse};
use crate::web::api::validate;
use crate::web::state::AppState;

pub const POOR_ACCURACY: &str = "poor_accuracy";

#[derive(Debug, Serialize, ToSchema)]
pub struct OfficerList {
    pub officers: Vec<OfficerView>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OfficerStatusRequest {
    pub is_online: bool,
    pub officer_name: String,
    #[serde(default)]
    pub badge_number: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OfficerLocationRequest {
    pub lat: f64,
    pub lng: f64,
    pub officer_name: String,
    #[serde(default)]
    pub badge_number: Option<String>,
    /// Reported GPS accuracy in metres.
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[utoipa::path(
    get,
    path = "/api/officers",
    tag = "officers",
    responses(
        (status = 200, description = "All tracked officers", body = OfficerList)
    )
)]
pub async fn list_officers(State(state): State<AppState>) -> Json<OfficerList> {
    let officers = state
        .store
        .snapshot_all(Domain::Personnel)
        .iter()
        .map(OfficerView::from)
        .collect();
    Json(OfficerList { officers })
}

#[utoipa::path(
    post,
    path = "/api/officers/{id}/status",
    tag = "officers",
    params(("id" = String, Path, description = "Officer id")),
    request_body = OfficerStatusRequest,
    responses(
        (status = 200, description = "Status applied", body = Ack),
        (status = 400, description = "Validation error", body = ErrorResponse)
    )
)]
pub async fn officer_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<OfficerStatusRequest>, JsonRejection>,
) -> ApiResult<Json<Ack>> {
    let Json(body) = body?;
    let id = validate::unit_id(&id)?;

    let unit = state.store.upsert(
        Domain::Personnel,
        id,
        UnitPatch::at(Utc::now())
            .display_name(Some(body.officer_name))
            .badge_number(body.badge_number)
            .live(body.is_online),
    );
    log::info!(
        "Officer '{}' is {}",
        id,
        if unit.live { "online" } else { "offline" }
    );
    persist(&state, &unit);

    state.hub.publish(DashboardEvent::status(Domain::Personnel, &unit));
    Ok(Json(Ack::ok()))
}

#[utoipa::path(
    post,
    path = "/api/officers/{id}/location",
    tag = "officers",
    params(("id" = String, Path, description = "Officer id")),
    request_body = OfficerLocationRequest,
    responses(
        (status = 200, description = "Location applied, or discarded with ok=false", body = Ack),
        (status = 400, description = "Validation error", body = ErrorResponse)
    )
)]
pub async fn officer_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<OfficerLocationRequest>, JsonRejection>,
) -> ApiResult<Json<Ack>> {
    let Json(body) = body?;
    let id = validate::unit_id(&id)?;
    validate::coordinates(body.lat, body.lng)?;
    validate::finite("accuracy", body.accuracy)?;

    if let Some(accuracy) = body.accuracy {
        if accuracy > state.config.presence.max_accuracy_m {
            log::debug!(
                "Discarding location of officer '{}': accuracy {} m",
                id,
                accuracy
            );
            return Ok(Json(Ack::rejected(POOR_ACCURACY)));
        }
    }

    let now = Utc::now();
    let location = Location {
        accuracy: body.accuracy,
        ..Location::new(body.lat, body.lng, body.timestamp.unwrap_or(now))
    };
    let unit = state.store.upsert(
        Domain::Personnel,
        id,
        UnitPatch::at(now)
            .display_name(Some(body.officer_name))
            .badge_number(body.badge_number)
            .live(true)
            .location(location),
    );
    persist(&state, &unit);

    state.hub.publish(DashboardEvent::location(Domain::Personnel, &unit));
    Ok(Json(Ack::ok()))
}

/// Best-effort write of the officer's position, name and badge. Officers
/// that never reported a location have nothing to restore and are skipped.
fn persist(state: &AppState, unit: &TrackedUnit) {
    let Some(person) = KnownPersonnel::from_unit(unit) else {
        return;
    };
    if let Err(e) = state.repository.record_location(&person) {
        log::warn!("Failed to persist officer '{}': {}", unit.unit_id, e);
    }
}
