use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::presence::{Location, SosKind};
use crate::sos::SosRequest;
use crate::web::api::error::{Ack, ApiError, ApiResult, ErrorResponse};
use crate::web::api::validate;
use crate::web::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SosTriggerRequest {
    pub lat: f64,
    pub lng: f64,
    pub officer_name: String,
    #[serde(default)]
    pub badge_number: Option<String>,
    pub emergency_type: SosKind,
    #[serde(default)]
    pub message_text: Option<String>,
    /// URL of an uploaded audio or image attachment.
    #[serde(default)]
    pub media_ref: Option<String>,
    /// Length of the audio attachment in seconds.
    #[serde(default)]
    pub audio_duration: Option<f64>,
    /// Overrides the configured search radius.
    #[serde(default)]
    pub radius_km: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SosTriggerResponse {
    pub ok: bool,
    pub nearby_officers: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SosCancelRequest {
    #[serde(default = "default_cancel_reason")]
    pub reason: String,
}

impl Default for SosCancelRequest {
    fn default() -> Self {
        Self {
            reason: default_cancel_reason(),
        }
    }
}

fn default_cancel_reason() -> String {
    "cancelled_by_officer".to_string()
}

#[utoipa::path(
    post,
    path = "/api/officers/{id}/sos",
    tag = "sos",
    params(("id" = String, Path, description = "Officer id")),
    request_body = SosTriggerRequest,
    responses(
        (status = 200, description = "Alert raised", body = SosTriggerResponse),
        (status = 400, description = "Validation error", body = ErrorResponse)
    )
)]
pub async fn trigger_sos(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<SosTriggerRequest>, JsonRejection>,
) -> ApiResult<Json<SosTriggerResponse>> {
    let Json(body) = body?;
    let id = validate::unit_id(&id)?;
    validate::coordinates(body.lat, body.lng)?;
    validate::finite("audio_duration", body.audio_duration)?;
    validate::radius(body.radius_km)?;

    let request = SosRequest {
        unit_id: id.to_string(),
        location: Location::new(body.lat, body.lng, Utc::now()),
        kind: body.emergency_type,
        message: body.message_text,
        media_ref: body.media_ref,
        audio_duration: body.audio_duration,
        display_name: Some(body.officer_name),
        badge_number: body.badge_number,
    };
    let nearby_officers = match body.radius_km {
        Some(radius) => state.sos.trigger_within(request, radius),
        None => state.sos.trigger(request),
    };

    Ok(Json(SosTriggerResponse {
        ok: true,
        nearby_officers,
    }))
}

#[utoipa::path(
    post,
    path = "/api/officers/{id}/sos/cancel",
    tag = "sos",
    params(("id" = String, Path, description = "Officer id")),
    request_body(content = SosCancelRequest, description = "Optional; defaults to reason cancelled_by_officer"),
    responses(
        (status = 200, description = "SOS cleared", body = Ack),
        (status = 400, description = "Validation error", body = ErrorResponse)
    )
)]
pub async fn cancel_sos(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Ack>> {
    let id = validate::unit_id(&id)?;
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        SosCancelRequest::default()
    } else {
        serde_json::from_slice::<SosCancelRequest>(&body)
            .map_err(|e| ApiError::Validation(e.to_string()))?
    };

    state.sos.cancel(id, &request.reason);
    Ok(Json(Ack::ok()))
}

#[utoipa::path(
    post,
    path = "/api/officers/{id}/sos/resolve",
    tag = "sos",
    params(("id" = String, Path, description = "Officer id")),
    responses(
        (status = 200, description = "SOS resolved", body = Ack),
        (status = 400, description = "Validation error", body = ErrorResponse)
    )
)]
pub async fn resolve_sos(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Ack>> {
    let id = validate::unit_id(&id)?;
    state.sos.resolve(id);
    Ok(Json(Ack::ok()))
}
