use utoipa::OpenApi;

use super::api::drones::{DroneList, DroneLocationRequest, DroneStatusRequest};
use super::api::error::{Ack, ErrorResponse};
use super::api::officers::{OfficerList, OfficerLocationRequest, OfficerStatusRequest};
use super::api::sos::{SosCancelRequest, SosTriggerRequest, SosTriggerResponse};
use super::api::status::ServiceStatus;

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::drones::list_drones,
        super::api::drones::drone_status,
        super::api::drones::drone_location,
        super::api::officers::list_officers,
        super::api::officers::officer_status,
        super::api::officers::officer_location,
        super::api::sos::trigger_sos,
        super::api::sos::cancel_sos,
        super::api::sos::resolve_sos,
        super::api::status::service_status,
    ),
    components(
        schemas(
            Ack,
            ErrorResponse,
            DroneList,
            DroneStatusRequest,
            DroneLocationRequest,
            OfficerList,
            OfficerStatusRequest,
            OfficerLocationRequest,
            SosTriggerRequest,
            SosTriggerResponse,
            SosCancelRequest,
            ServiceStatus,
            crate::broadcast::DroneView,
            crate::broadcast::OfficerView,
            crate::presence::Location,
            crate::presence::SosKind,
        )
    ),
    info(
        title = "Fieldlink API",
        description = "Ingestion API for drone and officer presence, SOS alerts and service status",
        version = "0.1.0"
    ),
    tags(
        (name = "drones", description = "Aerial unit status and location"),
        (name = "officers", description = "Personnel status and location"),
        (name = "sos", description = "Emergency alerts"),
        (name = "status", description = "Service read-out")
    )
)]
pub struct ApiDoc;
