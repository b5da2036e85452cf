use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::storage;

use super::api::drones as drone_handlers;
use super::api::officers as officer_handlers;
use super::api::sos as sos_handlers;
use super::api::status as status_handlers;
use super::api_doc::ApiDoc;
use super::config::Config;
use super::state::AppState;
use super::ws;

pub async fn run_server(config: Config) -> std::io::Result<()> {
    let bind_addr = config.web.bind.clone();
    let repository = storage::open(config.storage.base_folder.clone())
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let state = AppState::new(config, repository);
    let app = router(state);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.web.allowed_origins);

    Router::new()
        // Drone ingestion
        .route("/api/drones", get(drone_handlers::list_drones))
        .route("/api/drones/{id}/status", post(drone_handlers::drone_status))
        .route(
            "/api/drones/{id}/location",
            post(drone_handlers::drone_location),
        )
        // Officer ingestion
        .route("/api/officers", get(officer_handlers::list_officers))
        .route(
            "/api/officers/{id}/status",
            post(officer_handlers::officer_status),
        )
        .route(
            "/api/officers/{id}/location",
            post(officer_handlers::officer_location),
        )
        // SOS
        .route("/api/officers/{id}/sos", post(sos_handlers::trigger_sos))
        .route(
            "/api/officers/{id}/sos/cancel",
            post(sos_handlers::cancel_sos),
        )
        .route(
            "/api/officers/{id}/sos/resolve",
            post(sos_handlers::resolve_sos),
        )
        .route("/api/status", get(status_handlers::service_status))
        // Real-time channels
        .route("/ws/locations", get(ws::locations))
        .route("/ws/video/feed", get(ws::video_feed))
        .route("/ws/video/upload", get(ws::video_upload))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}
