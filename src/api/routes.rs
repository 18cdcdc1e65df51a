use crate::AppState;
use crate::api::handlers::{health, reports};
use crate::types::{AppError, Result};
use crate::utils::toml_config::ServerConfig;
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};

/// Routes mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/report", post(reports::create_report))
        .route(
            "/report/{task_id}",
            get(reports::get_report).delete(reports::delete_report),
        )
        .route("/report/{task_id}/status", get(reports::get_status))
        .route("/report/{task_id}/stream", get(reports::stream_report))
        .route("/reports", get(reports::list_reports))
}

/// Full application router: health at the root, everything else under `/api`
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(health::health))
        .route("/health", get(health::health))
        .nest("/api", api_routes())
}

/// CORS policy for the configured origins.
///
/// No origins (or `"*"`) allows any origin without credentials. An explicit
/// list allows credentials, which rules out wildcard methods and headers, so
/// those mirror the preflight request instead.
pub fn cors_layer(server: &ServerConfig) -> Result<CorsLayer> {
    if server.allowed_origins.is_empty() || server.allowed_origins.iter().any(|o| o == "*") {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    let origins = server
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|_| AppError::Configuration(format!("Invalid CORS origin '{}'", origin)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}
