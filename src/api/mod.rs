//! HTTP API Handlers and Routes
//!
//! This module provides the REST API layer for ScholarSynth, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Reports (`/api`)
//! - `POST /api/report` - Start a research workflow
//! - `GET /api/report/{task_id}/status` - Poll progress
//! - `GET /api/report/{task_id}/stream` - Server-Sent Events progress stream
//! - `GET /api/report/{task_id}` - Full task snapshot and report
//! - `DELETE /api/report/{task_id}` - Delete a task and cancel its work
//! - `GET /api/reports` - List all tasks
//!
//! ## Health
//! - `GET /` and `GET /health` - Health check endpoint
//!
//! # OpenAPI Documentation
//!
//! When the `swagger-ui` feature is enabled, interactive API documentation
//! is available at `/swagger-ui/`.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

use utoipa::OpenApi;

/// OpenAPI document for the HTTP surface
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::reports::create_report,
        handlers::reports::get_status,
        handlers::reports::get_report,
        handlers::reports::stream_report,
        handlers::reports::delete_report,
        handlers::reports::list_reports,
    ),
    components(schemas(
        crate::types::CreateReportRequest,
        crate::types::CreateReportResponse,
        crate::types::StatusResponse,
        crate::types::StreamDoneEvent,
        crate::types::TaskSummary,
        crate::types::TaskListResponse,
        crate::types::MessageResponse,
        crate::types::HealthResponse,
        crate::research::Task,
        crate::research::TaskId,
        crate::research::Stage,
        crate::research::SubQuestionState,
        crate::research::SubQuestionStatus,
        crate::research::Citation,
        crate::research::Report,
    )),
    tags(
        (name = "reports", description = "Research report workflows"),
        (name = "health", description = "Service health")
    ),
    info(title = "ScholarSynth API", description = "Multi-stage research report generation")
)]
pub struct ApiDoc;
