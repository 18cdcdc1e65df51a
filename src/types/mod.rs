use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::research::progress::TaskProgress;
use crate::research::task::{Stage, Task, TaskId};

// ============= API Request/Response Types =============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateReportRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateReportResponse {
    pub task_id: TaskId,
    pub status: String,
    pub message: String,
}

/// Polling view of a task, derived from the same projection the stream uses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub task_id: TaskId,
    pub status: Stage,
    pub current_step: String,
    pub progress_percentage: u8,
    pub sub_questions_count: usize,
    pub completed_questions: usize,
}

impl StatusResponse {
    pub fn new(task_id: TaskId, progress: TaskProgress) -> Self {
        Self {
            task_id,
            status: progress.stage,
            current_step: progress.current_step,
            progress_percentage: progress.progress_percentage,
            sub_questions_count: progress.sub_question_count,
            completed_questions: progress.completed_count,
        }
    }
}

/// Final event emitted on the SSE stream once a task is terminal.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StreamDoneEvent {
    pub status: Stage,
    pub done: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskSummary {
    pub task_id: TaskId,
    pub query: String,
    pub status: Stage,
    pub progress_percentage: u8,
    pub created_at: DateTime<Utc>,
    pub has_report: bool,
}

impl From<&Task> for TaskSummary {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            query: task.query.clone(),
            status: task.stage,
            progress_percentage: task.progress_percentage,
            created_at: task.created_at,
            has_report: task.report.is_some(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskSummary>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AppError {
    /// Error returned for any read or delete against an unknown task id.
    pub fn task_not_found(id: &TaskId) -> Self {
        AppError::NotFound(format!("Task {} not found", id))
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::LLM(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (axum::http::StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::Configuration(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
