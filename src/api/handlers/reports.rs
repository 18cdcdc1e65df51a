use crate::{
    AppState,
    research::{progress, task::Task, TaskId},
    types::{
        AppError, CreateReportRequest, CreateReportResponse, MessageResponse, Result, StatusResponse,
        StreamDoneEvent, TaskListResponse, TaskSummary,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Start a new research workflow
#[utoipa::path(
    post,
    path = "/api/report",
    request_body = CreateReportRequest,
    responses(
        (status = 200, description = "Research workflow started", body = CreateReportResponse),
        (status = 400, description = "Empty query")
    ),
    tag = "reports"
)]
pub async fn create_report(
    State(state): State<AppState>,
    Json(payload): Json<CreateReportRequest>,
) -> Result<Json<CreateReportResponse>> {
    let task_id = state.coordinator.create(&payload.query)?;

    Ok(Json(CreateReportResponse {
        task_id,
        status: "started".to_string(),
        message: "Research workflow initiated".to_string(),
    }))
}

/// Poll the progress of a task
#[utoipa::path(
    get,
    path = "/api/report/{task_id}/status",
    params(("task_id" = String, Path, description = "Task identifier")),
    responses(
        (status = 200, description = "Current progress", body = StatusResponse),
        (status = 404, description = "Task not found")
    ),
    tag = "reports"
)]
pub async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> Result<Json<StatusResponse>> {
    let progress = state.coordinator.status(&task_id)?;
    Ok(Json(StatusResponse::new(task_id, progress)))
}

/// Fetch the full task snapshot, including the report once done
#[utoipa::path(
    get,
    path = "/api/report/{task_id}",
    params(("task_id" = String, Path, description = "Task identifier")),
    responses(
        (status = 200, description = "Task snapshot", body = Task),
        (status = 404, description = "Task not found")
    ),
    tag = "reports"
)]
pub async fn get_report(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> Result<Json<Task>> {
    Ok(Json(state.coordinator.task(&task_id)?))
}

/// Stream progress updates as Server-Sent Events
///
/// Emits a `progress` event whenever the percentage or step changes and a
/// final `done` event once the task is terminal. Ends silently on deletion.
#[utoipa::path(
    get,
    path = "/api/report/{task_id}/stream",
    params(("task_id" = String, Path, description = "Task identifier")),
    responses(
        (status = 200, description = "SSE stream of progress events", body = String, content_type = "text/event-stream"),
        (status = 404, description = "Task not found")
    ),
    tag = "reports"
)]
pub async fn stream_report(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let subscription = state.coordinator.subscribe(&task_id)?;
    let mut snapshots = subscription.into_stream();

    let stream = async_stream::stream! {
        let mut last: Option<(u8, String)> = None;

        while let Some(snapshot) = snapshots.next().await {
            let view = progress::project(&snapshot);
            let key = (view.progress_percentage, view.current_step.clone());

            if last.as_ref() != Some(&key) {
                last = Some(key);
                match Event::default()
                    .event("progress")
                    .json_data(StatusResponse::new(snapshot.id.clone(), view))
                {
                    Ok(event) => yield Ok(event),
                    Err(e) => tracing::warn!(task_id = %snapshot.id, "Failed to encode progress event: {}", e),
                }
            }

            if snapshot.is_terminal() {
                let done = StreamDoneEvent {
                    status: snapshot.stage,
                    done: true,
                };
                match Event::default().event("done").json_data(done) {
                    Ok(event) => yield Ok(event),
                    Err(e) => tracing::warn!(task_id = %snapshot.id, "Failed to encode done event: {}", e),
                }
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)))
}

/// Delete a task, cancelling any in-flight work
#[utoipa::path(
    delete,
    path = "/api/report/{task_id}",
    params(("task_id" = String, Path, description = "Task identifier")),
    responses(
        (status = 200, description = "Task deleted", body = MessageResponse),
        (status = 404, description = "Task not found")
    ),
    tag = "reports"
)]
pub async fn delete_report(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> Result<Json<MessageResponse>> {
    if !state.coordinator.delete(&task_id) {
        return Err(AppError::task_not_found(&task_id));
    }

    Ok(Json(MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}

/// List all tasks in creation order
#[utoipa::path(
    get,
    path = "/api/reports",
    responses(
        (status = 200, description = "All known tasks", body = TaskListResponse)
    ),
    tag = "reports"
)]
pub async fn list_reports(State(state): State<AppState>) -> Json<TaskListResponse> {
    let tasks: Vec<TaskSummary> = state.coordinator.list().iter().map(TaskSummary::from).collect();
    let count = tasks.len();
    Json(TaskListResponse { tasks, count })
}
