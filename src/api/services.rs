//! Task endpoint handlers.
//!
//! Thin wrappers over [`QueueService`](crate::queue::QueueService): extract
//! the payload, call the boundary operation, map [`ServiceError`] variants to
//! HTTP statuses via [`ApiError`]. No queue policy lives here.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::error::ApiError;
use super::models::{
    HealthResponse, LanguageRequest, MessageResponse, ResetResponse, RestartRequest,
    SubmitRequest, TaskListResponse,
};
use super::state::AppState;

/// POST /api/tasks
///
/// Create a task from a source URL, or re-queue the existing task for the
/// same catalog id. Unparsable URLs and languages outside the configured
/// whitelist are rejected before any state mutation.
pub async fn submit_task(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.service.submit(&request.url, &request.language)?;
    Ok((StatusCode::OK, Json(task)))
}

/// GET /api/tasks
pub async fn list_tasks(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let tasks = state.service.list()?;
    let current_log = state.service.current_log();
    Ok(Json(TaskListResponse { tasks, current_log }))
}

/// GET /api/tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.service.get(&id)?;
    Ok(Json(task))
}

/// POST /api/tasks/{id}/cancel
pub async fn cancel_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.service.cancel(&id)?;
    Ok(Json(task))
}

/// POST /api/tasks/{id}/restart
///
/// The body is optional; `{"overwrite": true}` instructs the next run to
/// replace existing output.
pub async fn restart_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Option<Json<RestartRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let overwrite = request.map(|Json(r)| r.overwrite).unwrap_or_default();
    let task = state.service.restart(&id, overwrite)?;
    Ok(Json(task))
}

/// PATCH /api/tasks/{id}/language
pub async fn update_language(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<LanguageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.service.update_language(&id, &request.language)?;
    Ok(Json(task))
}

/// DELETE /api/tasks/{id}
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.service.delete(&id)?;
    Ok(Json(MessageResponse {
        message: format!("task {} deleted", task.display_name),
    }))
}

/// POST /api/tasks/reset
///
/// Re-queue every task that is not currently running.
pub async fn reset_tasks(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let reset = state.service.reset_all_non_running()?;
    Ok(Json(ResetResponse { reset }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    use std::collections::HashMap;

    let mut components = HashMap::new();
    components.insert("api".to_string(), "healthy".to_string());
    let store_status = match state.service.list() {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };
    components.insert("store".to_string(), store_status.to_string());

    let all_healthy = components.values().all(|status| status == "healthy");
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "unhealthy" }.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}
