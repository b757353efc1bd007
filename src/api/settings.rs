//! Settings endpoints for the files the downloader reads at run time: the
//! cookies file and the downloader's own config file. Operators can inspect
//! and replace either without shelling into the container.

use std::path::Path;

use axum::{Json, extract::State, response::IntoResponse};
use tracing::info;

use super::error::ApiError;
use super::models::{MessageResponse, SettingsFileContent, SettingsFileStatus};
use super::state::AppState;

/// GET /api/settings/cookies
pub async fn cookies_status(State(state): State<AppState>) -> impl IntoResponse {
    file_status(&state.config.downloader.cookies_path)
}

/// GET /api/settings/cookies/content
pub async fn cookies_content(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    file_content(&state.config.downloader.cookies_path).await
}

/// PUT /api/settings/cookies
pub async fn update_cookies(
    State(state): State<AppState>,
    Json(request): Json<SettingsFileContent>,
) -> Result<impl IntoResponse, ApiError> {
    write_file(&state.config.downloader.cookies_path, request.content, "cookies").await
}

/// GET /api/settings/config
pub async fn downloader_config_status(State(state): State<AppState>) -> impl IntoResponse {
    file_status(&state.config.downloader.config_path)
}

/// GET /api/settings/config/content
pub async fn downloader_config_content(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    file_content(&state.config.downloader.config_path).await
}

/// PUT /api/settings/config
pub async fn update_downloader_config(
    State(state): State<AppState>,
    Json(request): Json<SettingsFileContent>,
) -> Result<impl IntoResponse, ApiError> {
    write_file(
        &state.config.downloader.config_path,
        request.content,
        "downloader config",
    )
    .await
}

fn file_status(path: &Path) -> Json<SettingsFileStatus> {
    Json(SettingsFileStatus {
        configured: path.exists(),
        path: path.display().to_string(),
    })
}

/// A missing file reads as empty so the editor starts from a blank slate.
async fn file_content(path: &Path) -> Result<Json<SettingsFileContent>, ApiError> {
    let content = if path.exists() {
        tokio::fs::read_to_string(path).await.map_err(|err| {
            ApiError::Internal(format!("failed to read {}: {err}", path.display()))
        })?
    } else {
        String::new()
    };
    Ok(Json(SettingsFileContent { content }))
}

async fn write_file(
    path: &Path,
    content: String,
    what: &str,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| ApiError::Internal(format!("failed to create config dir: {err}")))?;
    }
    tokio::fs::write(path, content)
        .await
        .map_err(|err| ApiError::Internal(format!("failed to write {what}: {err}")))?;

    info!(path = %path.display(), "{} updated", what);
    Ok(Json(MessageResponse {
        message: format!("{what} saved"),
    }))
}
