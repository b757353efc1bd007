//! Request and response bodies for the task and settings endpoints.
//!
//! Task rows serialize directly as responses; the shapes here are the inputs
//! plus the few composite responses (list + current log, health).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::task::Task;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub url: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "zh-CN".to_string()
}

#[derive(Debug, Default, Deserialize)]
pub struct RestartRequest {
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Deserialize)]
pub struct LanguageRequest {
    pub language: String,
}

/// Task list plus the live output line of whatever is running right now.
#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
    pub current_log: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub reset: usize,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Shared shape for the cookies and downloader-config settings files.
#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsFileStatus {
    pub configured: bool,
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsFileContent {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
}
