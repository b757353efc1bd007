//! Task model and lifecycle states.
//!
//! A [`Task`] is the durable record of one requested download: the source URL,
//! the descriptor fields derived from it, and the lifecycle status. Rows are
//! keyed by the catalog id extracted from the URL, so resubmitting the same
//! URL updates the existing row instead of creating a duplicate.

pub mod url;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use url::UrlDescriptor;

/// Lifecycle status of a task.
///
/// Legal transitions:
/// - `Pending -> Running` (scheduler claim only)
/// - `Running -> Completed | Failed` (executor outcome)
/// - `Pending -> Cancelled` (external cancel)
/// - `Completed | Failed | Cancelled -> Pending` (external restart)
/// - `Running -> Pending` (startup recovery sweep only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// States from which restart is the only forward path.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorical tag extracted from the source URL path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    Artist,
    Album,
    Playlist,
    Song,
    MusicVideo,
    Post,
}

impl ContentType {
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "artist" => Some(ContentType::Artist),
            "album" => Some(ContentType::Album),
            "playlist" => Some(ContentType::Playlist),
            "song" => Some(ContentType::Song),
            "music-video" => Some(ContentType::MusicVideo),
            "post" => Some(ContentType::Post),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Artist => "artist",
            ContentType::Album => "album",
            ContentType::Playlist => "playlist",
            ContentType::Song => "song",
            ContentType::MusicVideo => "music-video",
            ContentType::Post => "post",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One durable download task row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub url: String,
    pub content_type: ContentType,
    pub display_name: String,
    pub language: String,
    pub status: TaskStatus,
    /// Instructs the next execution to replace existing output. Forced back
    /// to `false` after a completed run.
    pub overwrite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a fresh pending task from a parsed URL descriptor.
    pub fn new(descriptor: UrlDescriptor, url: impl Into<String>, language: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: descriptor.id,
            url: url.into(),
            content_type: descriptor.content_type,
            display_name: descriptor.display_name,
            language: language.into(),
            status: TaskStatus::Pending,
            overwrite: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh `updated_at`. Called by every mutating operation.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
