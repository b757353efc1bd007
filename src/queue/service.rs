//! Boundary operations the queue exposes to callers.
//!
//! Every operation validates its preconditions synchronously against the
//! store before mutating anything; transition legality lives here, not in the
//! HTTP layer. Execution failures never surface through these operations:
//! a failed download is a terminal task status, not a queue fault.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::store::{StoreError, TaskStore};
use crate::task::url::{parse_source_url, InvalidUrl};
use crate::task::{Task, TaskStatus};

use super::scheduler::Scheduler;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    InvalidUrl(#[from] InvalidUrl),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("task not found: {0}")]
    NotFound(String),

    #[error("operation not allowed while task is {current}")]
    InvalidState { current: TaskStatus },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

pub struct QueueService {
    store: Arc<TaskStore>,
    scheduler: Arc<Scheduler>,
    languages: Vec<String>,
}

impl QueueService {
    pub fn new(store: Arc<TaskStore>, scheduler: Arc<Scheduler>, languages: Vec<String>) -> Self {
        Self {
            store,
            scheduler,
            languages,
        }
    }

    /// Create a task from a source URL, or re-queue the existing row for the
    /// same catalog id. Validation happens before any mutation.
    pub fn submit(&self, url: &str, language: &str) -> Result<Task> {
        let descriptor = parse_source_url(url)?;
        self.ensure_language(language)?;

        let task = match self.store.get(&descriptor.id)? {
            Some(mut existing) => {
                existing.url = url.to_string();
                existing.content_type = descriptor.content_type;
                existing.display_name = descriptor.display_name;
                existing.language = language.to_string();
                // A row already being executed keeps its claim; everything
                // else goes back to pending.
                if existing.status != TaskStatus::Running {
                    existing.status = TaskStatus::Pending;
                }
                existing.touch();
                info!(id = %existing.id, "Re-queued existing task");
                existing
            }
            None => {
                let task = Task::new(descriptor, url, language);
                info!(id = %task.id, name = %task.display_name, "Created task");
                task
            }
        };

        self.store.upsert(&task)?;
        self.scheduler.clone().notify();
        Ok(task)
    }

    pub fn get(&self, id: &str) -> Result<Task> {
        self.store
            .get(id)?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    pub fn list(&self) -> Result<Vec<Task>> {
        Ok(self.store.list()?)
    }

    pub fn current_log(&self) -> Option<String> {
        self.scheduler.current_log()
    }

    /// Cancel a pending task. Running and terminal tasks cannot be cancelled.
    pub fn cancel(&self, id: &str) -> Result<Task> {
        let mut task = self.get(id)?;
        if task.status != TaskStatus::Pending {
            return Err(ServiceError::InvalidState {
                current: task.status,
            });
        }
        task.status = TaskStatus::Cancelled;
        task.touch();
        self.store.upsert(&task)?;
        info!(id = %task.id, "Cancelled task");
        Ok(task)
    }

    /// Restart a terminal task, optionally instructing the next run to
    /// overwrite existing output.
    pub fn restart(&self, id: &str, overwrite: bool) -> Result<Task> {
        let mut task = self.get(id)?;
        if !task.status.is_terminal() {
            return Err(ServiceError::InvalidState {
                current: task.status,
            });
        }
        task.status = TaskStatus::Pending;
        task.overwrite = overwrite;
        task.touch();
        self.store.upsert(&task)?;
        info!(id = %task.id, overwrite, "Restarted task");
        self.scheduler.clone().notify();
        Ok(task)
    }

    /// Delete a task row. Guarded against deleting a running task.
    pub fn delete(&self, id: &str) -> Result<Task> {
        let task = self.get(id)?;
        if task.status == TaskStatus::Running {
            return Err(ServiceError::InvalidState {
                current: task.status,
            });
        }
        self.store.remove(id)?;
        info!(id = %task.id, "Deleted task");
        Ok(task)
    }

    pub fn update_language(&self, id: &str, language: &str) -> Result<Task> {
        self.ensure_language(language)?;
        let mut task = self.get(id)?;
        task.language = language.to_string();
        task.touch();
        self.store.upsert(&task)?;
        info!(id = %task.id, language, "Updated task language");
        Ok(task)
    }

    /// Re-queue every task that is not currently running. Returns the count.
    pub fn reset_all_non_running(&self) -> Result<usize> {
        let count = self.store.reset_non_running()?;
        info!(count, "Reset tasks back to pending");
        self.scheduler.clone().notify();
        Ok(count)
    }

    fn ensure_language(&self, language: &str) -> Result<()> {
        if self.languages.iter().any(|l| l == language) {
            Ok(())
        } else {
            Err(ServiceError::UnsupportedLanguage(language.to_string()))
        }
    }
}
