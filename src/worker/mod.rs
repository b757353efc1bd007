//! Download execution.
//!
//! The scheduler talks to the executor through the [`Downloader`] trait so
//! tests can substitute a stub; the production implementation wraps the
//! external downloader command as a child process.

pub mod runner;

use async_trait::async_trait;

use crate::queue::CurrentLog;
use crate::task::{Task, TaskStatus};

pub use runner::GamdlRunner;

/// Executes one task and reports its terminal status.
///
/// Implementations must only return [`TaskStatus::Completed`] or
/// [`TaskStatus::Failed`], absorb their own errors, and leave `log` cleared
/// when they return so stale output never leaks into the next execution's
/// status view.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn run(&self, task: &Task, log: &CurrentLog) -> TaskStatus;
}
