//! Single-concurrency queue scheduler.
//!
//! `notify()` is the only way work starts: it test-and-sets the processing
//! flag and, when newly set, spawns one drain worker. The drain worker loops
//! claim-one-pending -> execute -> persist-terminal until the queue is empty,
//! which is what delivers the strict one-task-at-a-time guarantee without a
//! long-lived polling loop. A `notify()` arriving while a pass is active is a
//! deliberate no-op; the active pass re-checks for pending work before it
//! stands down.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{error, info, warn};

use crate::store::{StoreError, TaskStore};
use crate::task::{Task, TaskStatus};
use crate::worker::Downloader;

use super::log::CurrentLog;

pub struct Scheduler {
    store: Arc<TaskStore>,
    downloader: Arc<dyn Downloader>,
    log: CurrentLog,
    processing: Mutex<bool>,
}

impl Scheduler {
    pub fn new(store: Arc<TaskStore>, downloader: Arc<dyn Downloader>) -> Arc<Self> {
        Arc::new(Self {
            store,
            downloader,
            log: CurrentLog::new(),
            processing: Mutex::new(false),
        })
    }

    /// Last output line of the in-flight execution, if any.
    pub fn current_log(&self) -> Option<String> {
        self.log.get()
    }

    /// Reset tasks left running by an abnormal prior shutdown.
    ///
    /// Must run exactly once at startup, before the first `notify()`,
    /// otherwise an orphaned row would stay running forever.
    pub fn recover_interrupted(&self) -> Result<usize, StoreError> {
        let count = self.store.reset_running()?;
        if count > 0 {
            warn!(count, "Reset interrupted tasks back to pending");
        }
        Ok(count)
    }

    /// Idempotently ensure a drain pass is scheduled. Never blocks.
    pub fn notify(self: Arc<Self>) {
        if !self.try_begin() {
            return;
        }
        tokio::spawn(async move { self.drain().await });
    }

    /// Test-and-set the processing flag. Returns true when this caller
    /// acquired the pass.
    fn try_begin(&self) -> bool {
        let mut processing = self.lock_processing();
        if *processing {
            false
        } else {
            *processing = true;
            true
        }
    }

    fn end_processing(&self) {
        *self.lock_processing() = false;
    }

    fn lock_processing(&self) -> std::sync::MutexGuard<'_, bool> {
        self.processing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim and execute pending tasks one at a time until none remain.
    async fn drain(&self) {
        loop {
            let task = match self.store.next_pending() {
                Ok(Some(task)) => task,
                Ok(None) => {
                    self.end_processing();
                    // A submit may have landed between the empty poll and the
                    // flag clearing above; re-check before standing down.
                    match self.store.has_pending() {
                        Ok(true) if self.try_begin() => continue,
                        Ok(_) => return,
                        Err(err) => {
                            error!(%err, "Failed to re-check pending tasks");
                            return;
                        }
                    }
                }
                Err(err) => {
                    error!(%err, "Failed to query pending tasks");
                    self.end_processing();
                    return;
                }
            };

            self.run_one(task).await;
        }
    }

    /// One claim -> execute -> persist-terminal cycle.
    async fn run_one(&self, task: Task) {
        // The claim re-checks the status, so a cancel or delete that landed
        // after the poll wins over the stale copy.
        let task = match self.store.claim_pending(&task.id) {
            Ok(Some(task)) => task,
            Ok(None) => return,
            Err(err) => {
                error!(id = %task.id, %err, "Failed to claim task");
                return;
            }
        };

        info!(
            id = %task.id,
            name = %task.display_name,
            language = %task.language,
            overwrite = task.overwrite,
            "Starting download"
        );

        let outcome = self.downloader.run(&task, &self.log).await;

        // Re-read the row so concurrent language edits made during the run
        // are not clobbered by the stale claim copy.
        let row = match self.store.get(&task.id) {
            Ok(Some(row)) => Some(row),
            Ok(None) => None,
            Err(err) => {
                error!(id = %task.id, %err, "Failed to re-read task after execution");
                None
            }
        };

        if let Some(mut row) = row {
            row.status = outcome;
            if outcome == TaskStatus::Completed {
                row.overwrite = false;
            }
            row.touch();
            if let Err(err) = self.store.upsert(&row) {
                error!(id = %row.id, %err, "Failed to persist terminal status");
            }
        }

        match outcome {
            TaskStatus::Completed => {
                info!(id = %task.id, name = %task.display_name, "Download completed")
            }
            _ => error!(id = %task.id, name = %task.display_name, "Download failed"),
        }
    }
}
