use std::path::Path;

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, info};

use crate::task::{Task, TaskStatus};

use super::error::Result;
use super::keys::encode_task_key;

/// Fjall-backed persistent storage for task rows.
///
/// Pure data access: every policy decision (who may transition what, when)
/// lives in the queue layer. The store only reads and writes rows.
#[derive(Clone)]
pub struct TaskStore {
    keyspace: Keyspace,
    tasks: PartitionHandle,
}

impl TaskStore {
    /// Open or create a task store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening task store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let tasks = keyspace.open_partition("tasks", PartitionCreateOptions::default())?;

        Ok(Self { keyspace, tasks })
    }

    /// Store or update a task row
    pub fn upsert(&self, task: &Task) -> Result<()> {
        let key = encode_task_key(&task.id);
        let value = serde_json::to_vec(task)?;
        self.tasks.insert(key, value)?;
        debug!(id = %task.id, status = %task.status, "Upserted task");
        Ok(())
    }

    /// Get a task by id
    pub fn get(&self, id: &str) -> Result<Option<Task>> {
        let key = encode_task_key(id);
        match self.tasks.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Remove a task row
    pub fn remove(&self, id: &str) -> Result<()> {
        let key = encode_task_key(id);
        self.tasks.remove(key)?;
        debug!(id, "Removed task");
        Ok(())
    }

    /// List all tasks, oldest first (id as tiebreak for equal timestamps)
    pub fn list(&self) -> Result<Vec<Task>> {
        let mut tasks = Vec::new();
        for item in self.tasks.iter() {
            let (_, value) = item?;
            tasks.push(serde_json::from_slice::<Task>(&value)?);
        }
        tasks.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(tasks)
    }

    /// Fetch the oldest pending task, if any
    pub fn next_pending(&self) -> Result<Option<Task>> {
        Ok(self
            .list()?
            .into_iter()
            .find(|task| task.status == TaskStatus::Pending))
    }

    /// Whether any pending task exists
    pub fn has_pending(&self) -> Result<bool> {
        Ok(self.next_pending()?.is_some())
    }

    /// Claim a row for execution: re-reads it and only moves it to running if
    /// it is still pending, so a cancel or delete that landed after the poll
    /// wins. Returns `None` when the row changed or vanished.
    pub fn claim_pending(&self, id: &str) -> Result<Option<Task>> {
        let Some(mut task) = self.get(id)? else {
            return Ok(None);
        };
        if task.status != TaskStatus::Pending {
            return Ok(None);
        }
        task.status = TaskStatus::Running;
        task.touch();
        self.upsert(&task)?;
        Ok(Some(task))
    }

    /// Reset every running task back to pending. Returns the reset count.
    ///
    /// A row can only be running at rest if the process died mid-execution,
    /// so this is the startup recovery sweep.
    pub fn reset_running(&self) -> Result<usize> {
        self.reset_where(|task| task.status == TaskStatus::Running)
    }

    /// Reset every non-running task back to pending. Returns the reset count.
    pub fn reset_non_running(&self) -> Result<usize> {
        self.reset_where(|task| task.status != TaskStatus::Running)
    }

    fn reset_where(&self, predicate: impl Fn(&Task) -> bool) -> Result<usize> {
        let mut count = 0;
        for mut task in self.list()? {
            if !predicate(&task) {
                continue;
            }
            task.status = TaskStatus::Pending;
            task.touch();
            self.upsert(&task)?;
            count += 1;
        }
        Ok(count)
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }
}
