use std::sync::{Mutex, PoisonError};

/// Last output line of the in-flight execution.
///
/// Written by the execution worker line by line and read concurrently by
/// status queries, so every access goes through the lock. Empty whenever no
/// task is running.
#[derive(Debug, Default)]
pub struct CurrentLog {
    line: Mutex<Option<String>>,
}

impl CurrentLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, line: impl Into<String>) {
        *self.lock() = Some(line.into());
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    pub fn get(&self) -> Option<String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.line.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
