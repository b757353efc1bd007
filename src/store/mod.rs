//! Fjall-based persistence for task rows.
//!
//! One durable row per task, keyed by the catalog id extracted from the
//! source URL. The store is the source of truth for task state; everything
//! else (current log line, processing flag) is ephemeral.

pub mod error;
pub mod keys;
pub mod store;

pub use error::{Result, StoreError};
pub use store::TaskStore;
