//! Task queue: scheduler, boundary service, and the shared current-log slot.

pub mod log;
pub mod scheduler;
pub mod service;

pub use log::CurrentLog;
pub use scheduler::Scheduler;
pub use service::{QueueService, ServiceError};
