pub mod api;
pub mod config;
pub mod queue;
pub mod store;
pub mod task;
pub mod worker;
