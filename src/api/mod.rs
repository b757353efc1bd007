mod error;
pub mod models;
mod server;
pub mod services;
pub mod settings;
pub mod state;

pub use error::ApiError;
pub use server::{router, run};
