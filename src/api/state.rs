use std::sync::Arc;

use crate::config::Config;
use crate::queue::QueueService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub service: Arc<QueueService>,
}

impl AppState {
    pub fn new(config: Config, service: Arc<QueueService>) -> Self {
        Self {
            config: Arc::new(config),
            service,
        }
    }
}
