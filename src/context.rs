use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::core::JobService;

/// Shared state handed to the web layer.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub service: JobService,
    pub started: Instant,
}

impl AppContext {
    pub fn new(config: AppConfig, service: JobService) -> Self {
        Self {
            config: Arc::new(config),
            service,
            started: Instant::now(),
        }
    }
}
