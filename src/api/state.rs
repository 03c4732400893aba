use std::sync::Arc;

use crate::service::StatsService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<StatsService>,
}

impl AppState {
    pub fn new(service: StatsService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
