use std::sync::Arc;
use std::time::Instant;

use crate::service::SignalingService;

#[derive(Clone)]
pub struct AppState {
    start: Instant,
    service: Arc<SignalingService>,
}

impl AppState {
    pub fn new(service: SignalingService) -> Self {
        Self {
            start: Instant::now(),
            service: Arc::new(service),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }

    pub fn service(&self) -> &SignalingService {
        &self.service
    }
}
