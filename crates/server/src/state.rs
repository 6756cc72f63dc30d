use std::sync::Arc;
use milo_core::{Config, IntelligenceGateway};

/// Shared application state
pub struct AppState {
    config: Config,
    gateway: Arc<IntelligenceGateway>,
}

impl AppState {
    pub fn new(config: Config, gateway: Arc<IntelligenceGateway>) -> Self {
        Self { config, gateway }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn gateway(&self) -> &IntelligenceGateway {
        &self.gateway
    }
}
