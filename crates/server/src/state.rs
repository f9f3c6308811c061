use std::sync::Arc;

use promoter_core::{Config, Deployer, PromotionTrigger, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    deployer: Arc<Deployer>,
    trigger: Arc<PromotionTrigger>,
}

impl AppState {
    pub fn new(config: Config, deployer: Arc<Deployer>, trigger: Arc<PromotionTrigger>) -> Self {
        Self {
            config,
            deployer,
            trigger,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn deployer(&self) -> &Deployer {
        self.deployer.as_ref()
    }

    pub fn trigger(&self) -> &PromotionTrigger {
        self.trigger.as_ref()
    }
}
