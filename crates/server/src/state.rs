use std::sync::Arc;
use transflow_core::{AdmissionGateway, Authenticator, Config, JobStore, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    gateway: Arc<AdmissionGateway>,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        gateway: Arc<AdmissionGateway>,
    ) -> Self {
        Self {
            config,
            authenticator,
            gateway,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn gateway(&self) -> &AdmissionGateway {
        self.gateway.as_ref()
    }

    pub fn job_store(&self) -> &dyn JobStore {
        self.gateway.orchestrator().store().as_ref()
    }
}
