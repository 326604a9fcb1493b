use std::sync::Arc;

use sizefit_core::{
    Config, EncoderCapabilities, EventStore, JobRunner, SanitizedConfig,
};

use crate::storage::Storage;

/// Shared application state
pub struct AppState {
    config: Config,
    storage: Storage,
    jobs: JobRunner,
    event_store: Arc<dyn EventStore>,
    capabilities: EncoderCapabilities,
}

impl AppState {
    pub fn new(
        config: Config,
        jobs: JobRunner,
        event_store: Arc<dyn EventStore>,
        capabilities: EncoderCapabilities,
    ) -> Self {
        Self {
            storage: Storage::new(&config.storage),
            config,
            jobs,
            event_store,
            capabilities,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn jobs(&self) -> &JobRunner {
        &self.jobs
    }

    pub fn event_store(&self) -> &dyn EventStore {
        self.event_store.as_ref()
    }

    pub fn capabilities(&self) -> &EncoderCapabilities {
        &self.capabilities
    }
}
