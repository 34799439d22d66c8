use std::sync::Arc;

use phenorun_core::{Config, JobRunner, LaunchStore, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    runner: Arc<JobRunner>,
}

impl AppState {
    pub fn new(config: Config, runner: Arc<JobRunner>) -> Self {
        Self { config, runner }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn runner(&self) -> &JobRunner {
        self.runner.as_ref()
    }

    pub fn launch_store(&self) -> &dyn LaunchStore {
        self.runner.store().as_ref()
    }
}
