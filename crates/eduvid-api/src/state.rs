//! Application state.

use std::sync::Arc;

use eduvid_pipeline::{JobStore, PipelineRunner};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub runner: PipelineRunner,
}

impl AppState {
    pub fn new(config: ApiConfig, runner: PipelineRunner) -> Self {
        Self { config, runner }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        self.runner.store()
    }
}
