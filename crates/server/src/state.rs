use std::sync::Arc;
use sketchloop_core::{Config, JobStore, RenderService};

/// Shared application state
pub struct AppState {
    config: Config,
    render: Arc<RenderService>,
}

impl AppState {
    pub fn new(config: Config, render: Arc<RenderService>) -> Self {
        Self { config, render }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn render(&self) -> &RenderService {
        self.render.as_ref()
    }

    pub fn store(&self) -> &dyn JobStore {
        self.render.store().as_ref()
    }
}
