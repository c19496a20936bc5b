//! Shared application state.

use std::sync::Arc;

use craftdeploy_file_store::{FileStoreError, PanelClient};
use craftdeploy_installer::{
    DeploymentRepository, InstallationOrchestrator, ProcessRunner, ResolverRunner,
};

use crate::config::ServiceConfig;

/// Everything handlers need, created once at start-up.
pub struct AppState {
    pub config: ServiceConfig,
    pub panel: PanelClient,
    pub repository: DeploymentRepository,
    pub orchestrator: InstallationOrchestrator,
}

impl AppState {
    /// Builds state around the configured resolver command.
    pub fn new(config: ServiceConfig) -> Result<Self, FileStoreError> {
        let runner = ProcessRunner::new(
            config.resolver.command.clone(),
            config.resolver.args.clone(),
        );
        Self::with_runner(config, Arc::new(runner))
    }

    pub fn with_runner(
        config: ServiceConfig,
        runner: Arc<dyn ResolverRunner>,
    ) -> Result<Self, FileStoreError> {
        let panel = PanelClient::new(&config.panel_url, &config.panel_api_key)?;
        let orchestrator = InstallationOrchestrator::new(runner, config.install_settings());
        Ok(Self {
            config,
            panel,
            repository: DeploymentRepository::new(),
            orchestrator,
        })
    }
}
