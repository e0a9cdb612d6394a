//! This module provides the `InitializationService` responsible for loading
//! service scripts from disk into the repository at startup.

use std::{path::PathBuf, sync::Arc};

use thiserror::Error;

use crate::{
    config::AppConfig,
    engine::ServiceAnalyzer,
    loader::{LoaderError, ScriptFile, ScriptLoader},
    persistence::traits::ServiceRepository,
};

/// Errors that can occur during initialization.
#[derive(Debug, Error)]
pub enum InitializationError {
    /// The services directory could not be read.
    #[error("Failed to load services from directory: {0}")]
    ServiceLoadError(#[from] LoaderError),
}

/// What a run stored, skipped and rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitializationSummary {
    /// Scripts stored in the repository.
    pub loaded: usize,
    /// Scripts that export no service.
    pub skipped: usize,
    /// Scripts that failed analysis or storage.
    pub failed: usize,
}

/// A service responsible for initializing application state at startup.
pub struct InitializationService {
    services_dir: Option<PathBuf>,
    default_namespace: String,
    analyzer: ServiceAnalyzer,
    repo: Arc<dyn ServiceRepository>,
}

impl InitializationService {
    /// Creates a new `InitializationService`.
    pub fn new(config: &AppConfig, repo: Arc<dyn ServiceRepository>) -> Self {
        Self {
            services_dir: config.services_dir.clone(),
            default_namespace: config.server.default_namespace.clone(),
            analyzer: ServiceAnalyzer::new(config.rhai.clone()),
            repo,
        }
    }

    /// Loads every script in the services directory, if one is configured.
    ///
    /// A script that fails analysis or storage is logged and counted; only
    /// an unreadable directory fails the run.
    pub async fn run(&self) -> Result<InitializationSummary, InitializationError> {
        let Some(dir) = &self.services_dir else {
            tracing::debug!("No services directory configured. Skipping script loading.");
            return Ok(InitializationSummary::default());
        };

        tracing::info!(services_dir = %dir.display(), "Loading service scripts...");
        let scripts = ScriptLoader::new(dir.clone()).load()?;

        let mut summary = InitializationSummary::default();
        for script in scripts {
            match self.store_script(&script).await {
                Ok(true) => summary.loaded += 1,
                Ok(false) => summary.skipped += 1,
                Err(error) => {
                    tracing::error!(file = %script.path.display(), error = %error, "Failed to load service script.");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            loaded = summary.loaded,
            skipped = summary.skipped,
            failed = summary.failed,
            "Service scripts loaded."
        );
        Ok(summary)
    }

    /// Analyzes and stores one script. Returns false if it exports nothing.
    async fn store_script(&self, script: &ScriptFile) -> Result<bool, String> {
        let mut service = self
            .analyzer
            .analyze_async(script.source.clone())
            .await
            .map_err(|e| e.to_string())?;
        if service.is_empty() {
            tracing::debug!(file = %script.path.display(), "Script exports no service, skipping.");
            return Ok(false);
        }

        if service.namespace.is_empty() {
            service.namespace = self.default_namespace.clone();
        }
        service.name = script.name.clone();
        service.source = script.source.clone();

        tracing::debug!(namespace = %service.namespace, path = %service.path, name = %service.name, "Storing service.");
        self.repo.create_service(service).await.map_err(|e| e.to_string())?;
        Ok(true)
    }
}
