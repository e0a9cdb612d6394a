//! HTTP server module: the admin API for managing services and the `/api`
//! dispatcher that invokes them.

mod dispatch;
mod error;
mod services;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    http::HeaderMap,
    response::IntoResponse,
    routing::{any, get, post},
};
pub use error::ApiError;
use serde_json::json;

use crate::{
    config::AppConfig,
    engine::{
        Capabilities, DataSourceResolver, ModuleResolver, ServiceAnalyzer, ServiceExecutor,
    },
    persistence::ServiceRepository,
};

/// Header a request uses to select its namespace.
pub const NAMESPACE_HEADER: &str = "namespace";

/// Shared state of every handler.
#[derive(Clone)]
pub struct ApiState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Service storage.
    pub repo: Arc<dyn ServiceRepository>,
    /// Resolver behind the scripts' `require`.
    pub modules: Arc<dyn ModuleResolver>,
    /// Resolver behind the scripts' `db`.
    pub data_sources: Arc<dyn DataSourceResolver>,
    /// Analyzer for submitted sources.
    pub analyzer: ServiceAnalyzer,
    /// Executor for handler invocations.
    pub executor: ServiceExecutor,
}

impl ApiState {
    /// Creates the state, building the analyzer and executor from the
    /// configured script limits.
    pub fn new(
        config: Arc<AppConfig>,
        repo: Arc<dyn ServiceRepository>,
        modules: Arc<dyn ModuleResolver>,
        data_sources: Arc<dyn DataSourceResolver>,
    ) -> Self {
        let analyzer = ServiceAnalyzer::new(config.rhai.clone());
        let executor = ServiceExecutor::new(config.rhai.clone());
        Self { config, repo, modules, data_sources, analyzer, executor }
    }

    /// The request's namespace: the `namespace` header if present and
    /// non-empty, else the configured default.
    pub fn namespace(&self, headers: &HeaderMap) -> String {
        headers
            .get(NAMESPACE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .map_or_else(|| self.config.server.default_namespace.clone(), str::to_string)
    }

    /// The capability set for an invocation in `namespace`.
    pub fn capabilities(&self, namespace: &str) -> Capabilities {
        Capabilities::new(namespace, Arc::clone(&self.modules), Arc::clone(&self.data_sources))
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Builds the router over `state`.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/admin/services/analysis", post(services::analyze_service))
        .route("/admin/services/test", post(services::test_service))
        .route(
            "/admin/services",
            post(services::create_service)
                .put(services::modify_service)
                .get(services::list_services),
        )
        .route(
            "/admin/services/{method}/{*path}",
            get(services::get_service).delete(services::delete_service),
        )
        .route("/api/{*path}", any(dispatch::dispatch))
        .with_state(state)
}

/// Runs the HTTP server on the configured listen address.
pub async fn run_server_from_config(state: ApiState) -> std::io::Result<()> {
    let addr: SocketAddr = state.config.server.listen_address.parse().map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Invalid server.listen_address format: {e}"),
        )
    })?;

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "HTTP server listening.");

    axum::serve(listener, app.into_make_service()).await
}
