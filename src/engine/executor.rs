//! Runs one service invocation: binds parameters, builds the context, runs
//! the handler and packages the result.

use std::{sync::Arc, time::Duration};

use thiserror::Error;

use super::{
    capabilities::Capabilities,
    coercion::{CoercionError, RequestParams, bind_params},
    context::ContextBuilder,
    rhai::ScriptError,
    splitter::split_source,
};
use crate::{
    config::RhaiConfig,
    models::{ExecutionResult, Service},
};

/// Errors raised by a service invocation.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The request input did not satisfy the parameter schema.
    #[error(transparent)]
    Coercion(#[from] CoercionError),

    /// The handler failed. `log` holds what it wrote before failing.
    #[error("Script execution failed: {source}")]
    Script {
        /// The underlying failure.
        source: ScriptError,
        /// Log lines written before the failure.
        log: Vec<String>,
    },

    /// The handler ran past the configured execution timeout.
    #[error("Script execution timed out after {0:?}")]
    Timeout(Duration),

    /// The worker running the handler panicked or was cancelled.
    #[error("Script execution task failed: {0}")]
    Join(String),
}

impl ExecutionError {
    /// Log lines written before the failure, if any.
    pub fn log(&self) -> &[String] {
        match self {
            ExecutionError::Script { log, .. } => log,
            _ => &[],
        }
    }
}

/// Executes services. Cheap to clone; every invocation gets its own engine.
#[derive(Debug, Clone, Default)]
pub struct ServiceExecutor {
    rhai_config: Arc<RhaiConfig>,
}

impl ServiceExecutor {
    /// Creates an executor whose sessions use the given limits.
    pub fn new(rhai_config: RhaiConfig) -> Self {
        Self { rhai_config: Arc::new(rhai_config) }
    }

    /// The limits applied to every invocation.
    pub fn rhai_config(&self) -> &RhaiConfig {
        &self.rhai_config
    }

    /// Runs `service` on the current thread.
    ///
    /// Only the code segment of the service source runs; the definition call
    /// is skipped.
    pub fn execute(
        &self,
        service: &Service,
        input: &RequestParams,
        capabilities: Capabilities,
    ) -> Result<ExecutionResult, ExecutionError> {
        let params = bind_params(service, input)?;
        let timeout = self.rhai_config.execution_timeout;

        let (mut engine, collector) = ContextBuilder::new(&self.rhai_config, capabilities)
            .params(&params)
            .timeout(timeout)
            .build()
            .into_parts();
        engine.set_script(split_source(&service.source).code);

        match engine.run() {
            Ok(()) => {
                let result = collector.finish();
                tracing::debug!(
                    namespace = %service.namespace,
                    path = %service.path,
                    status = result.status,
                    "Service executed."
                );
                Ok(result)
            }
            Err(e) if e.is_terminated() => {
                tracing::warn!(namespace = %service.namespace, path = %service.path, "Service execution timed out.");
                Err(ExecutionError::Timeout(timeout))
            }
            Err(source) => {
                tracing::warn!(
                    namespace = %service.namespace,
                    path = %service.path,
                    error = %source,
                    "Service execution failed."
                );
                Err(ExecutionError::Script { source, log: collector.finish().log })
            }
        }
    }

    /// Runs `service` on the blocking pool, bounded by the configured
    /// execution timeout.
    pub async fn invoke(
        &self,
        service: Arc<Service>,
        input: RequestParams,
        capabilities: Capabilities,
    ) -> Result<ExecutionResult, ExecutionError> {
        let executor = self.clone();
        let task =
            tokio::task::spawn_blocking(move || executor.execute(&service, &input, capabilities));

        let timeout = self.rhai_config.execution_timeout;
        let joined = if timeout.is_zero() {
            task.await
        } else {
            // The engine checks the same deadline; this bounds host calls
            // that block.
            tokio::time::timeout(timeout + Duration::from_millis(500), task)
                .await
                .map_err(|_| ExecutionError::Timeout(timeout))?
        };
        joined.map_err(|e| ExecutionError::Join(e.to_string()))?
    }
}
