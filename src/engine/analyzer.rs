//! Extracts a service's routing metadata from its script without running the
//! handler.

use std::{
    collections::HashSet,
    str::FromStr,
    time::{Duration, Instant},
};

use rhai::{Dynamic, Map};
use thiserror::Error;

use super::{
    context::{MODULE_CONTAINER, new_module_container},
    rhai::{ScriptEngine, ScriptError, conversions::dynamic_to_plain_string},
    splitter::{SourceSegments, split_source},
};
use crate::{
    config::RhaiConfig,
    models::{DataType, Method, Service},
};

/// Binds `service` to a map whose `define` method records its argument.
const DEFINITION_PRELUDE: &str =
    "let service = #{ define: |definition| { this.definition = definition; } };";

/// Errors raised while analyzing a service script.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The definition call did not record a mapping.
    #[error("Service definition error")]
    Definition,

    /// The definition declares no path.
    #[error("Service path not found")]
    PathMissing,

    /// The definition declares no method.
    #[error("Service method not found")]
    MethodMissing,

    /// The declared method is not an HTTP verb services may use.
    #[error("Service method[{0}] error")]
    InvalidMethod(String),

    /// The `params` entry is malformed.
    #[error("Service parameter definition error: {0}")]
    ParamDefinition(String),

    /// A module script replaced `exports` with something other than a mapping.
    #[error("Module definition error")]
    ModuleDefinition,

    /// A module script exports no path.
    #[error("Module path not found")]
    ModulePathMissing,

    /// The script ran past the configured execution timeout.
    #[error("Script analysis timed out after {0:?}")]
    Timeout(Duration),

    /// The worker running the analysis panicked or was cancelled.
    #[error("Script analysis task failed: {0}")]
    Join(String),

    /// The script failed to compile or run.
    #[error(transparent)]
    Script(#[from] ScriptError),
}

/// Produces validated `Service` metadata from script source.
#[derive(Debug, Clone, Default)]
pub struct ServiceAnalyzer {
    rhai_config: RhaiConfig,
}

impl ServiceAnalyzer {
    /// Creates an analyzer whose sessions use the given limits.
    pub fn new(rhai_config: RhaiConfig) -> Self {
        Self { rhai_config }
    }

    /// Analyzes `source`.
    ///
    /// Scripts with a `service.define(...)` call are analyzed declaratively
    /// and must describe a routable service. Scripts without one are run as
    /// modules; if such a script leaves no `component` mapping behind, an
    /// empty `Service` is returned instead of an error.
    ///
    /// The returned service carries no source or name.
    ///
    /// Script runs are bounded by the configured execution timeout.
    pub fn analyze(&self, source: &str) -> Result<Service, AnalysisError> {
        let segments = split_source(source);
        if segments.has_definition() {
            self.analyze_definition(segments)
        } else {
            self.analyze_module(segments.code)
        }
    }

    /// Runs `analyze` on the blocking pool.
    pub async fn analyze_async(&self, source: String) -> Result<Service, AnalysisError> {
        let analyzer = self.clone();
        tokio::task::spawn_blocking(move || analyzer.analyze(&source))
            .await
            .map_err(|e| AnalysisError::Join(e.to_string()))?
    }

    fn session(&self) -> ScriptEngine {
        let mut engine = ScriptEngine::new(&self.rhai_config);
        let timeout = self.rhai_config.execution_timeout;
        engine.set_deadline((!timeout.is_zero()).then(|| Instant::now() + timeout));
        engine
    }

    fn timed_out(&self, error: &ScriptError) -> Option<AnalysisError> {
        error.is_terminated().then(|| AnalysisError::Timeout(self.rhai_config.execution_timeout))
    }

    fn analyze_definition(&self, segments: SourceSegments<'_>) -> Result<Service, AnalysisError> {
        let mut engine = self.session();
        engine.set_script(DEFINITION_PRELUDE);
        engine.add_script(segments.definition);
        if let Err(e) = engine.run() {
            tracing::debug!(error = %e, "Definition call failed.");
            return Err(self.timed_out(&e).unwrap_or(AnalysisError::Definition));
        }

        let definition = engine
            .get_var("service")
            .ok()
            .and_then(|service| service.try_cast::<Map>())
            .and_then(|mut service| service.remove("definition"))
            .and_then(|definition| definition.try_cast::<Map>())
            .ok_or(AnalysisError::Definition)?;

        let path = field_string(&definition, "path");
        if path.is_empty() {
            return Err(AnalysisError::PathMissing);
        }
        let declared_method = field_string(&definition, "method");
        if declared_method.is_empty() {
            return Err(AnalysisError::MethodMissing);
        }
        let method = Method::from_str(&declared_method)
            .ok()
            .filter(Method::is_http)
            .ok_or_else(|| AnalysisError::InvalidMethod(declared_method.clone()))?;

        let mut service = Service {
            namespace: field_string(&definition, "namespace"),
            path,
            method: Some(method),
            ..Default::default()
        };
        if let Some(params) = definition.get("params").filter(|p| !p.is_unit()) {
            add_params(&mut service, params)?;
        }

        let mut handler = ScriptEngine::new(&self.rhai_config);
        handler.set_script(segments.code);
        handler.compile()?;

        tracing::debug!(namespace = %service.namespace, path = %service.path, method = %method, "Service definition analyzed.");
        Ok(service)
    }

    fn analyze_module(&self, code: &str) -> Result<Service, AnalysisError> {
        let mut engine = self.session();
        engine.add_var(MODULE_CONTAINER, new_module_container());
        engine.set_script(code);
        if let Err(e) = engine.run() {
            return Err(self.timed_out(&e).unwrap_or(AnalysisError::Script(e)));
        }

        let Some(container) = engine.get_var(MODULE_CONTAINER)?.try_cast::<Map>() else {
            tracing::debug!("Script exports no module container, not a service.");
            return Ok(Service::default());
        };
        let exports = container
            .get("exports")
            .and_then(|exports| exports.read_lock::<Map>().map(|map| Map::clone(&map)))
            .ok_or(AnalysisError::ModuleDefinition)?;

        let path = field_string(&exports, "path");
        if path.is_empty() {
            return Err(AnalysisError::ModulePathMissing);
        }
        let service = Service {
            namespace: field_string(&exports, "namespace"),
            path,
            method: Some(Method::Local),
            ..Default::default()
        };
        tracing::debug!(namespace = %service.namespace, path = %service.path, "Module analyzed.");
        Ok(service)
    }
}

/// Reads `key` as a string; absent and unit values read as empty.
fn field_string(map: &Map, key: &str) -> String {
    map.get(key).map(dynamic_to_plain_string).unwrap_or_default()
}

fn add_params(service: &mut Service, params: &Dynamic) -> Result<(), AnalysisError> {
    let entries = params
        .read_lock::<rhai::Array>()
        .ok_or_else(|| AnalysisError::ParamDefinition("params must be an array".to_string()))?;

    let mut seen = HashSet::new();
    for (index, entry) in entries.iter().enumerate() {
        let entry = entry.read_lock::<Map>().ok_or_else(|| {
            AnalysisError::ParamDefinition(format!("param #{index} must be an object map"))
        })?;
        let name = field_string(&entry, "name");
        if name.is_empty() {
            return Err(AnalysisError::ParamDefinition(format!("param #{index} has no name")));
        }
        let data_type = DataType::from_str(&field_string(&entry, "dataType"))
            .map_err(|e| AnalysisError::ParamDefinition(format!("param {name}: {e}")))?;
        if !seen.insert(name.clone()) {
            return Err(AnalysisError::ParamDefinition(format!("param {name} is declared twice")));
        }
        service.add_param(name, data_type);
    }
    Ok(())
}
