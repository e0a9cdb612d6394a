//! Builds the per-invocation execution context: a fresh script session with
//! the capability functions and bound parameters injected.

use std::time::{Duration, Instant};

use rhai::{Dynamic, EvalAltResult, Map};

use super::{
    capabilities::{Capabilities, DataSource, register_data_source_type},
    collector::ResultCollector,
    rhai::{
        ScriptEngine, ScriptError,
        conversions::{dynamic_to_json, dynamic_to_plain_string, param_value_to_dynamic},
    },
    splitter::split_source,
};
use crate::{config::RhaiConfig, models::Param};

/// Variable holding a module script's container. `module` is reserved in
/// Rhai, so module scripts assign `component.exports`.
pub const MODULE_CONTAINER: &str = "component";

type HostResult = Result<Dynamic, Box<EvalAltResult>>;

/// A ready-to-run session plus the collector its host functions write to.
pub struct ExecutionContext {
    engine: ScriptEngine,
    collector: ResultCollector,
}

impl ExecutionContext {
    /// Splits the context into its parts.
    pub fn into_parts(self) -> (ScriptEngine, ResultCollector) {
        (self.engine, self.collector)
    }
}

/// Assembles one `ExecutionContext`.
pub struct ContextBuilder<'a> {
    rhai_config: &'a RhaiConfig,
    capabilities: Capabilities,
    collector: ResultCollector,
    params: &'a [Param],
    deadline: Option<Instant>,
}

impl<'a> ContextBuilder<'a> {
    /// Starts a builder for the given limits and capabilities.
    pub fn new(rhai_config: &'a RhaiConfig, capabilities: Capabilities) -> Self {
        Self { rhai_config, capabilities, collector: ResultCollector::new(), params: &[], deadline: None }
    }

    /// Parameters to bind under their declared names. Parameters without a
    /// value are bound as unit.
    pub fn params(mut self, params: &'a [Param]) -> Self {
        self.params = params;
        self
    }

    /// Collector to write into instead of a fresh one.
    pub fn collector(mut self, collector: ResultCollector) -> Self {
        self.collector = collector;
        self
    }

    /// Aborts the script once `timeout` has elapsed from now. A zero timeout
    /// disables the check.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);
        self
    }

    /// Creates the session and injects everything into it.
    pub fn build(self) -> ExecutionContext {
        let mut engine = ScriptEngine::new(self.rhai_config);
        engine.set_deadline(self.deadline);
        register_capabilities(
            &mut engine,
            self.rhai_config,
            &self.capabilities,
            &self.collector,
            self.deadline,
            0,
        );

        for param in self.params {
            let value = param.value.as_ref().map(param_value_to_dynamic).unwrap_or(Dynamic::UNIT);
            engine.add_var(&param.name, value);
        }

        ExecutionContext { engine, collector: self.collector }
    }
}

fn arg_string(args: &[Dynamic], index: usize, function: &str) -> Result<String, Box<EvalAltResult>> {
    args.get(index)
        .map(dynamic_to_plain_string)
        .ok_or_else(|| format!("{function} expects at least {} argument(s)", index + 1).into())
}

fn join_args(args: &[Dynamic]) -> String {
    args.iter().map(dynamic_to_plain_string).collect::<Vec<_>>().join(" ")
}

/// Registers the capability functions on `engine`. `depth` counts nested
/// `require` calls; module sessions inherit `deadline`.
fn register_capabilities(
    engine: &mut ScriptEngine,
    rhai_config: &RhaiConfig,
    capabilities: &Capabilities,
    collector: &ResultCollector,
    deadline: Option<Instant>,
    depth: usize,
) {
    register_data_source_type(engine.engine_mut());

    let namespace = capabilities.namespace.clone();
    engine.add_func("namespace", move |_, _| Ok(Dynamic::from(namespace.clone())));

    let caps = capabilities.clone();
    let config = rhai_config.clone();
    let sink = collector.clone();
    engine.add_func("require", move |_, args| {
        let path = arg_string(args, 0, "require")?;
        require_module(&config, &caps, &sink, deadline, depth, &path)
    });

    let caps = capabilities.clone();
    engine.add_func("db", move |_, args| {
        let name = arg_string(args, 0, "db")?;
        let access = caps
            .data_sources
            .select(&caps.namespace, &name)
            .ok_or_else(|| format!("Data source {name} not found"))?;
        Ok(Dynamic::from(DataSource::new(name, access)))
    });

    let sink = collector.clone();
    engine.add_func("println", move |_, args| {
        sink.println(join_args(args));
        Ok(Dynamic::UNIT)
    });

    let sink = collector.clone();
    engine.add_func("perror", move |_, args| {
        sink.perror(join_args(args));
        Ok(Dynamic::UNIT)
    });

    let sink = collector.clone();
    engine.add_func("setRespStatus", move |_, args| {
        let code = args
            .first()
            .and_then(|arg| arg.as_int().ok())
            .ok_or("setRespStatus expects an integer status")?;
        sink.set_status(code)?;
        Ok(Dynamic::UNIT)
    });

    let sink = collector.clone();
    engine.add_func("addRespHeader", move |_, args| {
        let name = arg_string(args, 0, "addRespHeader")?;
        let value = arg_string(args, 1, "addRespHeader")?;
        sink.add_header(name, value);
        Ok(Dynamic::UNIT)
    });

    let sink = collector.clone();
    engine.add_func("setRespData", move |_, args| {
        sink.set_data(args.first().map(dynamic_to_json).unwrap_or_default());
        Ok(Dynamic::UNIT)
    });
}

/// Runs the LOCAL module at `path` in its own session and returns its
/// `component.exports`.
fn require_module(
    rhai_config: &RhaiConfig,
    capabilities: &Capabilities,
    collector: &ResultCollector,
    deadline: Option<Instant>,
    depth: usize,
    path: &str,
) -> HostResult {
    if depth >= rhai_config.max_call_levels {
        return Err(format!("Module {path} exceeds the nesting limit").into());
    }
    let module = capabilities
        .modules
        .select(&capabilities.namespace, path)
        .ok_or_else(|| format!("Module {path} not found"))?;
    tracing::debug!(namespace = %capabilities.namespace, path = %path, depth, "Loading module.");

    let mut engine = ScriptEngine::new(rhai_config);
    engine.set_deadline(deadline);
    register_capabilities(&mut engine, rhai_config, capabilities, collector, deadline, depth + 1);
    engine.add_var(MODULE_CONTAINER, new_module_container());
    engine.set_script(split_source(&module.source).code);
    match engine.run() {
        Ok(()) => {}
        Err(ScriptError::Runtime(err)) if matches!(*err, EvalAltResult::ErrorTerminated(..)) => {
            return Err(err);
        }
        Err(e) => return Err(format!("Module {path} failed: {e}").into()),
    }

    let container = engine.get_var(MODULE_CONTAINER).map_err(|e| e.to_string())?;
    Ok(container
        .try_cast::<Map>()
        .and_then(|mut map| map.remove("exports"))
        .unwrap_or(Dynamic::UNIT))
}

/// A fresh `#{ exports: #{} }` container.
pub fn new_module_container() -> Map {
    let mut container = Map::new();
    container.insert("exports".into(), Map::new().into());
    container
}
