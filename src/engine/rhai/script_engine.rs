//! A single-use Rhai session: one engine, one scope, one script buffer.

use std::{any::TypeId, sync::Arc, time::Instant};

use rhai::{Dynamic, Engine, EvalAltResult, NativeCallContext, Scope};
use thiserror::Error;

use super::create_engine;
use crate::config::RhaiConfig;

/// Highest number of arguments a host function accepts from a script.
pub const MAX_HOST_ARGS: usize = 8;

/// Operations between deadline checks.
const DEADLINE_CHECK_INTERVAL: u64 = 1_024;

/// A host-implemented function callable from scripts. It receives the call
/// context and the evaluated arguments.
pub type HostFunction = Arc<
    dyn Fn(&NativeCallContext, &[Dynamic]) -> Result<Dynamic, Box<EvalAltResult>> + Send + Sync,
>;

/// Errors raised by a `ScriptEngine`.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The variable was never set, or the script was never run.
    #[error("Variable {0} not found")]
    VariableNotFound(String),

    /// The script failed to parse.
    #[error("Script syntax error: {0}")]
    Syntax(Box<EvalAltResult>),

    /// The script failed while running.
    #[error("Script runtime error: {0}")]
    Runtime(Box<EvalAltResult>),
}

impl ScriptError {
    /// Returns true if the run was cut short by the progress callback.
    pub fn is_terminated(&self) -> bool {
        matches!(self, ScriptError::Runtime(err) if terminated(err))
    }
}

fn terminated(err: &EvalAltResult) -> bool {
    match err {
        EvalAltResult::ErrorTerminated(..) => true,
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => terminated(inner),
        _ => false,
    }
}

impl From<Box<EvalAltResult>> for ScriptError {
    fn from(err: Box<EvalAltResult>) -> Self {
        match *err {
            EvalAltResult::ErrorParsing(..) => ScriptError::Syntax(err),
            _ => ScriptError::Runtime(err),
        }
    }
}

impl From<rhai::ParseError> for ScriptError {
    fn from(err: rhai::ParseError) -> Self {
        ScriptError::Syntax(err.into())
    }
}

/// An interpreter session over one script unit.
///
/// Owns its engine and scope, so nothing set up for one session is visible
/// to another. Sessions are meant to be created, run once and dropped.
pub struct ScriptEngine {
    engine: Engine,
    scope: Scope<'static>,
    script: String,
    executed: bool,
}

impl ScriptEngine {
    /// Creates a session with the configured limits and no host functions.
    pub fn new(rhai_config: &RhaiConfig) -> Self {
        Self {
            engine: create_engine(rhai_config),
            scope: Scope::new(),
            script: String::new(),
            executed: false,
        }
    }

    /// Replaces the script buffer.
    pub fn set_script(&mut self, src: &str) {
        self.script.clear();
        self.script.push_str(src);
    }

    /// Appends to the script buffer.
    pub fn add_script(&mut self, src: &str) {
        if !self.script.is_empty() && !self.script.ends_with('\n') {
            self.script.push('\n');
        }
        self.script.push_str(src);
    }

    /// Binds a value into the script's variable namespace.
    pub fn add_var(&mut self, name: &str, value: impl Into<Dynamic>) {
        self.scope.set_or_push(name, value.into());
    }

    /// Reads a variable back after the script has run.
    pub fn get_var(&self, name: &str) -> Result<Dynamic, ScriptError> {
        if !self.executed {
            return Err(ScriptError::VariableNotFound(name.to_string()));
        }
        self.scope
            .get_value::<Dynamic>(name)
            .ok_or_else(|| ScriptError::VariableNotFound(name.to_string()))
    }

    /// Exposes a host function under `name`, callable with up to
    /// `MAX_HOST_ARGS` arguments of any type.
    pub fn add_func<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&NativeCallContext, &[Dynamic]) -> Result<Dynamic, Box<EvalAltResult>>
            + Send
            + Sync
            + 'static,
    {
        let func: HostFunction = Arc::new(func);
        for arity in 0..=MAX_HOST_ARGS {
            let func = func.clone();
            #[allow(deprecated)]
            self.engine.register_raw_fn(
                name,
                vec![TypeId::of::<Dynamic>(); arity],
                move |context, args| {
                    let values: Vec<Dynamic> = args.iter().map(|arg| (**arg).clone()).collect();
                    func(&context, &values)
                },
            );
        }
    }

    /// Terminates runs still going at `deadline`. `None` leaves runs
    /// bounded only by the operation limit.
    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        if let Some(deadline) = deadline {
            self.engine.on_progress(move |ops| {
                if ops % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
                    Some(Dynamic::UNIT)
                } else {
                    None
                }
            });
        }
    }

    /// Gives access to the engine for registering custom types.
    pub(crate) fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Parses the script buffer without running it.
    pub fn compile(&self) -> Result<(), ScriptError> {
        self.engine.compile(&self.script)?;
        Ok(())
    }

    /// Runs the script buffer to completion.
    pub fn run(&mut self) -> Result<(), ScriptError> {
        let result = self.engine.run_with_scope(&mut self.scope, &self.script);
        self.executed = true;
        result.map_err(ScriptError::from)
    }
}
