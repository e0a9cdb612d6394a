//! Collects everything a handler reports while it runs.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde_json::Value;

use crate::models::{ExecutionResult, execution::DEFAULT_STATUS};

/// Prefix applied to lines written through `perror`.
pub const ERROR_LINE_PREFIX: &str = "ERROR: ";

#[derive(Debug)]
struct CollectorState {
    log: Vec<String>,
    status: u16,
    headers: BTreeMap<String, String>,
    data: Value,
}

impl Default for CollectorState {
    fn default() -> Self {
        Self { log: Vec::new(), status: DEFAULT_STATUS, headers: BTreeMap::new(), data: Value::Null }
    }
}

/// Shared sink for log lines and response parts of one invocation.
///
/// Clones share state, so host functions registered on the engine can each
/// hold one while the executor keeps another to read the outcome.
#[derive(Debug, Clone, Default)]
pub struct ResultCollector {
    state: Arc<Mutex<CollectorState>>,
}

impl ResultCollector {
    /// Creates an empty collector with the default status.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CollectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a log line.
    pub fn println(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!(line = %line, "Script log.");
        self.lock().log.push(line);
    }

    /// Appends an error log line.
    pub fn perror(&self, line: impl AsRef<str>) {
        let line = line.as_ref();
        tracing::warn!(line = %line, "Script error log.");
        self.lock().log.push(format!("{ERROR_LINE_PREFIX}{line}"));
    }

    /// Sets the response status. Codes outside 100..=599 are rejected.
    pub fn set_status(&self, code: i64) -> Result<(), String> {
        let status = u16::try_from(code)
            .ok()
            .filter(|c| (100..=599).contains(c))
            .ok_or_else(|| format!("Invalid response status {code}"))?;
        self.lock().status = status;
        Ok(())
    }

    /// Sets a response header, replacing any previous value.
    pub fn add_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.lock().headers.insert(name.into(), value.into());
    }

    /// Sets the response payload.
    pub fn set_data(&self, data: Value) {
        self.lock().data = data;
    }

    /// Returns a copy of the log written so far.
    pub fn log_lines(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    /// Packages the collected state as the invocation's result.
    pub fn finish(&self) -> ExecutionResult {
        let state = std::mem::take(&mut *self.lock());
        ExecutionResult {
            log: state.log,
            status: state.status,
            headers: state.headers,
            data: state.data,
        }
    }
}
