//! An in-memory `DataAccess` for tests.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};

use crate::{
    engine::capabilities::{DataAccess, DataAccessError},
    models::QueryRows,
};

#[derive(Default)]
struct MemoryState {
    rows: Vec<Map<String, Value>>,
    saved: Vec<(Option<String>, Value)>,
    failure: Option<String>,
}

/// A table of rows every query reads from. Saved records are appended to
/// the rows; `exec` reports the current row count.
#[derive(Default)]
pub struct MemoryDataAccess {
    state: Mutex<MemoryState>,
}

impl MemoryDataAccess {
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a row. Non-object values are ignored.
    pub fn push_row(&self, row: Value) {
        if let Value::Object(map) = row {
            self.lock().rows.push(map);
        }
    }

    /// Makes every subsequent call fail with `message`.
    pub fn fail_with(&self, message: &str) {
        self.lock().failure = Some(message.to_string());
    }

    /// Records passed to `save`/`batchSave`, with their target table.
    pub fn saved(&self) -> Vec<(Option<String>, Value)> {
        self.lock().saved.clone()
    }

    fn check(&self) -> Result<MutexGuard<'_, MemoryState>, DataAccessError> {
        let state = self.lock();
        match &state.failure {
            Some(message) => Err(DataAccessError::Query(message.clone())),
            None => Ok(state),
        }
    }
}

impl DataAccess for MemoryDataAccess {
    fn query_map(&self, _query: &str, _arg: &Value) -> Result<Map<String, Value>, DataAccessError> {
        Ok(self.check()?.rows.first().cloned().unwrap_or_default())
    }

    fn query_map_list(
        &self,
        _query: &str,
        _arg: &Value,
        page_number: i64,
        page_size: i64,
    ) -> Result<Vec<Map<String, Value>>, DataAccessError> {
        if page_number < 1 || page_size < 1 {
            return Err(DataAccessError::InvalidArgument(format!(
                "page {page_number} of size {page_size}"
            )));
        }
        let skip = ((page_number - 1) * page_size) as usize;
        Ok(self.check()?.rows.iter().skip(skip).take(page_size as usize).cloned().collect())
    }

    fn query(&self, _query: &str, _arg: &Value) -> Result<QueryRows, DataAccessError> {
        let state = self.check()?;
        let columns: Vec<String> =
            state.rows.first().map(|row| row.keys().cloned().collect()).unwrap_or_default();
        let rows = state
            .rows
            .iter()
            .map(|row| columns.iter().map(|c| row.get(c).cloned().unwrap_or(Value::Null)).collect())
            .collect();
        Ok(QueryRows { columns, rows })
    }

    fn exec(&self, _query: &str, _arg: &Value) -> Result<i64, DataAccessError> {
        Ok(self.check()?.rows.len() as i64)
    }

    fn save(&self, arg: &Value, table: Option<&str>) -> Result<i64, DataAccessError> {
        self.batch_save(std::slice::from_ref(arg), table)
    }

    fn batch_save(&self, args: &[Value], table: Option<&str>) -> Result<i64, DataAccessError> {
        let mut state = self.check()?;
        for arg in args {
            let Value::Object(map) = arg else {
                return Err(DataAccessError::InvalidArgument(format!("{arg} is not a record")));
            };
            state.rows.push(map.clone());
            state.saved.push((table.map(str::to_string), arg.clone()));
        }
        Ok(args.len() as i64)
    }
}
