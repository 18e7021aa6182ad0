//! Row mapping for dynamic result sets.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::value::{FromValue, Value};

/// A single result row: a shared column header and one [`Value`] per column.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Build a row from name/value pairs. Mostly useful for tests and
    /// executor implementations.
    pub fn from_pairs(pairs: Vec<(String, Value)>) -> Self {
        let (columns, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at a positional index.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value of a named column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Typed access to a named column.
    pub fn try_get<T: FromValue>(&self, column: &str) -> Result<T> {
        let value = self
            .get(column)
            .ok_or_else(|| Error::decode(column, "no such column"))?;
        T::from_value(value).map_err(|e| match e {
            Error::Decode { message, .. } => Error::decode(column, message),
            other => other,
        })
    }

    /// Typed access by positional index.
    pub fn try_get_index<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self
            .value(index)
            .ok_or_else(|| Error::decode(index.to_string(), "no such column index"))?;
        T::from_value(value).map_err(|e| match e {
            Error::Decode { message, .. } => Error::decode(index.to_string(), message),
            other => other,
        })
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Trait for converting a result row into a Rust struct.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(row.clone())
    }
}
