//! Output sink traits and types
//!
//! This module defines the trait interface for result sinks and the row
//! type flowing into them.

use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Existing dataset {path} has header '{found}', expected '{expected}'")]
    HeaderMismatch {
        path: String,
        found: String,
        expected: String,
    },

    #[error("Dataset lock poisoned")]
    Poisoned,
}

/// Result type for output operations
pub type SinkResult<T> = Result<T, SinkError>;

/// One harvested record, keyed by column name
///
/// Fields outside the sink's column list are ignored when written; columns
/// without a field are written as empty cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultRow {
    fields: BTreeMap<String, String>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Projects the row onto an ordered column list
    pub fn to_record<'a>(&'a self, columns: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
        columns.iter().map(move |c| self.get(c).unwrap_or(""))
    }
}

/// Trait for consolidated output destinations
///
/// `append` is called concurrently by every worker; implementations
/// serialize writers so a batch lands as whole rows.
pub trait ResultSink: Send + Sync {
    /// Appends a batch of rows, returning how many were written
    ///
    /// An empty batch writes nothing, not even the header.
    fn append(&self, rows: &[ResultRow]) -> SinkResult<usize>;

    /// Fixed, ordered column list
    fn columns(&self) -> &[String];
}
