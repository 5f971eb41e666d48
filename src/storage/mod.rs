//! Storage Layer - row lookup for the exporter
//!
//! The exporter reads rows through the [`RowSource`] contract only:
//! - `fetch_one(table, key, value)`: a single row by identifying key
//! - `fetch_many(table, key, value)`: all rows referencing a value
//! - `fetch_all(table)`: every row, for listings
//!
//! Lookup values are always bound as parameters, never formatted into SQL.

pub mod sqlite;
#[cfg(test)]
pub(crate) mod schema;

pub use sqlite::SqliteStore;

use crate::Result;
use crate::row::{Row, Value};

/// Read access to the relational store
pub trait RowSource {
    /// Fetch the row whose `key` attribute equals `value`
    fn fetch_one(&self, table: &str, key: &str, value: &Value) -> Result<Option<Row>>;

    /// Fetch every row whose `key` attribute equals `value`, in a stable order
    fn fetch_many(&self, table: &str, key: &str, value: &Value) -> Result<Vec<Row>>;

    /// Fetch every row of `table`, in a stable order
    fn fetch_all(&self, table: &str) -> Result<Vec<Row>>;
}

impl<T: RowSource + ?Sized> RowSource for &T {
    fn fetch_one(&self, table: &str, key: &str, value: &Value) -> Result<Option<Row>> {
        (**self).fetch_one(table, key, value)
    }

    fn fetch_many(&self, table: &str, key: &str, value: &Value) -> Result<Vec<Row>> {
        (**self).fetch_many(table, key, value)
    }

    fn fetch_all(&self, table: &str) -> Result<Vec<Row>> {
        (**self).fetch_all(table)
    }
}
