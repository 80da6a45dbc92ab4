//! Store collaborators
//!
//! The engine reads and writes the relational store only through
//! [`StoreReader`] and [`StoreWriter`]. Two implementations ship with the
//! crate: [`MemoryStore`] and [`SqliteStore`].

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::types::{Record, TableSchema, TypedRow};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store lock poisoned")]
    Lock,

    #[error("table '{0}' does not exist in the store")]
    MissingTable(String),

    #[error("row rejected: {0}")]
    Rejected(String),

    #[error("stored value for {table}.{column} is not a valid {expected}: {value}")]
    Corrupt {
        table: String,
        column: String,
        expected: String,
        value: String,
    },
}

/// A row the store refused while the rest of its batch was committed
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    /// Sheet row index of the rejected [`TypedRow`]
    pub index: usize,
    pub reason: String,
}

/// Result of one table-scoped batch insert
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub inserted: usize,
    pub rejected: Vec<RejectedRow>,
}

impl BatchOutcome {
    pub fn reject(&mut self, index: usize, reason: impl Into<String>) {
        self.rejected.push(RejectedRow {
            index,
            reason: reason.into(),
        });
    }
}

/// Read access to the store for export
pub trait StoreReader: Send + Sync {
    /// Every row of a table, ordered by primary key ascending
    fn fetch_all(&self, schema: &TableSchema) -> Result<Vec<Record>, StoreError>;
}

/// Write access to the store for import
pub trait StoreWriter: Send + Sync {
    /// Insert a batch inside one table-scoped transaction
    ///
    /// Row-level atomicity: a row the store rejects is reported in
    /// [`BatchOutcome::rejected`] and the remaining rows are committed.
    /// An `Err` means nothing from the batch was committed.
    fn insert_batch(&self, schema: &TableSchema, rows: &[TypedRow]) -> Result<BatchOutcome, StoreError>;
}
