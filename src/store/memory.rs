//! In-process store, used for dry runs and tests

use super::{BatchOutcome, StoreError, StoreReader, StoreWriter};
use crate::registry::TableRegistry;
use crate::types::{Record, TableSchema, TypedRow, TypedValue};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum StoredKey {
    Int(i64),
    Text(String),
}

impl StoredKey {
    fn from_value(value: &TypedValue) -> Option<Self> {
        match value {
            TypedValue::Integer(i) => Some(StoredKey::Int(*i)),
            TypedValue::Null => None,
            other => other.key_text().map(StoredKey::Text),
        }
    }
}

type Table = BTreeMap<StoredKey, Record>;

/// Tables held in memory, keyed by primary key
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with one empty table per registry schema
    pub fn for_registry(registry: &TableRegistry) -> Self {
        let store = Self::new();
        for id in registry.all_table_ids() {
            store.create_table(id);
        }
        store
    }

    pub fn create_table(&self, table: &str) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.entry(table.to_string()).or_default();
        }
    }

    pub fn drop_table(&self, table: &str) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.remove(table);
        }
    }

    /// Number of rows in a table (0 for unknown tables)
    pub fn count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .map(|tables| tables.get(table).map(BTreeMap::len).unwrap_or(0))
            .unwrap_or(0)
    }

    /// Insert records directly, bypassing the import pipeline
    pub fn seed(&self, schema: &TableSchema, records: Vec<Record>) -> Result<(), StoreError> {
        let rows: Vec<TypedRow> = records
            .into_iter()
            .enumerate()
            .map(|(i, values)| TypedRow { index: i + 1, values })
            .collect();
        let outcome = self.insert_batch(schema, &rows)?;
        match outcome.rejected.first() {
            Some(rejected) => Err(StoreError::Rejected(rejected.reason.clone())),
            None => Ok(()),
        }
    }
}

impl StoreReader for MemoryStore {
    fn fetch_all(&self, schema: &TableSchema) -> Result<Vec<Record>, StoreError> {
        let tables = self.tables.lock().map_err(|_| StoreError::Lock)?;
        let table = tables
            .get(&schema.id)
            .ok_or_else(|| StoreError::MissingTable(schema.id.clone()))?;
        Ok(table.values().cloned().collect())
    }
}

impl StoreWriter for MemoryStore {
    fn insert_batch(&self, schema: &TableSchema, rows: &[TypedRow]) -> Result<BatchOutcome, StoreError> {
        let mut tables = self.tables.lock().map_err(|_| StoreError::Lock)?;
        let table = tables
            .get_mut(&schema.id)
            .ok_or_else(|| StoreError::MissingTable(schema.id.clone()))?;

        let mut outcome = BatchOutcome::default();
        for row in rows {
            let mut values = row.values.clone();
            let key = match values.get(&schema.primary_key).and_then(StoredKey::from_value) {
                Some(key) => key,
                None => match next_integer_key(table) {
                    Some(next) => {
                        values.insert(schema.primary_key.clone(), TypedValue::Integer(next));
                        StoredKey::Int(next)
                    }
                    None => {
                        outcome.reject(row.index, format!("missing value for key '{}'", schema.primary_key));
                        continue;
                    }
                },
            };

            if table.contains_key(&key) {
                outcome.reject(
                    row.index,
                    format!("duplicate key: {}.{} already exists", schema.id, schema.primary_key),
                );
                continue;
            }
            table.insert(key, values);
            outcome.inserted += 1;
        }

        Ok(outcome)
    }
}

/// Next free integer key, `None` when the table is keyed by text or the
/// largest key is `i64::MAX`
fn next_integer_key(table: &Table) -> Option<i64> {
    if table.is_empty() {
        return Some(1);
    }
    // Int keys sort before text keys
    match table.keys().rev().find(|key| matches!(key, StoredKey::Int(_))) {
        Some(StoredKey::Int(max)) => max.checked_add(1),
        _ => None,
    }
}
