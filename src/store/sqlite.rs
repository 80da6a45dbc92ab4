//! SQLite-backed store

use super::{BatchOutcome, StoreError, StoreReader, StoreWriter};
use crate::excel::coercer::{parse_boolean, parse_date};
use crate::registry::TableRegistry;
use crate::types::{ColumnSpec, ColumnType, Record, TableSchema, TypedRow, TypedValue};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Store over one SQLite connection
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an existing database for reading only; a missing file is an error
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create every registry table that does not exist yet
    pub fn ensure_schema(&self, registry: &TableRegistry) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;
        for schema in registry.schemas() {
            conn.execute(&create_table_sql(schema), [])?;
        }
        Ok(())
    }

    /// Number of rows in a table
    pub fn count(&self, table: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl StoreReader for SqliteStore {
    fn fetch_all(&self, schema: &TableSchema) -> Result<Vec<Record>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;
        let columns: Vec<String> = schema.columns.iter().map(|c| quote(&c.name)).collect();
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {} ASC",
            columns.join(", "),
            quote(&schema.id),
            quote(&schema.primary_key)
        );

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (i, column) in schema.columns.iter().enumerate() {
                let raw: Value = row.get(i)?;
                record.insert(column.name.clone(), from_sql(schema, column, raw)?);
            }
            records.push(record);
        }

        Ok(records)
    }
}

impl StoreWriter for SqliteStore {
    fn insert_batch(&self, schema: &TableSchema, rows: &[TypedRow]) -> Result<BatchOutcome, StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Lock)?;
        let sql = insert_sql(schema);
        // A statement that does not prepare fails the batch, not each row
        conn.prepare_cached(&sql)?;
        let mut tx = conn.transaction()?;
        let mut outcome = BatchOutcome::default();

        for row in rows {
            let params: Vec<Value> = schema
                .columns
                .iter()
                .map(|column| to_sql(row.get(&column.name)))
                .collect();

            let savepoint = tx.savepoint()?;
            match savepoint.execute(&sql, params_from_iter(params.iter())) {
                Ok(_) => {
                    savepoint.commit()?;
                    outcome.inserted += 1;
                }
                Err(e) => {
                    debug!(table = %schema.id, row = row.index, error = %e, "row rejected by store");
                    // Default drop behavior rolls the savepoint back
                    savepoint.finish()?;
                    outcome.reject(row.index, e.to_string());
                }
            }
        }

        tx.commit()?;
        Ok(outcome)
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn sql_type(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Text | ColumnType::LongText | ColumnType::Date => "TEXT",
        ColumnType::Integer | ColumnType::Boolean => "INTEGER",
        ColumnType::Decimal => "REAL",
    }
}

fn create_table_sql(schema: &TableSchema) -> String {
    let columns: Vec<String> = schema
        .columns
        .iter()
        .map(|column| {
            let mut definition = format!("{} {}", quote(&column.name), sql_type(column.column_type));
            if column.name == schema.primary_key {
                definition.push_str(" PRIMARY KEY");
                if column.column_type != ColumnType::Integer {
                    definition.push_str(" NOT NULL");
                }
            } else if column.required {
                definition.push_str(" NOT NULL");
            }
            definition
        })
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote(&schema.id),
        columns.join(", ")
    )
}

fn insert_sql(schema: &TableSchema) -> String {
    let columns: Vec<String> = schema.columns.iter().map(|c| quote(&c.name)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(&schema.id),
        columns.join(", "),
        placeholders.join(", ")
    )
}

fn to_sql(value: Option<&TypedValue>) -> Value {
    match value {
        None | Some(TypedValue::Null) => Value::Null,
        Some(TypedValue::Text(s)) => Value::Text(s.clone()),
        Some(TypedValue::Integer(i)) => Value::Integer(*i),
        Some(TypedValue::Decimal(d)) => Value::Real(*d),
        Some(TypedValue::Boolean(b)) => Value::Integer(i64::from(*b)),
        Some(TypedValue::Date(d)) => Value::Text(d.format("%Y-%m-%d").to_string()),
    }
}

fn from_sql(schema: &TableSchema, column: &ColumnSpec, raw: Value) -> Result<TypedValue, StoreError> {
    let shown = match &raw {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => format!("'{}'", s),
        Value::Blob(b) => format!("<{} byte blob>", b.len()),
    };
    let value = match (column.column_type, raw) {
        (_, Value::Null) => Some(TypedValue::Null),
        (ColumnType::Text | ColumnType::LongText, Value::Text(s)) => Some(TypedValue::Text(s)),
        (ColumnType::Text | ColumnType::LongText, Value::Integer(i)) => Some(TypedValue::Text(i.to_string())),
        (ColumnType::Text | ColumnType::LongText, Value::Real(f)) => Some(TypedValue::Text(f.to_string())),
        (ColumnType::Integer, Value::Integer(i)) => Some(TypedValue::Integer(i)),
        (ColumnType::Integer, Value::Real(f)) if f.fract() == 0.0 => Some(TypedValue::Integer(f as i64)),
        (ColumnType::Decimal, Value::Real(f)) => Some(TypedValue::Decimal(f)),
        (ColumnType::Decimal, Value::Integer(i)) => Some(TypedValue::Decimal(i as f64)),
        (ColumnType::Boolean, Value::Integer(i)) => Some(TypedValue::Boolean(i != 0)),
        (ColumnType::Boolean, Value::Text(s)) => parse_boolean(&s).map(TypedValue::Boolean),
        (ColumnType::Date, Value::Text(s)) => parse_date(&s).map(TypedValue::Date),
        _ => None,
    };

    value.ok_or_else(|| StoreError::Corrupt {
        table: schema.id.clone(),
        column: column.name.clone(),
        expected: column.column_type.to_string(),
        value: shown,
    })
}
