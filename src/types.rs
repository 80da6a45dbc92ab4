use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

//==============================================================================
// Schema Types
//==============================================================================

/// Semantic type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Short text (at most [`ColumnType::TEXT_MAX_CHARS`] characters)
    Text,
    /// Whole number (i64)
    Integer,
    /// Decimal number (f64)
    Decimal,
    /// true/false
    Boolean,
    /// Calendar date without time
    Date,
    /// Arbitrary-length text
    LongText,
}

impl ColumnType {
    pub const TEXT_MAX_CHARS: usize = 255;

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Decimal => "decimal",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::LongText => "long_text",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// One column of a table schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub required: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType, required: bool) -> Self {
        Self {
            name: name.into(),
            column_type,
            required,
        }
    }

    pub fn required(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self::new(name, column_type, true)
    }

    pub fn optional(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self::new(name, column_type, false)
    }
}

/// Declared shape of one table known to the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table identifier (e.g. `productos`)
    pub id: String,
    /// Canonical sheet name used on export and for detection on import
    pub sheet_name: String,
    /// Column used to identify a failing row in reports
    pub primary_key: String,
    /// Columns in export order
    pub columns: Vec<ColumnSpec>,
    /// Extra sheet names that also resolve to this table
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl TableSchema {
    pub fn new(
        id: impl Into<String>,
        sheet_name: impl Into<String>,
        primary_key: impl Into<String>,
        columns: Vec<ColumnSpec>,
    ) -> Self {
        Self {
            id: id.into(),
            sheet_name: sheet_name.into(),
            primary_key: primary_key.into(),
            columns,
            aliases: Vec::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn required_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.required)
    }
}

//==============================================================================
// Cell and Row Types
//==============================================================================

/// Untyped spreadsheet cell, independent of the workbook library
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl CellValue {
    /// Empty cells and whitespace-only text both count as empty
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// One data row as read from a sheet
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based position below the header row
    pub index: usize,
    pub cells: Vec<CellValue>,
}

impl RawRow {
    pub fn new(index: usize, cells: Vec<CellValue>) -> Self {
        Self { index, cells }
    }

    pub fn cell(&self, position: usize) -> &CellValue {
        self.cells.get(position).unwrap_or(&CellValue::Empty)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(CellValue::is_empty)
    }
}

/// A coerced, typed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedValue {
    Null,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Date(NaiveDate),
}

impl TypedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    /// Text used to identify a row by its key in reports
    pub fn key_text(&self) -> Option<String> {
        match self {
            TypedValue::Null => None,
            TypedValue::Text(s) => Some(s.clone()),
            TypedValue::Integer(i) => Some(i.to_string()),
            TypedValue::Decimal(d) => Some(d.to_string()),
            TypedValue::Boolean(b) => Some(b.to_string()),
            TypedValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// A business record keyed by column name
pub type Record = BTreeMap<String, TypedValue>;

/// A record that passed coercion, tagged with its sheet row
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRow {
    pub index: usize,
    pub values: Record,
}

impl TypedRow {
    pub fn get(&self, column: &str) -> Option<&TypedValue> {
        self.values.get(column)
    }
}

//==============================================================================
// Report Types
//==============================================================================

/// Machine-readable cause of a [`RowError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowErrorKind {
    /// Required cell was empty
    Required,
    /// Cell could not be converted to the column type
    InvalidValue,
    /// Text longer than the column allows
    TooLong,
    /// Required column absent from the header row (sheet-scoped)
    MissingColumn,
    /// Store refused the row (constraint violation, write failure)
    Rejected,
}

/// A failure attributed to one row, or to the header row (row 0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowError {
    pub table: String,
    pub sheet: String,
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub kind: RowErrorKind,
    pub reason: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} row {}", self.sheet, self.row)?;
        if let Some(column) = &self.column {
            write!(f, ", column '{}'", column)?;
        }
        if let Some(key) = &self.key {
            write!(f, " (key {})", key)?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// Outcome of importing one sheet into one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableImportResult {
    pub table: String,
    pub sheet: String,
    pub attempted: usize,
    pub inserted: usize,
    /// Row-scoped failures; always `attempted - inserted` long
    pub errors: Vec<RowError>,
    /// Header failure that stopped the sheet before any row was read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_error: Option<RowError>,
}

impl TableImportResult {
    pub fn new(table: impl Into<String>, sheet: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            sheet: sheet.into(),
            attempted: 0,
            inserted: 0,
            errors: Vec::new(),
            sheet_error: None,
        }
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }
}

/// Overall classification of an import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    /// No row was inserted
    Nothing,
    /// Some rows were inserted, some failed or some sheets were skipped
    Partial,
    /// Every row of every sheet was inserted
    Complete,
}

/// Result of one import call across all sheets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub attempted: usize,
    pub inserted: usize,
    pub failed: usize,
    pub tables: Vec<TableImportResult>,
    /// Sheet- and row-scoped errors of every table, in sheet order
    pub errors: Vec<RowError>,
    pub unmatched_sheets: Vec<String>,
}

impl ImportReport {
    pub fn status(&self) -> ImportStatus {
        let clean = self.failed == 0
            && self.unmatched_sheets.is_empty()
            && self.tables.iter().all(|t| t.sheet_error.is_none());
        if self.inserted == 0 {
            ImportStatus::Nothing
        } else if clean {
            ImportStatus::Complete
        } else {
            ImportStatus::Partial
        }
    }

    /// Distinct table ids that had at least one sheet processed
    pub fn tables_touched(&self) -> Vec<&str> {
        let mut touched: Vec<&str> = Vec::new();
        for result in &self.tables {
            if !touched.contains(&result.table.as_str()) {
                touched.push(&result.table);
            }
        }
        touched
    }

    pub fn table(&self, id: &str) -> Option<&TableImportResult> {
        self.tables.iter().find(|t| t.table == id)
    }
}
