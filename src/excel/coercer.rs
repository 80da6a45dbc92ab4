//! Row coercion - untyped sheet cells ↔ typed records
//!
//! This is the only place where spreadsheet cells are interpreted. Import
//! goes through [`RowCoercer::coerce`], export through [`render_record`];
//! both share the same boolean and date vocabulary so an exported workbook
//! always imports back.

use crate::types::{
    CellValue, ColumnSpec, ColumnType, RawRow, Record, RowError, RowErrorKind, TableSchema,
    TypedRow, TypedValue,
};
use chrono::{NaiveDate, NaiveDateTime};

/// Tokens accepted as `true`; the first one is written on export
pub const TRUE_TOKENS: [&str; 5] = ["true", "1", "sí", "si", "yes"];
/// Tokens accepted as `false`; the first one is written on export
pub const FALSE_TOKENS: [&str; 3] = ["false", "0", "no"];

/// Date layouts accepted on import, tried in order
pub const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
const EXPORT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Positions of schema columns within one sheet's header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    /// One entry per schema column, in schema order
    positions: Vec<Option<usize>>,
}

impl HeaderMap {
    /// Match a header row against a schema
    ///
    /// Matching ignores case and surrounding whitespace; the first
    /// occurrence of a duplicated header wins. Returns the names of the
    /// required columns that are missing.
    pub fn build(schema: &TableSchema, header: &[CellValue]) -> Result<Self, Vec<String>> {
        let labels: Vec<String> = header
            .iter()
            .map(|cell| cell.to_string().trim().to_lowercase())
            .collect();

        let positions: Vec<Option<usize>> = schema
            .columns
            .iter()
            .map(|column| {
                let wanted = column.name.trim().to_lowercase();
                labels.iter().position(|label| *label == wanted)
            })
            .collect();

        let missing: Vec<String> = schema
            .columns
            .iter()
            .zip(&positions)
            .filter(|(column, position)| column.required && position.is_none())
            .map(|(column, _)| column.name.clone())
            .collect();

        if missing.is_empty() {
            Ok(Self { positions })
        } else {
            Err(missing)
        }
    }

    pub fn position(&self, column_index: usize) -> Option<usize> {
        self.positions.get(column_index).copied().flatten()
    }
}

/// Coerces raw rows of one sheet into typed rows of one table
#[derive(Debug, Clone)]
pub struct RowCoercer<'a> {
    schema: &'a TableSchema,
    sheet: String,
    header: HeaderMap,
}

impl<'a> RowCoercer<'a> {
    pub fn new(schema: &'a TableSchema, sheet: impl Into<String>, header: HeaderMap) -> Self {
        Self {
            schema,
            sheet: sheet.into(),
            header,
        }
    }

    /// Convert one raw row into a typed row, or explain why it cannot be
    ///
    /// Pure: the same row always yields the same outcome.
    pub fn coerce(&self, raw: &RawRow) -> Result<TypedRow, RowError> {
        let mut values = Record::new();

        for (column_index, column) in self.schema.columns.iter().enumerate() {
            let cell = match self.header.position(column_index) {
                Some(position) => raw.cell(position),
                None => &CellValue::Empty,
            };

            let value = if cell.is_empty() {
                if column.required {
                    return Err(self.row_error(raw, column, RowErrorKind::Required, "required".to_string()));
                }
                self.default_value(column)
            } else {
                coerce_cell(cell, column).map_err(|(kind, reason)| self.row_error(raw, column, kind, reason))?
            };

            values.insert(column.name.clone(), value);
        }

        Ok(TypedRow {
            index: raw.index,
            values,
        })
    }

    fn default_value(&self, column: &ColumnSpec) -> TypedValue {
        if column.name == self.schema.primary_key {
            return TypedValue::Null;
        }
        match column.column_type {
            ColumnType::Text | ColumnType::LongText => TypedValue::Text(String::new()),
            ColumnType::Integer => TypedValue::Integer(0),
            ColumnType::Decimal => TypedValue::Decimal(0.0),
            ColumnType::Boolean => TypedValue::Boolean(false),
            ColumnType::Date => TypedValue::Null,
        }
    }

    fn row_error(&self, raw: &RawRow, column: &ColumnSpec, kind: RowErrorKind, reason: String) -> RowError {
        RowError {
            table: self.schema.id.clone(),
            sheet: self.sheet.clone(),
            row: raw.index,
            column: Some(column.name.clone()),
            key: self.raw_key(raw),
            kind,
            reason,
        }
    }

    /// Raw primary-key cell of a row, for error reports
    fn raw_key(&self, raw: &RawRow) -> Option<String> {
        let key_index = self
            .schema
            .columns
            .iter()
            .position(|c| c.name == self.schema.primary_key)?;
        let cell = raw.cell(self.header.position(key_index)?);
        if cell.is_empty() {
            None
        } else {
            Some(cell.to_string().trim().to_string())
        }
    }
}

/// Convert a non-empty cell to a column's type
fn coerce_cell(cell: &CellValue, column: &ColumnSpec) -> Result<TypedValue, (RowErrorKind, String)> {
    let invalid = || {
        (
            RowErrorKind::InvalidValue,
            format!("expected {}, found \"{}\"", column.column_type, cell),
        )
    };

    match column.column_type {
        ColumnType::Text | ColumnType::LongText => {
            let text = cell_text(cell);
            if column.column_type == ColumnType::Text && text.chars().count() > ColumnType::TEXT_MAX_CHARS {
                return Err((
                    RowErrorKind::TooLong,
                    format!(
                        "text longer than {} characters ({})",
                        ColumnType::TEXT_MAX_CHARS,
                        text.chars().count()
                    ),
                ));
            }
            Ok(TypedValue::Text(text))
        }
        ColumnType::Integer => match cell {
            // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
            CellValue::Number(n) if n.fract() == 0.0 && *n >= -I64_BOUND && *n < I64_BOUND => {
                Ok(TypedValue::Integer(*n as i64))
            }
            CellValue::Text(s) => s.trim().parse::<i64>().map(TypedValue::Integer).map_err(|_| invalid()),
            _ => Err(invalid()),
        },
        ColumnType::Decimal => match cell {
            CellValue::Number(n) if n.is_finite() => Ok(TypedValue::Decimal(*n)),
            CellValue::Text(s) => parse_decimal(s).map(TypedValue::Decimal).ok_or_else(invalid),
            _ => Err(invalid()),
        },
        ColumnType::Boolean => match cell {
            CellValue::Bool(b) => Ok(TypedValue::Boolean(*b)),
            CellValue::Number(n) if *n == 1.0 => Ok(TypedValue::Boolean(true)),
            CellValue::Number(n) if *n == 0.0 => Ok(TypedValue::Boolean(false)),
            CellValue::Text(s) => parse_boolean(s).map(TypedValue::Boolean).ok_or_else(invalid),
            _ => Err(invalid()),
        },
        ColumnType::Date => match cell {
            CellValue::Date(d) => Ok(TypedValue::Date(*d)),
            CellValue::Number(n) => super::codec::excel_serial_to_date(*n)
                .map(TypedValue::Date)
                .ok_or_else(invalid),
            CellValue::Text(s) => parse_date(s).map(TypedValue::Date).ok_or_else(invalid),
            _ => Err(invalid()),
        },
    }
}

fn cell_text(cell: &CellValue) -> String {
    match cell {
        CellValue::Bool(b) => boolean_token(*b).to_string(),
        other => other.to_string().trim().to_string(),
    }
}

/// Locale-invariant decimal: `.` separator, no grouping, finite only
pub fn parse_decimal(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let well_formed = !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
    if !well_formed {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_boolean(text: &str) -> Option<bool> {
    let token = text.trim().to_lowercase();
    if TRUE_TOKENS.contains(&token.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Some(false)
    } else {
        None
    }
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
                .map(|dt| dt.date())
        })
}

pub fn boolean_token(value: bool) -> &'static str {
    if value {
        TRUE_TOKENS[0]
    } else {
        FALSE_TOKENS[0]
    }
}

/// 2^63 as a float
const I64_BOUND: f64 = 9.223_372_036_854_775_808e18;

/// Largest magnitude a numeric cell holds without rounding (2^53)
const MAX_EXACT_INTEGER: u64 = 1 << 53;

/// Render a stored record as sheet cells in schema column order
pub fn render_record(schema: &TableSchema, record: &Record) -> Vec<CellValue> {
    schema
        .columns
        .iter()
        .map(|column| match record.get(&column.name) {
            Some(value) => render_value(value),
            None => CellValue::Empty,
        })
        .collect()
}

fn render_value(value: &TypedValue) -> CellValue {
    match value {
        TypedValue::Null => CellValue::Empty,
        TypedValue::Text(s) => CellValue::Text(s.clone()),
        TypedValue::Integer(i) if i.unsigned_abs() <= MAX_EXACT_INTEGER => CellValue::Number(*i as f64),
        TypedValue::Integer(i) => CellValue::Text(i.to_string()),
        TypedValue::Decimal(d) => CellValue::Number(*d),
        TypedValue::Boolean(b) => CellValue::Text(boolean_token(*b).to_string()),
        TypedValue::Date(d) => CellValue::Text(d.format(EXPORT_DATE_FORMAT).to_string()),
    }
}

/// Header row for a schema: column names in schema order
pub fn header_row(schema: &TableSchema) -> Vec<CellValue> {
    schema
        .columns
        .iter()
        .map(|column| CellValue::Text(column.name.clone()))
        .collect()
}
