//! Workbook codec - .xlsx bytes ↔ named sheets of untyped cells

use crate::error::{InterchangeError, InterchangeResult};
use crate::types::{CellValue, RawRow};
use calamine::{Data, Range, Reader, Xlsx};
use chrono::{Days, NaiveDate, NaiveDateTime};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::io::Cursor;

/// One named grid of cells; row 0 is the header row
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn with_header<S: AsRef<str>>(name: impl Into<String>, header: &[S]) -> Self {
        let mut sheet = Self::new(name);
        sheet.push_row(
            header
                .iter()
                .map(|h| CellValue::Text(h.as_ref().to_string()))
                .collect(),
        );
        sheet
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    /// Header cells (empty slice for a sheet without rows)
    pub fn header(&self) -> &[CellValue] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Data rows below the header, numbered from 1
    pub fn data_rows(&self) -> impl Iterator<Item = RawRow> + '_ {
        self.rows
            .iter()
            .skip(1)
            .enumerate()
            .map(|(i, cells)| RawRow::new(i + 1, cells.clone()))
    }

    pub fn data_row_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }
}

/// Decode an .xlsx byte stream into its sheets, in workbook order
pub fn read_workbook(bytes: &[u8]) -> InterchangeResult<Vec<Sheet>> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| InterchangeError::Workbook(format!("Failed to open workbook: {}", e)))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name).map_err(|e| {
            InterchangeError::Workbook(format!("Failed to read sheet '{}': {}", name, e))
        })?;
        sheets.push(Sheet {
            rows: range_to_rows(&range),
            name,
        });
    }

    Ok(sheets)
}

fn range_to_rows(range: &Range<Data>) -> Vec<Vec<CellValue>> {
    if range.is_empty() {
        return Vec::new();
    }
    range
        .rows()
        .map(|row| row.iter().map(convert_cell).collect())
        .collect()
}

/// Convert a calamine cell to a codec-neutral cell
fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            match excel_serial_to_date(serial) {
                Some(date) if dt.is_datetime() => CellValue::Date(date),
                _ => CellValue::Number(serial),
            }
        }
        Data::DateTimeIso(s) => parse_iso_date(s)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
        #[allow(unreachable_patterns)]
        other => CellValue::Text(other.to_string()),
    }
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Excel serial day number (1900 date system) to a calendar date
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    // Serial 1 is 1900-01-01; the epoch is shifted to absorb Excel's
    // phantom 1900-02-29 for every serial after it.
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let days = serial.floor() as u64;
    let days = if days < 61 { days + 1 } else { days };
    epoch.checked_add_days(Days::new(days))
}

/// Encode sheets into an .xlsx byte stream
pub fn write_workbook(sheets: &[Sheet]) -> InterchangeResult<Vec<u8>> {
    let mut workbook = Workbook::new();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name).map_err(|e| {
            InterchangeError::Export(format!(
                "Failed to set worksheet name '{}': {}",
                sheet.name, e
            ))
        })?;

        for (row_idx, row) in sheet.rows.iter().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                write_cell(worksheet, row_idx as u32, col_idx as u16, cell)?;
            }
        }

        worksheet.autofit();
    }

    workbook
        .save_to_buffer()
        .map_err(|e| InterchangeError::Export(format!("Failed to encode workbook: {}", e)))
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &CellValue) -> InterchangeResult<()> {
    let result = match cell {
        CellValue::Empty => return Ok(()),
        CellValue::Text(s) => worksheet.write_string(row, col, s),
        CellValue::Number(n) => worksheet.write_number(row, col, *n),
        CellValue::Bool(b) => worksheet.write_boolean(row, col, *b),
        CellValue::Date(d) => worksheet.write_string(row, col, d.format("%Y-%m-%d").to_string()),
    };
    result
        .map(|_| ())
        .map_err(|e| InterchangeError::Export(format!("Failed to write cell ({}, {}): {}", row, col, e)))
}
