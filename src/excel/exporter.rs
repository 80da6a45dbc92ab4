//! Excel exporter implementation - store tables → .xlsx workbook

use super::codec::{self, Sheet};
use super::coercer::{header_row, render_record};
use crate::error::{InterchangeError, InterchangeResult};
use crate::registry::TableRegistry;
use crate::store::StoreReader;
use std::path::Path;
use tracing::{debug, info};

/// A validated, non-empty list of distinct table ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    tables: Vec<String>,
}

impl ExportRequest {
    /// Validate table ids against the registry before any store access
    pub fn new<I, S>(registry: &TableRegistry, tables: I) -> InterchangeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut validated: Vec<String> = Vec::new();
        for table in tables {
            let id = table.as_ref().trim();
            if !registry.contains(id) {
                return Err(InterchangeError::UnknownTable(id.to_string()));
            }
            if validated.iter().any(|t| t == id) {
                return Err(InterchangeError::DuplicateTable(id.to_string()));
            }
            validated.push(id.to_string());
        }

        if validated.is_empty() {
            return Err(InterchangeError::EmptyExport);
        }
        Ok(Self { tables: validated })
    }

    /// Request covering every registry table, in catalog order
    pub fn all(registry: &TableRegistry) -> InterchangeResult<Self> {
        Self::new(registry, registry.all_table_ids())
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }
}

/// Excel exporter: one sheet per requested table
pub struct ExcelExporter<'a> {
    registry: &'a TableRegistry,
    reader: &'a dyn StoreReader,
}

impl<'a> ExcelExporter<'a> {
    /// Create a new Excel exporter
    pub fn new(registry: &'a TableRegistry, reader: &'a dyn StoreReader) -> Self {
        Self { registry, reader }
    }

    /// Export the requested tables to .xlsx bytes
    ///
    /// Sheets follow the request order. Any store read failure aborts the
    /// whole export.
    pub fn export(&self, request: &ExportRequest) -> InterchangeResult<Vec<u8>> {
        let mut sheets = Vec::with_capacity(request.tables().len());

        for table_id in request.tables() {
            let schema = self.registry.lookup(table_id)?;
            let records = self.reader.fetch_all(schema)?;
            debug!(table = %table_id, rows = records.len(), "fetched table");

            let mut sheet = Sheet::new(schema.sheet_name.clone());
            sheet.push_row(header_row(schema));
            for record in &records {
                sheet.push_row(render_record(schema, record));
            }
            sheets.push(sheet);
        }

        let bytes = codec::write_workbook(&sheets)?;
        info!(
            tables = request.tables().len(),
            rows = sheets.iter().map(Sheet::data_row_count).sum::<usize>(),
            bytes = bytes.len(),
            "export complete"
        );
        Ok(bytes)
    }

    /// Validate raw table ids and export them
    pub fn export_tables<S: AsRef<str>>(&self, tables: &[S]) -> InterchangeResult<Vec<u8>> {
        let request = ExportRequest::new(self.registry, tables)?;
        self.export(&request)
    }

    /// Export the requested tables to an .xlsx file
    pub fn export_to_path(&self, request: &ExportRequest, output_path: &Path) -> InterchangeResult<()> {
        let bytes = self.export(request)?;
        std::fs::write(output_path, bytes)?;
        Ok(())
    }
}
