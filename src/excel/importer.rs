//! Excel importer implementation - .xlsx workbook → store tables
//!
//! Each sheet moves through `Pending → HeaderValidated → RowsCoerced →
//! Written → Reported`. An unmatched sheet never leaves `Pending` (it is
//! listed in the report instead) and a header failure jumps straight to
//! `Reported` with nothing inserted.
//!
//! Sheets resolving to the same table form one group and are written one
//! after another; distinct groups may run on scoped threads.

use super::codec::{self, Sheet};
use super::coercer::{HeaderMap, RowCoercer};
use super::matcher::{SheetMatcher, SheetTarget, SkipReason};
use crate::error::InterchangeResult;
use crate::registry::TableRegistry;
use crate::report;
use crate::store::StoreWriter;
use crate::types::{ImportReport, RowError, RowErrorKind, TableImportResult, TableSchema, TypedRow};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, info_span, warn};

/// Importer tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Process sheets of different tables concurrently
    pub parallel: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// Sheets bound for one table, with their workbook positions
struct TableGroup<'r> {
    schema: &'r TableSchema,
    sheets: Vec<(usize, Sheet)>,
}

/// Excel importer: workbook sheets → store rows + [`ImportReport`]
pub struct ExcelImporter<'a> {
    registry: &'a TableRegistry,
    writer: &'a dyn StoreWriter,
    options: ImportOptions,
}

impl<'a> ExcelImporter<'a> {
    /// Create a new Excel importer
    pub fn new(registry: &'a TableRegistry, writer: &'a dyn StoreWriter) -> Self {
        Self {
            registry,
            writer,
            options: ImportOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    /// Import a workbook
    ///
    /// With `explicit_table` every sheet goes to that table; without it each
    /// sheet name is resolved against the registry. Only an unknown
    /// explicit table or an undecodable workbook fail the call.
    pub fn import(&self, bytes: &[u8], explicit_table: Option<&str>) -> InterchangeResult<ImportReport> {
        let matcher = SheetMatcher::new(self.registry, explicit_table)?;
        let sheets = codec::read_workbook(bytes)?;
        info!(
            sheets = sheets.len(),
            table = explicit_table.unwrap_or("<auto>"),
            "decoded workbook"
        );

        let mut groups: Vec<TableGroup<'_>> = Vec::new();
        let mut unmatched = Vec::new();

        for (position, sheet) in sheets.into_iter().enumerate() {
            match matcher.resolve(&sheet.name) {
                SheetTarget::Table(table_id) => {
                    let schema = self.registry.lookup(&table_id)?;
                    match groups.iter_mut().find(|g| g.schema.id == table_id) {
                        Some(group) => group.sheets.push((position, sheet)),
                        None => groups.push(TableGroup {
                            schema,
                            sheets: vec![(position, sheet)],
                        }),
                    }
                }
                SheetTarget::Skip(reason) => {
                    match &reason {
                        SkipReason::NotFound => {
                            warn!(sheet = %sheet.name, "sheet does not match any table")
                        }
                        SkipReason::Ambiguous(candidates) => warn!(
                            sheet = %sheet.name,
                            candidates = %candidates.join(", "),
                            "sheet name is ambiguous"
                        ),
                    }
                    unmatched.push(sheet.name);
                }
            }
        }

        let mut results = self.run_groups(&groups);
        results.sort_by_key(|(position, _)| *position);

        let report = report::aggregate(results.into_iter().map(|(_, r)| r).collect(), unmatched);
        info!(
            attempted = report.attempted,
            inserted = report.inserted,
            failed = report.failed,
            unmatched = report.unmatched_sheets.len(),
            "import complete"
        );
        Ok(report)
    }

    /// Import a workbook file
    pub fn import_path<P: AsRef<Path>>(&self, path: P, explicit_table: Option<&str>) -> InterchangeResult<ImportReport> {
        let bytes = std::fs::read(path)?;
        self.import(&bytes, explicit_table)
    }

    fn run_groups(&self, groups: &[TableGroup<'_>]) -> Vec<(usize, TableImportResult)> {
        if !self.options.parallel || groups.len() < 2 {
            return groups.iter().flat_map(|group| self.import_group(group)).collect();
        }

        std::thread::scope(|scope| {
            let handles: Vec<_> = groups
                .iter()
                .map(|group| scope.spawn(move || self.import_group(group)))
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        })
    }

    /// Sheets of one table, strictly in workbook order
    fn import_group(&self, group: &TableGroup<'_>) -> Vec<(usize, TableImportResult)> {
        group
            .sheets
            .iter()
            .map(|(position, sheet)| (*position, self.import_sheet(group.schema, sheet)))
            .collect()
    }

    fn import_sheet(&self, schema: &TableSchema, sheet: &Sheet) -> TableImportResult {
        let span = info_span!("sheet", sheet = %sheet.name, table = %schema.id);
        let _guard = span.enter();
        let mut result = TableImportResult::new(schema.id.clone(), sheet.name.clone());

        let header = match HeaderMap::build(schema, sheet.header()) {
            Ok(header) => header,
            Err(missing) => {
                warn!(missing = %missing.join(", "), "required columns missing from header");
                result.sheet_error = Some(RowError {
                    table: schema.id.clone(),
                    sheet: sheet.name.clone(),
                    row: 0,
                    column: missing.first().cloned(),
                    key: None,
                    kind: RowErrorKind::MissingColumn,
                    reason: format!("missing required column(s): {}", missing.join(", ")),
                });
                return result;
            }
        };

        let coercer = RowCoercer::new(schema, sheet.name.clone(), header);
        let mut batch: Vec<TypedRow> = Vec::new();
        let mut errors: Vec<RowError> = Vec::new();

        for raw in sheet.data_rows() {
            if raw.is_blank() {
                continue;
            }
            result.attempted += 1;
            match coercer.coerce(&raw) {
                Ok(typed) => batch.push(typed),
                Err(error) => errors.push(error),
            }
        }
        debug!(
            attempted = result.attempted,
            coerced = batch.len(),
            invalid = errors.len(),
            "rows coerced"
        );

        if !batch.is_empty() {
            let (inserted, rejected) = self.write_batch(schema, sheet, &batch);
            result.inserted = inserted;
            errors.extend(rejected);
        }

        errors.sort_by_key(|e| e.row);
        result.errors = errors;
        result
    }

    /// Hand a batch to the store; every row ends up inserted or rejected
    fn write_batch(&self, schema: &TableSchema, sheet: &Sheet, batch: &[TypedRow]) -> (usize, Vec<RowError>) {
        let rejection = |row: &TypedRow, reason: String| RowError {
            table: schema.id.clone(),
            sheet: sheet.name.clone(),
            row: row.index,
            column: None,
            key: row.get(&schema.primary_key).and_then(|v| v.key_text()),
            kind: RowErrorKind::Rejected,
            reason,
        };

        match self.writer.insert_batch(schema, batch) {
            Ok(outcome) => {
                let mut seen = HashSet::new();
                let rejected: Vec<RowError> = outcome
                    .rejected
                    .into_iter()
                    .filter_map(|r| {
                        let row = batch.iter().find(|row| row.index == r.index)?;
                        seen.insert(r.index).then(|| rejection(row, r.reason))
                    })
                    .collect();
                let inserted = batch.len() - rejected.len();
                if inserted != outcome.inserted {
                    warn!(
                        reported = outcome.inserted,
                        derived = inserted,
                        "store insert count disagrees with its rejections"
                    );
                }
                if !rejected.is_empty() {
                    warn!(rejected = rejected.len(), "store rejected rows");
                }
                (inserted, rejected)
            }
            Err(e) => {
                warn!(error = %e, rows = batch.len(), "batch insert failed");
                let reason = e.to_string();
                (0, batch.iter().map(|row| rejection(row, reason.clone())).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::CellValue;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_import_sheet_header_failure_short_circuits() {
        let registry = TableRegistry::builtin();
        let store = MemoryStore::for_registry(&registry);
        let importer = ExcelImporter::new(&registry, &store);

        let mut sheet = Sheet::with_header("Productos", &["nombre"]);
        sheet.push_row(vec![text("Alimento X")]);

        let result = importer.import_sheet(registry.lookup("productos").unwrap(), &sheet);
        assert_eq!(result.attempted, 0);
        assert_eq!(result.inserted, 0);
        assert!(result.errors.is_empty());
        let error = result.sheet_error.unwrap();
        assert_eq!(error.row, 0);
        assert_eq!(error.kind, RowErrorKind::MissingColumn);
        assert!(error.reason.contains("precio_costo"));
        assert!(error.reason.contains("stock"));
        assert_eq!(store.count("productos"), 0);
    }

    #[test]
    fn test_import_sheet_skips_blank_rows() {
        let registry = TableRegistry::builtin();
        let store = MemoryStore::for_registry(&registry);
        let importer = ExcelImporter::new(&registry, &store);

        let mut sheet = Sheet::with_header("Productos", &["nombre", "precio_costo", "stock"]);
        sheet.push_row(vec![text("A"), text("1"), text("1")]);
        sheet.push_row(vec![CellValue::Empty, text(" "), CellValue::Empty]);
        sheet.push_row(vec![text("B"), text("2"), text("2")]);

        let result = importer.import_sheet(registry.lookup("productos").unwrap(), &sheet);
        assert_eq!(result.attempted, 2);
        assert_eq!(result.inserted, 2);
    }

    #[test]
    fn test_whole_batch_failure_becomes_row_errors() {
        let registry = TableRegistry::builtin();
        let store = MemoryStore::for_registry(&registry);
        store.drop_table("caja");
        let importer = ExcelImporter::new(&registry, &store);

        let mut sheet = Sheet::with_header("Caja", &["fecha", "concepto", "tipo", "monto"]);
        sheet.push_row(vec![text("2024-01-02"), text("Venta"), text("ingreso"), text("50")]);
        sheet.push_row(vec![text("2024-01-03"), text("Luz"), text("egreso"), text("x")]);

        let result = importer.import_sheet(registry.lookup("caja").unwrap(), &sheet);
        assert_eq!(result.attempted, 2);
        assert_eq!(result.inserted, 0);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].kind, RowErrorKind::Rejected);
        assert_eq!(result.errors[1].kind, RowErrorKind::InvalidValue);
    }
}
