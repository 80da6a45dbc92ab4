//! Import report aggregation

use crate::types::{ImportReport, TableImportResult};

/// Merge per-sheet results into one report
///
/// Purely additive: counts are summed, errors concatenated in result order
/// (each sheet's header failure before its row errors) and unmatched sheet
/// names copied through.
pub fn aggregate(results: Vec<TableImportResult>, unmatched_sheets: Vec<String>) -> ImportReport {
    let mut report = ImportReport {
        unmatched_sheets,
        ..Default::default()
    };

    for result in results {
        report.attempted += result.attempted;
        report.inserted += result.inserted;
        report.failed += result.failed();
        report.errors.extend(result.sheet_error.iter().cloned());
        report.errors.extend(result.errors.iter().cloned());
        report.tables.push(result);
    }

    report
}
