//! Excel import/export module
//!
//! This module provides bidirectional store ↔ workbook conversion:
//! - Export: store tables → Excel (.xlsx), one sheet per table
//! - Import: Excel (.xlsx) → store tables, with a structured report

pub mod codec;
pub mod coercer;
mod exporter;
mod importer;
pub mod matcher;

pub use codec::Sheet;
pub use coercer::{HeaderMap, RowCoercer};
pub use exporter::{ExcelExporter, ExportRequest};
pub use importer::{ExcelImporter, ImportOptions};
pub use matcher::{SheetMatcher, SheetTarget, SkipReason};
