//! Sheetbridge - spreadsheet backup and restore for record-management stores
//!
//! This library exports an arbitrary subset of the application's tables to
//! an Excel workbook and imports workbooks back, validating every cell
//! against a static table registry.
//!
//! # Features
//!
//! - Table registry with built-in catalog or YAML catalog file
//! - Sheet → table detection (exact, normalized, or explicit override)
//! - Typed coercion of untyped cells (text, integer, decimal, boolean, date)
//! - Per-table transactional writes with row-level failure reporting
//! - Structured [`ImportReport`] for partial and full imports
//!
//! # Example
//!
//! ```no_run
//! use sheetbridge::excel::{ExcelExporter, ExcelImporter, ExportRequest};
//! use sheetbridge::registry::TableRegistry;
//! use sheetbridge::store::SqliteStore;
//!
//! let registry = TableRegistry::builtin();
//! let store = SqliteStore::open("clinica.db")?;
//! store.ensure_schema(&registry)?;
//!
//! let request = ExportRequest::new(&registry, ["productos", "usuarios"])?;
//! let bytes = ExcelExporter::new(&registry, &store).export(&request)?;
//!
//! let report = ExcelImporter::new(&registry, &store).import(&bytes, None)?;
//! println!("Inserted {} of {} rows", report.inserted, report.attempted);
//! # Ok::<(), sheetbridge::error::InterchangeError>(())
//! ```

pub mod api;
pub mod cli;
pub mod error;
pub mod excel;
pub mod registry;
pub mod report;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{InterchangeError, InterchangeResult};
pub use types::{ImportReport, ImportStatus, RowError, TableImportResult, TableSchema};
