use thiserror::Error;

use crate::store::StoreError;

pub type InterchangeResult<T> = Result<T, InterchangeError>;

/// Errors that abort a whole export or import call.
///
/// Sheet- and row-scoped failures never show up here; they are collected
/// into the [`ImportReport`](crate::types::ImportReport) instead.
#[derive(Error, Debug)]
pub enum InterchangeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid table catalog: {0}")]
    Registry(String),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Export request must name at least one table")]
    EmptyExport,

    #[error("Table requested more than once: {0}")]
    DuplicateTable(String),

    #[error("Invalid workbook: {0}")]
    Workbook(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
