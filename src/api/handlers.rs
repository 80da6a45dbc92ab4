//! API request handlers
//!
//! Engine calls are blocking (workbook codec, SQLite), so every export and
//! import runs on the blocking pool.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::InterchangeError;
use crate::excel::{ExcelExporter, ExcelImporter};
use crate::types::{ImportReport, TableSchema};

use super::server::AppState;

pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// HTTP status for a call-level failure
pub fn status_for(error: &InterchangeError) -> StatusCode {
    match error {
        InterchangeError::UnknownTable(_)
        | InterchangeError::EmptyExport
        | InterchangeError::DuplicateTable(_)
        | InterchangeError::Workbook(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::err(message))).into_response()
}

fn fatal_response(error: InterchangeError) -> Response {
    let status = status_for(&error);
    warn!(error = %error, status = status.as_u16(), "request failed");
    error_response(status, error.to_string())
}

fn join_failure(error: tokio::task::JoinError) -> Response {
    warn!(error = %error, "engine task did not complete");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

impl EndpointInfo {
    fn new(method: &str, path: &str, description: &str) -> Self {
        Self {
            path: path.to_string(),
            method: method.to_string(),
            description: description.to_string(),
        }
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(RootResponse {
        name: "Sheetbridge API Server".to_string(),
        version: state.version.clone(),
        description: "Bulk Excel export/import for database tables".to_string(),
        endpoints: vec![
            EndpointInfo::new("GET", "/health", "Health check endpoint"),
            EndpointInfo::new("GET", "/version", "Get server version"),
            EndpointInfo::new("GET", "/api/v1/tables", "List known tables"),
            EndpointInfo::new("POST", "/api/v1/export", "Export tables to an .xlsx workbook"),
            EndpointInfo::new("POST", "/api/v1/import", "Import an .xlsx workbook (?table= to force one table)"),
        ],
    }))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub tables: usize,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        tables: state.registry.len(),
    }))
}

/// GET /api/v1/tables - Registry contents
pub async fn tables(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let schemas: Vec<TableSchema> = state.registry.schemas().to_vec();
    Json(ApiResponse::ok(schemas))
}

/// Export request
#[derive(Debug, Deserialize)]
pub struct ExportBody {
    pub tables: Vec<String>,
}

/// POST /api/v1/export - Tables to workbook bytes
pub async fn export(State(state): State<Arc<AppState>>, Json(req): Json<ExportBody>) -> Response {
    let tables = req.tables;
    let task = tokio::task::spawn_blocking(move || {
        ExcelExporter::new(&state.registry, state.store.as_ref()).export_tables(&tables)
    });

    match task.await {
        Ok(Ok(bytes)) => {
            info!(bytes = bytes.len(), "export served");
            (
                [
                    (header::CONTENT_TYPE, XLSX_CONTENT_TYPE),
                    (header::CONTENT_DISPOSITION, "attachment; filename=\"export.xlsx\""),
                ],
                bytes,
            )
                .into_response()
        }
        Ok(Err(e)) => fatal_response(e),
        Err(e) => join_failure(e),
    }
}

/// Import query string
#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    pub table: Option<String>,
}

/// POST /api/v1/import - Workbook bytes to rows
pub async fn import_excel(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ImportQuery>,
    body: Bytes,
) -> Response {
    let options = state.import_options;
    let task = tokio::task::spawn_blocking(move || -> Result<ImportReport, InterchangeError> {
        ExcelImporter::new(&state.registry, state.store.as_ref())
            .with_options(options)
            .import(&body, query.table.as_deref())
    });

    match task.await {
        Ok(Ok(report)) => Json(ApiResponse::ok(report)).into_response(),
        Ok(Err(e)) => fatal_response(e),
        Err(e) => join_failure(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_ok() {
        let response = ApiResponse::ok("payload");
        assert!(response.success);
        assert_eq!(response.data, Some("payload"));
        assert!(response.error.is_none());
        assert!(Uuid::parse_str(&response.request_id).is_ok());
    }

    #[test]
    fn test_api_response_err_serializes_without_data() {
        let response = ApiResponse::<()>::err("Unknown table: proveedores");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Unknown table: proveedores");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = ApiResponse::ok(1);
        let b = ApiResponse::ok(1);
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn test_status_for_client_errors() {
        assert_eq!(
            status_for(&InterchangeError::UnknownTable("x".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&InterchangeError::EmptyExport), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&InterchangeError::Workbook("zip".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_status_for_server_errors() {
        let io = InterchangeError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(status_for(&io), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            status_for(&InterchangeError::Export("encode".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_export_body_deserialize() {
        let body: ExportBody = serde_json::from_str(r#"{"tables": ["productos", "caja"]}"#).unwrap();
        assert_eq!(body.tables, vec!["productos", "caja"]);
    }

    #[test]
    fn test_import_query_table_is_optional() {
        let query: ImportQuery = serde_json::from_str("{}").unwrap();
        assert!(query.table.is_none());
    }
}
