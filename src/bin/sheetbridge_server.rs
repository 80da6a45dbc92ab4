//! Sheetbridge API Server binary
//!
//! HTTP front end for bulk Excel export and import.

use clap::Parser;
use sheetbridge::api::{run_api_server, server::DEFAULT_MAX_UPLOAD_BYTES, ApiConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sheetbridge-server")]
#[command(version)]
#[command(about = "Sheetbridge API Server - HTTP export/import of database tables as Excel workbooks")]
#[command(long_about = r#"
Sheetbridge API Server

Endpoints:
  - GET  /api/v1/tables    - Known tables and their columns
  - POST /api/v1/export    - {"tables": [...]} -> .xlsx workbook
  - POST /api/v1/import    - .xlsx body -> import report (?table=ID to force one table)

Additional endpoints:
  - GET  /health           - Health check
  - GET  /version          - Server version info
  - GET  /                 - API documentation

Example usage:
  sheetbridge-server                           # Start on localhost:8080
  sheetbridge-server --host 0.0.0.0 --port 3000 --db clinica.db

  curl -X POST http://localhost:8080/api/v1/export \
    -H "Content-Type: application/json" \
    -d '{"tables": ["productos", "caja"]}' -o backup.xlsx

  curl -X POST http://localhost:8080/api/v1/import \
    --data-binary @backup.xlsx
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "SHEETBRIDGE_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "SHEETBRIDGE_PORT")]
    port: u16,

    /// SQLite database file
    #[arg(long, default_value = "sheetbridge.db", env = "SHEETBRIDGE_DB")]
    db: PathBuf,

    /// YAML table catalog (defaults to the built-in tables)
    #[arg(long, env = "SHEETBRIDGE_REGISTRY")]
    registry: Option<PathBuf>,

    /// Largest accepted workbook upload, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "SHEETBRIDGE_MAX_UPLOAD")]
    max_upload: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ApiConfig {
        host: args.host,
        port: args.port,
        database: args.db,
        registry: args.registry,
        max_upload_bytes: args.max_upload,
    };

    run_api_server(config).await
}
