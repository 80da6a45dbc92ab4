//! Sheetbridge API Server implementation
//!
//! HTTP adapter using Axum. The engine knows nothing about HTTP; this
//! module only wires requests to the exporter and importer.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::handlers;
use crate::cli::{load_registry, open_store};
use crate::excel::ImportOptions;
use crate::registry::TableRegistry;
use crate::store::SqliteStore;

/// Default maximum accepted workbook size (20 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// API Server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub database: PathBuf,
    /// YAML catalog; `None` uses the built-in tables
    pub registry: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database: PathBuf::from("sheetbridge.db"),
            registry: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub version: String,
    pub registry: Arc<TableRegistry>,
    pub store: Arc<SqliteStore>,
    pub import_options: ImportOptions,
}

impl AppState {
    pub fn new(registry: TableRegistry, store: SqliteStore) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            registry: Arc::new(registry),
            store: Arc::new(store),
            import_options: ImportOptions::default(),
        }
    }
}

/// Build the router with all endpoints and middleware
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        .route("/api/v1/tables", get(handlers::tables))
        .route("/api/v1/export", post(handlers::export))
        .route("/api/v1/import", post(handlers::import_excel))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the API server
pub async fn run_api_server(config: ApiConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheetbridge=info,tower_http=info".into()),
        )
        .init();

    let registry = load_registry(config.registry.as_deref())?;
    let store = open_store(&config.database, &registry)?;
    info!(
        tables = registry.len(),
        database = %config.database.display(),
        "store ready"
    );

    let state = Arc::new(AppState::new(registry, store));
    let app = router(state, config.max_upload_bytes);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("📊 Sheetbridge API Server starting on http://{}", addr);
    info!("   Endpoints: /api/v1/tables, /api/v1/export, /api/v1/import");
    info!("   Health: /health, Version: /version");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Sheetbridge API Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server...");
}
