//! Sheetbridge API Server module
//!
//! Thin HTTP adapter over the exporter and importer.
//! Run with `sheetbridge-server`.

pub mod handlers;
pub mod server;

pub use server::{router, run_api_server, ApiConfig, AppState};
