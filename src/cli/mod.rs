//! CLI command handlers

pub mod commands;

pub use commands::{export, import, load_registry, open_store, tables};
