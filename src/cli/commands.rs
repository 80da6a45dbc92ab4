use crate::error::InterchangeResult;
use crate::excel::{ExcelExporter, ExcelImporter, ExportRequest, ImportOptions};
use crate::registry::TableRegistry;
use crate::store::SqliteStore;
use crate::types::{ImportReport, ImportStatus, TableImportResult};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Load the registry from a YAML catalog, or the built-in one
pub fn load_registry(catalog: Option<&Path>) -> InterchangeResult<TableRegistry> {
    match catalog {
        Some(path) => TableRegistry::from_path(path),
        None => Ok(TableRegistry::builtin()),
    }
}

/// Open the SQLite store and create any missing registry tables
pub fn open_store(database: &Path, registry: &TableRegistry) -> InterchangeResult<SqliteStore> {
    let store = SqliteStore::open(database)?;
    store.ensure_schema(registry)?;
    Ok(store)
}

/// Execute the tables command
pub fn tables(registry: &TableRegistry) -> InterchangeResult<()> {
    println!("{}", "📚 Sheetbridge - Known tables".bold().green());
    println!();

    for schema in registry.schemas() {
        println!(
            "   📊 {} (sheet: {})",
            schema.id.bright_blue().bold(),
            schema.sheet_name.cyan()
        );
        if !schema.aliases.is_empty() {
            println!("      aliases: {}", schema.aliases.join(", "));
        }
        for column in &schema.columns {
            let marker = if column.name == schema.primary_key {
                " 🔑"
            } else if column.required {
                " *"
            } else {
                ""
            };
            println!("      {} {}{}", column.name, column.column_type.to_string().dimmed(), marker);
        }
    }
    println!();
    Ok(())
}

/// Execute the export command
pub fn export(
    registry: &TableRegistry,
    database: PathBuf,
    tables: Vec<String>,
    all: bool,
    output: PathBuf,
    verbose: bool,
) -> InterchangeResult<()> {
    println!("{}", "🔥 Sheetbridge - Excel Export".bold().green());
    println!("   Database: {}", database.display());
    println!("   Output:   {}\n", output.display());

    let request = if all {
        ExportRequest::all(registry)?
    } else {
        ExportRequest::new(registry, &tables)?
    };

    if verbose {
        println!("{}", "📖 Reading tables...".cyan());
        for table in request.tables() {
            println!("   📊 {}", table.bright_blue());
        }
        println!();
    }

    let store = SqliteStore::open_read_only(&database)?;
    ExcelExporter::new(registry, &store).export_to_path(&request, &output)?;

    println!("{}", "✅ Export Complete!".bold().green());
    println!("   {} sheet(s) written to {}\n", request.tables().len(), output.display());
    Ok(())
}

/// Execute the import command
pub fn import(
    registry: &TableRegistry,
    database: PathBuf,
    input: PathBuf,
    table: Option<String>,
    json: bool,
    sequential: bool,
    verbose: bool,
) -> InterchangeResult<()> {
    if !json {
        println!("{}", "🔥 Sheetbridge - Excel Import".bold().green());
        println!("   Input:    {}", input.display());
        println!("   Database: {}", database.display());
        match &table {
            Some(t) => println!("   Table:    {}\n", t.bright_yellow().bold()),
            None => println!("   Table:    {}\n", "auto-detect".dimmed()),
        }
    }

    let store = open_store(&database, registry)?;
    let importer = ExcelImporter::new(registry, &store).with_options(ImportOptions {
        parallel: !sequential,
    });
    let report = importer.import_path(&input, table.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, verbose);
    }
    Ok(())
}

fn print_report(report: &ImportReport, verbose: bool) {
    for result in &report.tables {
        print_table_result(result, verbose);
    }

    for sheet in &report.unmatched_sheets {
        println!("   {} Sheet '{}' skipped: no matching table", "⚠️".yellow(), sheet.yellow());
    }
    println!();

    let summary = format!(
        "{} attempted, {} inserted, {} failed",
        report.attempted, report.inserted, report.failed
    );
    match report.status() {
        ImportStatus::Complete => println!("{} {}", "✅ Import Complete!".bold().green(), summary),
        ImportStatus::Partial => println!("{} {}", "⚠️  Partial Import:".bold().yellow(), summary),
        ImportStatus::Nothing => println!("{} {}", "❌ Nothing Imported:".bold().red(), summary),
    }
    println!();
}

fn print_table_result(result: &TableImportResult, verbose: bool) {
    println!(
        "   📊 {} ← sheet '{}': {}/{} inserted",
        result.table.bright_blue().bold(),
        result.sheet,
        result.inserted,
        result.attempted
    );

    if let Some(error) = &result.sheet_error {
        println!("      {} {}", "❌".red(), error.reason.red());
    }

    const PREVIEW: usize = 5;
    let shown = if verbose { result.errors.len() } else { PREVIEW };
    for error in result.errors.iter().take(shown) {
        println!("      {} {}", "•".red(), error);
    }
    if result.errors.len() > shown {
        println!("      … {} more (use --verbose)", result.errors.len() - shown);
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
