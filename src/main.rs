use clap::{Parser, Subcommand};
use sheetbridge::cli;
use sheetbridge::error::InterchangeResult;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sheetbridge")]
#[command(about = "Bulk spreadsheet export/import for the clinic database")]
#[command(long_about = "Sheetbridge - Bulk Excel (.xlsx) interchange for database tables

Every known table maps to one worksheet. Export writes one sheet per table;
import reads every sheet, works out which table it belongs to, checks and
converts each row, and inserts what it can. Bad rows never stop the rest.

COMMANDS:
  tables   - List the known tables and their columns
  export   - Tables to Excel (.xlsx)
  import   - Excel (.xlsx) to tables, with a per-row report

EXAMPLES:
  sheetbridge tables
  sheetbridge export -t productos,caja -o inventario.xlsx
  sheetbridge export --all -o respaldo.xlsx
  sheetbridge import respaldo.xlsx
  sheetbridge import hoja.xlsx --table productos --json")]
#[command(version)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, default_value = "sheetbridge.db", env = "SHEETBRIDGE_DB")]
    db: PathBuf,

    /// YAML table catalog (defaults to the built-in tables)
    #[arg(long, global = true, env = "SHEETBRIDGE_REGISTRY")]
    registry: Option<PathBuf>,

    /// Show verbose steps and every row error
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the known tables and their columns
    Tables,

    #[command(long_about = "Export database tables to an Excel .xlsx workbook.

Each table becomes one worksheet, named after the table's sheet name, in
the order given. The first row holds the column names; every stored row
follows in primary key order. Empty tables still get a header row.

Unknown or repeated table names abort before anything is read.

EXAMPLES:
  sheetbridge export -t productos -o productos.xlsx
  sheetbridge export -t usuarios,caja -o out.xlsx
  sheetbridge export --all -o respaldo.xlsx")]
    /// Export tables to Excel .xlsx
    Export {
        /// Tables to export, comma separated
        #[arg(short, long, value_delimiter = ',', required_unless_present = "all")]
        tables: Vec<String>,

        /// Export every known table
        #[arg(long, conflicts_with = "tables")]
        all: bool,

        /// Output Excel file path (.xlsx)
        #[arg(short, long)]
        output: PathBuf,
    },

    #[command(long_about = "Import an Excel .xlsx workbook into database tables.

Without --table every sheet is matched to a table by its name (exact,
then ignoring case, accents, spacing and plurals). Sheets that match
nothing are listed and skipped. With --table every sheet goes to that
table.

Rows failing a required or type check are reported and skipped; the
rest are inserted. Duplicate keys are rejected one row at a time.

EXAMPLES:
  sheetbridge import respaldo.xlsx
  sheetbridge import lista.xlsx --table pacientes
  sheetbridge import respaldo.xlsx --json > report.json")]
    /// Import Excel .xlsx into tables
    Import {
        /// Path to Excel file (.xlsx)
        input: PathBuf,

        /// Send every sheet to this table
        #[arg(short, long)]
        table: Option<String>,

        /// Print the import report as JSON
        #[arg(long)]
        json: bool,

        /// Process sheets one at a time
        #[arg(long)]
        sequential: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "sheetbridge=debug" } else { "sheetbridge=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> InterchangeResult<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let registry = cli::load_registry(cli.registry.as_deref())?;

    match cli.command {
        Commands::Tables => cli::tables(&registry),

        Commands::Export {
            tables,
            all,
            output,
        } => cli::export(&registry, cli.db, tables, all, output, cli.verbose),

        Commands::Import {
            input,
            table,
            json,
            sequential,
        } => cli::import(&registry, cli.db, input, table, json, sequential, cli.verbose),
    }
}
