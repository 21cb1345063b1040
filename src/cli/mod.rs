pub mod compare;
pub mod import;
pub mod init;
pub mod products;
pub mod runs;
pub mod snapshots;
pub mod status;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::{open_data_dir, DB_FILE};
use crate::error::{InventoryError, Result};
use crate::settings::{load_settings, Settings};

/// Settings plus an open connection, or an error telling the user to run init.
pub(crate) fn open_db() -> Result<(Settings, Connection)> {
    let settings = load_settings();
    let data_dir = settings.data_path();
    if !data_dir.join(DB_FILE).exists() {
        return Err(InventoryError::Other(format!(
            "No database in {}. Run `inventario init` to set up.",
            data_dir.display()
        )));
    }
    let conn = open_data_dir(&data_dir)?;
    Ok((settings, conn))
}

#[derive(Parser)]
#[command(name = "inventario", about = "Weekly inventory snapshots from spreadsheet exports.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for inventory data (default: ~/Documents/inventario)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Import a weekly CSV/XLSX inventory export as a snapshot.
    Import {
        /// Path to the CSV or XLSX file
        file: String,
        /// Week date: YYYY-MM-DD (default: Monday of the current week)
        #[arg(long)]
        week: Option<String>,
        /// Parse and validate only; nothing is written
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// Inspect imported weekly snapshots.
    Snapshots {
        #[command(subcommand)]
        command: SnapshotsCommands,
    },
    /// Compare on-hand quantities of two weeks (A minus B).
    Compare {
        /// Week A: YYYY-MM-DD
        week_a: String,
        /// Week B: YYYY-MM-DD
        week_b: String,
        /// Rows shown per direction
        #[arg(long, default_value = "30")]
        limit: usize,
    },
    /// Browse products.
    Products {
        #[command(subcommand)]
        command: ProductsCommands,
    },
    /// Show recent import attempts.
    Runs {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum SnapshotsCommands {
    /// List all snapshots with their KPIs.
    List,
    /// Show one week's snapshot.
    Show {
        /// Week date: YYYY-MM-DD
        week: String,
        /// Rows shown in the highest and lowest stock tables
        #[arg(long, default_value = "20")]
        top: usize,
    },
}

#[derive(Subcommand)]
pub enum ProductsCommands {
    /// List products, optionally filtered by name or SKU.
    List {
        #[arg(long)]
        search: Option<String>,
    },
    /// Weekly stock history of one product.
    History {
        /// Product ID (shown in `inventario products list`)
        id: i64,
    },
}
