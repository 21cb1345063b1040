use crate::db::{get_connection, DB_FILE};
use crate::error::Result;
use crate::fmt::{format_bytes, money_opt};
use crate::reports::latest_snapshot;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = settings.data_path();
    let db_path = data_dir.join(DB_FILE);

    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());
    println!("Imports:    {}", settings.imports_dir().display());

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {}", format_bytes(size));

        let conn = get_connection(&db_path)?;

        let products: i64 = conn.query_row("SELECT count(*) FROM products", [], |r| r.get(0))?;
        let snapshots: i64 = conn.query_row("SELECT count(*) FROM inventory_snapshots", [], |r| r.get(0))?;
        let runs: i64 = conn.query_row("SELECT count(*) FROM import_runs", [], |r| r.get(0))?;
        let failed: i64 = conn.query_row(
            "SELECT count(*) FROM import_runs WHERE errors_count > 0",
            [],
            |r| r.get(0),
        )?;

        println!();
        println!("Products:      {products}");
        println!("Snapshots:     {snapshots}");
        println!("Import runs:   {runs} ({failed} failed)");
        if let Some(latest) = latest_snapshot(&conn)? {
            println!(
                "Latest week:   {} ({}, {})",
                latest.week_date,
                latest.status,
                money_opt(latest.total_value_on_hand)
            );
        }
    } else {
        println!();
        println!("Database not found. Run `inventario init` to set up.");
    }

    Ok(())
}
