use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::reports::recent_runs;

use super::open_db;

pub fn run(limit: usize) -> Result<()> {
    let (_, conn) = open_db()?;
    let runs = recent_runs(&conn, limit)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Started", "Finished", "Week", "Rows read", "Imported", "Warnings", "Error"]);
    for r in runs {
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(r.started_at),
            Cell::new(r.finished_at.unwrap_or_else(|| "running".to_string())),
            Cell::new(r.week_date.unwrap_or_default()),
            Cell::new(r.rows_read.map(|n| n.to_string()).unwrap_or_default()),
            Cell::new(r.rows_imported.map(|n| n.to_string()).unwrap_or_default()),
            Cell::new(r.warnings.len()),
            Cell::new(
                r.errors
                    .first()
                    .map(|e| format!("{}: {}", e.code, e.message))
                    .unwrap_or_default(),
            ),
        ]);
    }
    println!("Import runs\n{table}");
    Ok(())
}
