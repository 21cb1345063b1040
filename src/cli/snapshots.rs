use comfy_table::{Cell, CellAlignment, Table};

use crate::error::Result;
use crate::fmt::{money_opt, pct, qty};
use crate::models::SnapshotLine;
use crate::reports::{get_snapshot, list_snapshots, top_and_bottom};

use super::import::print_kpis;
use super::open_db;

pub fn list() -> Result<()> {
    let (_, conn) = open_db()?;
    let summaries = list_snapshots(&conn)?;
    if summaries.is_empty() {
        println!("No snapshots yet. Import a spreadsheet with `inventario import`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Week", "Status", "Products", "On hand", "Available", "Value", "Coverage", "Zero", "Negative",
    ]);
    for s in summaries {
        table.add_row(vec![
            Cell::new(&s.snapshot.week_date),
            Cell::new(&s.snapshot.status),
            Cell::new(s.snapshot.total_products),
            Cell::new(qty(s.snapshot.total_qty_on_hand)).set_alignment(CellAlignment::Right),
            Cell::new(qty(s.snapshot.total_qty_available)).set_alignment(CellAlignment::Right),
            Cell::new(money_opt(s.snapshot.total_value_on_hand)).set_alignment(CellAlignment::Right),
            Cell::new(pct(s.kpis.value_coverage)),
            Cell::new(s.kpis.zero_qty),
            Cell::new(s.kpis.negative_qty),
        ]);
    }
    println!("Snapshots\n{table}");
    Ok(())
}

pub fn show(week: &str, top: usize) -> Result<()> {
    let (_, conn) = open_db()?;
    let detail = get_snapshot(&conn, week)?;

    println!(
        "Week {}  imported {}  ({})",
        detail.snapshot.week_date, detail.snapshot.imported_at, detail.snapshot.status
    );
    print_kpis(&detail.kpis);

    let (highest, lowest) = top_and_bottom(&detail.lines, top);
    println!("Highest stock\n{}", lines_table(&highest));
    println!("Lowest stock\n{}", lines_table(&lowest));
    Ok(())
}

fn lines_table(lines: &[&SnapshotLine]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "SKU", "Product", "On hand", "Available", "Price", "Value"]);
    for l in lines {
        table.add_row(vec![
            Cell::new(l.product_id),
            Cell::new(l.sku_raw.as_deref().unwrap_or("")),
            Cell::new(&l.name),
            Cell::new(qty(l.qty_on_hand)).set_alignment(CellAlignment::Right),
            Cell::new(qty(l.qty_available)).set_alignment(CellAlignment::Right),
            Cell::new(money_opt(l.unit_price)).set_alignment(CellAlignment::Right),
            Cell::new(money_opt(l.value_on_hand)).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
