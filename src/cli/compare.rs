use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::error::Result;
use crate::fmt::qty;
use crate::reports::{biggest_moves, compare_weeks, CompareRow};

use super::open_db;

pub fn run(week_a: &str, week_b: &str, limit: usize) -> Result<()> {
    let (_, conn) = open_db()?;
    let cmp = compare_weeks(&conn, week_a, week_b)?;

    let changed: Vec<CompareRow> = cmp.rows.into_iter().filter(|r| r.delta != 0.0).collect();
    if changed.is_empty() {
        println!("No stock changes between {} and {}.", cmp.week_a, cmp.week_b);
        return Ok(());
    }

    let (down, up) = biggest_moves(&changed, limit);
    let down: Vec<&CompareRow> = down.into_iter().filter(|r| r.delta < 0.0).collect();
    let up: Vec<&CompareRow> = up.into_iter().filter(|r| r.delta > 0.0).collect();

    let heading = format!("{} vs {}", cmp.week_a, cmp.week_b);
    println!("{} ({} products changed)", heading.bold(), changed.len());
    println!("Biggest drops\n{}", delta_table(&cmp.week_a, &cmp.week_b, &down));
    println!("Biggest rises\n{}", delta_table(&cmp.week_a, &cmp.week_b, &up));
    Ok(())
}

fn delta_table(week_a: &str, week_b: &str, rows: &[&CompareRow]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "SKU", "Product", week_a, week_b, "Delta"]);
    for r in rows {
        let delta = if r.delta < 0.0 {
            qty(r.delta).red().to_string()
        } else {
            format!("+{}", qty(r.delta)).green().to_string()
        };
        table.add_row(vec![
            Cell::new(r.product_id),
            Cell::new(r.sku.as_deref().unwrap_or("")),
            Cell::new(&r.name),
            Cell::new(qty(r.qty_a)).set_alignment(CellAlignment::Right),
            Cell::new(qty(r.qty_b)).set_alignment(CellAlignment::Right),
            Cell::new(delta).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
