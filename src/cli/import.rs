use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::{money_opt, pct, qty};
use crate::importer::{current_week, import_file, preview_file, validate_week};
use crate::kpis::Kpis;
use crate::models::{AggregatedRow, ImportStats, ImportWarning};

use super::open_db;

pub fn run(file: &str, week: Option<&str>, dry_run: bool) -> Result<()> {
    let file_path = PathBuf::from(file);
    let week_date = match week {
        Some(w) => validate_week(w)?,
        None => current_week(),
    };

    if dry_run {
        let preview = preview_file(&file_path)?;
        println!(
            "Dry run of {} (sheet {}), nothing was saved.",
            file_path.display(),
            preview.sheet_name
        );
        print_stats(&preview.aggregation.stats);
        print_merged(&preview.aggregation.aggregated);
        print_warnings(&preview.warnings);
        return Ok(());
    }

    let (settings, mut conn) = open_db()?;
    let outcome = import_file(&mut conn, &file_path, &week_date, &settings)?;

    println!(
        "Week {}: {} products imported from sheet {} ({})",
        outcome.week_date, outcome.rows_imported, outcome.sheet_name, outcome.status
    );
    println!(
        "Snapshot #{} (import run #{}), archived to {}",
        outcome.snapshot_id,
        outcome.run_id,
        outcome.storage_path.display()
    );
    if let Some(other) = &outcome.same_file_as {
        println!("{}", format!("Same file was already imported for week {other}").yellow());
    }
    print_stats(&outcome.stats);
    print_kpis(&outcome.kpis);
    print_warnings(&outcome.warnings);
    Ok(())
}

fn print_stats(stats: &ImportStats) {
    let mut table = Table::new();
    table.set_header(vec!["Rows read", "Products", "Missing SKU", "Duplicate SKU", "Negative", "Zero price"]);
    table.add_row(vec![
        Cell::new(stats.rows_read),
        Cell::new(stats.rows_aggregated),
        Cell::new(stats.missing_sku_count),
        Cell::new(stats.duplicate_sku_count),
        Cell::new(stats.negative_stock_count),
        Cell::new(stats.zero_price_count),
    ]);
    println!("Stats\n{table}");
}

/// Products that absorbed more than one spreadsheet row.
fn print_merged(rows: &[AggregatedRow]) {
    let merged: Vec<&AggregatedRow> = rows.iter().filter(|a| a.source_count > 1).collect();
    if merged.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["SKU", "Product", "Rows", "On hand", "Available", "Price"]);
    for a in merged {
        table.add_row(vec![
            Cell::new(a.row.sku.as_deref().unwrap_or("")),
            Cell::new(&a.row.name),
            Cell::new(a.source_count),
            Cell::new(qty(a.row.qty_on_hand)),
            Cell::new(qty(a.row.qty_available)),
            Cell::new(money_opt(a.row.unit_price)),
        ]);
    }
    println!("Merged rows\n{table}");
}

pub(crate) fn print_kpis(kpis: &Kpis) {
    let mut table = Table::new();
    table.set_header(vec!["Products", "On hand", "Available", "Value", "Value coverage", "Zero qty", "Negative qty"]);
    table.add_row(vec![
        Cell::new(kpis.total_products),
        Cell::new(qty(kpis.total_on_hand)),
        Cell::new(qty(kpis.total_available)),
        Cell::new(money_opt(kpis.total_value)),
        Cell::new(pct(kpis.value_coverage)),
        Cell::new(kpis.zero_qty),
        Cell::new(kpis.negative_qty),
    ]);
    println!("KPIs\n{table}");
}

fn print_warnings(warnings: &[ImportWarning]) {
    if warnings.is_empty() {
        println!("{}", "No warnings.".green());
        return;
    }
    println!("Warnings:");
    for w in warnings {
        println!("  {} {}", format!("[{}]", w.code.as_str()).yellow(), w.message);
    }
}
