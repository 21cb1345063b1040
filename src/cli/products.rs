use comfy_table::{Cell, CellAlignment, Table};

use crate::error::Result;
use crate::fmt::{money_opt, qty};
use crate::reports::{get_product, product_history, search_products};

use super::open_db;

pub fn list(search: Option<&str>) -> Result<()> {
    let (_, conn) = open_db()?;
    let products = search_products(&conn, search)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "SKU", "Name", "Unit", "Location"]);
    for p in products {
        table.add_row(vec![
            Cell::new(p.id),
            Cell::new(p.sku.unwrap_or_default()),
            Cell::new(p.name),
            Cell::new(p.unit.unwrap_or_default()),
            Cell::new(p.location.unwrap_or_default()),
        ]);
    }
    println!("Products\n{table}");
    Ok(())
}

pub fn history(id: i64) -> Result<()> {
    let (_, conn) = open_db()?;
    let product = get_product(&conn, id)?;
    let points = product_history(&conn, id)?;

    let mut table = Table::new();
    table.set_header(vec!["Week", "On hand", "Available", "Price"]);
    for p in points {
        table.add_row(vec![
            Cell::new(p.week_date),
            Cell::new(qty(p.qty_on_hand)).set_alignment(CellAlignment::Right),
            Cell::new(qty(p.qty_available)).set_alignment(CellAlignment::Right),
            Cell::new(money_opt(p.unit_price)).set_alignment(CellAlignment::Right),
        ]);
    }
    let sku = product.sku.map(|s| format!(" [{s}]")).unwrap_or_default();
    println!("{}{sku}\n{table}", product.name);
    Ok(())
}
