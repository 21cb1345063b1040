use std::collections::BTreeMap;

use rusqlite::{Connection, OptionalExtension};

use crate::error::{InventoryError, Result};
use crate::kpis::{compute_kpis, Kpis};
use crate::models::{ImportError, ImportWarning, Product, Snapshot, SnapshotLine};

pub const PRODUCT_SEARCH_LIMIT: usize = 200;
pub const HISTORY_WEEKS: usize = 52;

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

const SNAPSHOT_COLUMNS: &str = "id, week_date, imported_at, status, total_products, \
     total_qty_on_hand, total_qty_available, total_value_on_hand";

fn snapshot_from_row(row: &rusqlite::Row) -> rusqlite::Result<Snapshot> {
    Ok(Snapshot {
        id: row.get(0)?,
        week_date: row.get(1)?,
        imported_at: row.get(2)?,
        status: row.get(3)?,
        total_products: row.get(4)?,
        total_qty_on_hand: row.get(5)?,
        total_qty_available: row.get(6)?,
        total_value_on_hand: row.get(7)?,
    })
}

pub struct SnapshotSummary {
    pub snapshot: Snapshot,
    pub kpis: Kpis,
}

/// All snapshots, newest week first, each with its line KPIs.
pub fn list_snapshots(conn: &Connection) -> Result<Vec<SnapshotSummary>> {
    let sql = format!("SELECT {SNAPSHOT_COLUMNS} FROM inventory_snapshots ORDER BY week_date DESC");
    let mut stmt = conn.prepare(&sql)?;
    let snapshots = stmt
        .query_map([], snapshot_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    snapshots
        .into_iter()
        .map(|snapshot| {
            let lines = snapshot_lines(conn, snapshot.id)?;
            Ok(SnapshotSummary {
                kpis: compute_kpis(&lines),
                snapshot,
            })
        })
        .collect()
}

pub fn find_snapshot(conn: &Connection, week_date: &str) -> Result<Option<Snapshot>> {
    let sql = format!("SELECT {SNAPSHOT_COLUMNS} FROM inventory_snapshots WHERE week_date = ?1");
    Ok(conn.query_row(&sql, [week_date], snapshot_from_row).optional()?)
}

pub fn latest_snapshot(conn: &Connection) -> Result<Option<Snapshot>> {
    let sql = format!("SELECT {SNAPSHOT_COLUMNS} FROM inventory_snapshots ORDER BY week_date DESC LIMIT 1");
    Ok(conn.query_row(&sql, [], snapshot_from_row).optional()?)
}

pub fn snapshot_lines(conn: &Connection, snapshot_id: i64) -> Result<Vec<SnapshotLine>> {
    let mut stmt = conn.prepare_cached(
        "SELECT l.product_id, p.name, l.sku_raw, l.unit_price, l.qty_on_hand, l.qty_available, l.value_on_hand \
         FROM inventory_snapshot_lines l JOIN products p ON p.id = l.product_id \
         WHERE l.snapshot_id = ?1 ORDER BY p.name",
    )?;
    let rows = stmt.query_map([snapshot_id], |row| {
        Ok(SnapshotLine {
            product_id: row.get(0)?,
            name: row.get(1)?,
            sku_raw: row.get(2)?,
            unit_price: row.get(3)?,
            qty_on_hand: row.get(4)?,
            qty_available: row.get(5)?,
            value_on_hand: row.get(6)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub struct SnapshotDetail {
    pub snapshot: Snapshot,
    pub lines: Vec<SnapshotLine>,
    pub kpis: Kpis,
}

pub fn get_snapshot(conn: &Connection, week_date: &str) -> Result<SnapshotDetail> {
    let snapshot = find_snapshot(conn, week_date)?
        .ok_or_else(|| InventoryError::SnapshotNotFound(week_date.to_string()))?;
    let lines = snapshot_lines(conn, snapshot.id)?;
    let kpis = compute_kpis(&lines);
    Ok(SnapshotDetail {
        snapshot,
        lines,
        kpis,
    })
}

/// The `n` lines with the most and the fewest units on hand.
pub fn top_and_bottom(lines: &[SnapshotLine], n: usize) -> (Vec<&SnapshotLine>, Vec<&SnapshotLine>) {
    let mut sorted: Vec<&SnapshotLine> = lines.iter().collect();
    sorted.sort_by(|a, b| b.qty_on_hand.total_cmp(&a.qty_on_hand));
    let top = sorted.iter().take(n).copied().collect();
    let bottom = sorted.iter().rev().take(n).copied().collect();
    (top, bottom)
}

// ---------------------------------------------------------------------------
// Week comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CompareRow {
    pub product_id: i64,
    pub sku: Option<String>,
    pub name: String,
    pub qty_a: f64,
    pub qty_b: f64,
    /// `qty_a - qty_b`
    pub delta: f64,
}

pub struct Comparison {
    pub week_a: String,
    pub week_b: String,
    pub rows: Vec<CompareRow>,
}

/// Per-product on-hand quantities of two weeks. Products present in only one
/// week count as 0 in the other.
pub fn compare_weeks(conn: &Connection, week_a: &str, week_b: &str) -> Result<Comparison> {
    let a = find_snapshot(conn, week_a)?
        .ok_or_else(|| InventoryError::SnapshotNotFound(week_a.to_string()))?;
    let b = find_snapshot(conn, week_b)?
        .ok_or_else(|| InventoryError::SnapshotNotFound(week_b.to_string()))?;
    let lines_a = snapshot_lines(conn, a.id)?;
    let lines_b = snapshot_lines(conn, b.id)?;

    let mut by_product: BTreeMap<i64, (Option<&SnapshotLine>, Option<&SnapshotLine>)> = BTreeMap::new();
    for l in &lines_a {
        by_product.entry(l.product_id).or_default().0 = Some(l);
    }
    for l in &lines_b {
        by_product.entry(l.product_id).or_default().1 = Some(l);
    }

    let rows = by_product
        .into_iter()
        .map(|(product_id, (la, lb))| {
            let qty_a = la.map_or(0.0, |l| l.qty_on_hand);
            let qty_b = lb.map_or(0.0, |l| l.qty_on_hand);
            CompareRow {
                product_id,
                sku: la.and_then(|l| l.sku_raw.clone()).or_else(|| lb.and_then(|l| l.sku_raw.clone())),
                name: la.or(lb).map(|l| l.name.clone()).unwrap_or_default(),
                qty_a,
                qty_b,
                delta: qty_a - qty_b,
            }
        })
        .collect();

    Ok(Comparison {
        week_a: a.week_date,
        week_b: b.week_date,
        rows,
    })
}

/// The `n` biggest drops (most negative delta) and biggest rises.
pub fn biggest_moves(rows: &[CompareRow], n: usize) -> (Vec<&CompareRow>, Vec<&CompareRow>) {
    let mut sorted: Vec<&CompareRow> = rows.iter().collect();
    sorted.sort_by(|a, b| a.delta.total_cmp(&b.delta));
    let down = sorted.iter().take(n).copied().collect();
    let up = sorted.iter().rev().take(n).copied().collect();
    (down, up)
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

fn product_from_row(row: &rusqlite::Row) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        sku: row.get(1)?,
        name: row.get(2)?,
        unit: row.get(3)?,
        location: row.get(4)?,
    })
}

/// Products whose name or SKU contains `search` (case-insensitive), by name.
///
/// Case folding happens here rather than in SQL: SQLite `lower()` leaves
/// accented letters alone.
pub fn search_products(conn: &Connection, search: Option<&str>) -> Result<Vec<Product>> {
    let needle = search.map(str::trim).unwrap_or_default().to_lowercase();
    let mut stmt = conn.prepare("SELECT id, sku, name, unit, location FROM products ORDER BY name")?;
    let products = stmt
        .query_map([], product_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(products
        .into_iter()
        .filter(|p| {
            needle.is_empty()
                || p.name.to_lowercase().contains(&needle)
                || p.sku.as_deref().is_some_and(|s| s.to_lowercase().contains(&needle))
        })
        .take(PRODUCT_SEARCH_LIMIT)
        .collect())
}

pub fn get_product(conn: &Connection, id: i64) -> Result<Product> {
    conn.query_row(
        "SELECT id, sku, name, unit, location FROM products WHERE id = ?1",
        [id],
        product_from_row,
    )
    .optional()?
    .ok_or(InventoryError::ProductNotFound(id))
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPoint {
    pub week_date: String,
    pub qty_on_hand: f64,
    pub qty_available: f64,
    pub unit_price: Option<f64>,
}

/// The most recent weekly lines of one product, newest first.
pub fn product_history(conn: &Connection, product_id: i64) -> Result<Vec<HistoryPoint>> {
    let mut stmt = conn.prepare(
        "SELECT s.week_date, l.qty_on_hand, l.qty_available, l.unit_price \
         FROM inventory_snapshot_lines l JOIN inventory_snapshots s ON s.id = l.snapshot_id \
         WHERE l.product_id = ?1 ORDER BY s.week_date DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(rusqlite::params![product_id, HISTORY_WEEKS as i64], |row| {
        Ok(HistoryPoint {
            week_date: row.get(0)?,
            qty_on_hand: row.get(1)?,
            qty_available: row.get(2)?,
            unit_price: row.get(3)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

// ---------------------------------------------------------------------------
// Import runs
// ---------------------------------------------------------------------------

pub struct ImportRun {
    pub id: i64,
    pub week_date: Option<String>,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub rows_read: Option<i64>,
    pub rows_imported: Option<i64>,
    pub warnings: Vec<ImportWarning>,
    pub errors: Vec<ImportError>,
}

pub fn recent_runs(conn: &Connection, limit: usize) -> Result<Vec<ImportRun>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, s.week_date, r.started_at, r.finished_at, r.rows_read, r.rows_imported, \
         r.warnings_json, r.errors_json \
         FROM import_runs r LEFT JOIN inventory_snapshots s ON s.id = r.snapshot_id \
         ORDER BY r.id DESC LIMIT ?1",
    )?;
    let raw: Vec<(i64, Option<String>, String, Option<String>, Option<i64>, Option<i64>, String, String)> = stmt
        .query_map([limit as i64], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(
            |(id, week_date, started_at, finished_at, rows_read, rows_imported, warnings, errors)| {
                Ok(ImportRun {
                    id,
                    week_date,
                    started_at,
                    finished_at,
                    rows_read,
                    rows_imported,
                    warnings: serde_json::from_str(&warnings)?,
                    errors: serde_json::from_str(&errors)?,
                })
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    fn add_product(conn: &Connection, key: &str, sku: Option<&str>, name: &str) -> i64 {
        conn.execute(
            "INSERT INTO products (identity_key, sku, name) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, sku, name],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn add_snapshot(conn: &Connection, week: &str, lines: &[(i64, f64, Option<f64>)]) -> i64 {
        conn.execute(
            "INSERT INTO inventory_snapshots (week_date, total_products, status) VALUES (?1, ?2, 'imported')",
            rusqlite::params![week, lines.len() as i64],
        )
        .unwrap();
        let id = conn.last_insert_rowid();
        for (product_id, qty, price) in lines {
            let sku: Option<String> = conn
                .query_row("SELECT sku FROM products WHERE id = ?1", [product_id], |r| r.get(0))
                .unwrap();
            conn.execute(
                "INSERT INTO inventory_snapshot_lines (snapshot_id, product_id, sku_raw, unit_price, qty_on_hand, qty_available, value_on_hand) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6)",
                rusqlite::params![id, product_id, sku, price, qty, price.map(|p| p * qty)],
            )
            .unwrap();
        }
        id
    }

    #[test]
    fn test_list_snapshots_newest_first_with_kpis() {
        let (_dir, conn) = test_db();
        let p = add_product(&conn, "SKU:A", Some("A"), "Arroz");
        add_snapshot(&conn, "2025-01-06", &[(p, 2.0, Some(3.0))]);
        add_snapshot(&conn, "2025-01-13", &[(p, 0.0, None)]);
        let list = list_snapshots(&conn).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].snapshot.week_date, "2025-01-13");
        assert_eq!(list[0].kpis.zero_qty, 1);
        assert_eq!(list[0].kpis.value_coverage, 0.0);
        assert_eq!(list[1].kpis.value_coverage, 1.0);
        assert_eq!(latest_snapshot(&conn).unwrap().unwrap().week_date, "2025-01-13");
    }

    #[test]
    fn test_get_snapshot_not_found() {
        let (_dir, conn) = test_db();
        let err = get_snapshot(&conn, "2025-01-06").err().unwrap();
        assert!(matches!(err, InventoryError::SnapshotNotFound(_)));
    }

    #[test]
    fn test_top_and_bottom() {
        let (_dir, conn) = test_db();
        let a = add_product(&conn, "SKU:A", Some("A"), "Arroz");
        let b = add_product(&conn, "SKU:B", Some("B"), "Batata");
        let c = add_product(&conn, "SKU:C", Some("C"), "Cebola");
        add_snapshot(&conn, "2025-01-06", &[(a, 5.0, None), (b, -1.0, None), (c, 9.0, None)]);
        let detail = get_snapshot(&conn, "2025-01-06").unwrap();
        let (top, bottom) = top_and_bottom(&detail.lines, 2);
        assert_eq!(top.iter().map(|l| l.name.as_str()).collect::<Vec<_>>(), vec!["Cebola", "Arroz"]);
        assert_eq!(bottom.iter().map(|l| l.name.as_str()).collect::<Vec<_>>(), vec!["Batata", "Arroz"]);
    }

    #[test]
    fn test_compare_weeks() {
        let (_dir, conn) = test_db();
        let a = add_product(&conn, "SKU:A", Some("A"), "Arroz");
        let b = add_product(&conn, "SKU:B", Some("B"), "Batata");
        let c = add_product(&conn, "NAME:CEBOLA", None, "Cebola");
        add_snapshot(&conn, "2025-01-06", &[(a, 5.0, None), (b, 2.0, None)]);
        add_snapshot(&conn, "2025-01-13", &[(a, 8.0, None), (c, 4.0, None)]);

        let cmp = compare_weeks(&conn, "2025-01-13", "2025-01-06").unwrap();
        assert_eq!(cmp.rows.len(), 3);
        let find = |id: i64| cmp.rows.iter().find(|r| r.product_id == id).unwrap();
        assert_eq!(find(a).delta, 3.0);
        assert_eq!(find(b).qty_a, 0.0);
        assert_eq!(find(b).delta, -2.0);
        assert_eq!(find(b).sku.as_deref(), Some("B"));
        assert_eq!(find(c).sku, None);
        assert_eq!(find(c).name, "Cebola");

        let (down, up) = biggest_moves(&cmp.rows, 1);
        assert_eq!(down[0].product_id, b);
        assert_eq!(up[0].product_id, c);
    }

    #[test]
    fn test_compare_missing_week() {
        let (_dir, conn) = test_db();
        let a = add_product(&conn, "SKU:A", Some("A"), "Arroz");
        add_snapshot(&conn, "2025-01-06", &[(a, 5.0, None)]);
        let err = compare_weeks(&conn, "2025-01-06", "2025-01-13").err().unwrap();
        assert!(matches!(err, InventoryError::SnapshotNotFound(ref w) if w == "2025-01-13"));
    }

    #[test]
    fn test_search_products() {
        let (_dir, conn) = test_db();
        add_product(&conn, "SKU:CF-1", Some("CF-1"), "Café");
        add_product(&conn, "SKU:AR-1", Some("AR-1"), "Arroz");
        add_product(&conn, "NAME:FEIJÃO", None, "Feijão");

        let all = search_products(&conn, None).unwrap();
        assert_eq!(all.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), vec!["Arroz", "Café", "Feijão"]);
        let by_name = search_products(&conn, Some("arr")).unwrap();
        assert_eq!(by_name.len(), 1);
        let by_sku = search_products(&conn, Some("cf-")).unwrap();
        assert_eq!(by_sku[0].name, "Café");
        assert!(search_products(&conn, Some("zzz")).unwrap().is_empty());
    }

    #[test]
    fn test_search_folds_accented_case() {
        let (_dir, conn) = test_db();
        add_product(&conn, "NAME:AÇÚCAR", None, "Açúcar");
        add_product(&conn, "SKU:ÇX-1", Some("çx-1"), "Milho");
        assert_eq!(search_products(&conn, Some("açúcar")).unwrap().len(), 1);
        assert_eq!(search_products(&conn, Some("AÇÚCAR")).unwrap()[0].name, "Açúcar");
        assert_eq!(search_products(&conn, Some("ÇX")).unwrap()[0].name, "Milho");
    }

    #[test]
    fn test_search_is_capped() {
        let (_dir, conn) = test_db();
        for i in 0..(PRODUCT_SEARCH_LIMIT + 5) {
            add_product(&conn, &format!("SKU:P{i}"), Some(format!("P{i}").as_str()), &format!("Produto {i}"));
        }
        assert_eq!(search_products(&conn, Some("produto")).unwrap().len(), PRODUCT_SEARCH_LIMIT);
    }

    #[test]
    fn test_get_product_and_history() {
        let (_dir, conn) = test_db();
        let a = add_product(&conn, "SKU:A", Some("A"), "Arroz");
        add_snapshot(&conn, "2025-01-06", &[(a, 5.0, Some(2.0))]);
        add_snapshot(&conn, "2025-01-13", &[(a, 3.0, None)]);

        assert_eq!(get_product(&conn, a).unwrap().name, "Arroz");
        assert!(matches!(get_product(&conn, 999), Err(InventoryError::ProductNotFound(999))));

        let history = product_history(&conn, a).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].week_date, "2025-01-13");
        assert_eq!(history[0].unit_price, None);
        assert_eq!(history[1].qty_on_hand, 5.0);
    }

    #[test]
    fn test_recent_runs() {
        let (_dir, conn) = test_db();
        conn.execute(
            "INSERT INTO import_runs (errors_count, errors_json) VALUES (1, '[{\"code\":\"import_failed\",\"message\":\"boom\"}]')",
            [],
        )
        .unwrap();
        let runs = recent_runs(&conn, 10).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].week_date, None);
        assert_eq!(runs[0].finished_at, None);
        assert_eq!(runs[0].errors[0].message, "boom");
        assert!(runs[0].warnings.is_empty());
    }
}
