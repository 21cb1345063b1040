use std::path::{Path, PathBuf};

use chrono::Datelike;
use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::aggregator::{aggregate_and_validate, Aggregation};
use crate::error::{InventoryError, Result};
use crate::identity::{identity_key, normalized_sku};
use crate::kpis::{compute_kpis, value_on_hand, Kpis};
use crate::models::{ImportError, ImportStats, ImportWarning, RawInventoryRow, SnapshotLine};
use crate::parser::parse_inventory_file;
use crate::settings::Settings;

pub const STATUS_IMPORTED: &str = "imported";
pub const STATUS_IMPORTED_WITH_WARNINGS: &str = "imported_with_warnings";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Normalize a `YYYY-MM-DD` week date.
pub fn validate_week(raw: &str) -> Result<String> {
    chrono::NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| InventoryError::InvalidWeek(raw.to_string()))
}

/// Monday of the current week.
pub fn current_week() -> String {
    let today = chrono::Local::now().date_naive();
    let monday = today - chrono::Duration::days(i64::from(today.weekday().num_days_from_monday()));
    monday.format("%Y-%m-%d").to_string()
}

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

fn snapshot_exists(conn: &Connection, week_date: &str) -> Result<bool> {
    let mut stmt = conn.prepare_cached("SELECT 1 FROM inventory_snapshots WHERE week_date = ?1")?;
    Ok(stmt.exists([week_date])?)
}

fn week_with_checksum(conn: &Connection, checksum: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT week_date FROM inventory_snapshots WHERE source_checksum = ?1 ORDER BY week_date DESC LIMIT 1",
            [checksum],
            |r| r.get(0),
        )
        .optional()?)
}

/// Copy the source file into the imports archive as `<timestamp>_<filename>`.
fn archive_source(file_path: &Path, settings: &Settings) -> Result<PathBuf> {
    let dir = settings.imports_dir();
    std::fs::create_dir_all(&dir)?;
    let filename = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("inventario.xlsx");
    let stamp = chrono::Local::now().format("%Y-%m-%dT%H-%M-%S");
    let dest = dir.join(format!("{stamp}_{filename}"));
    std::fs::copy(file_path, &dest)?;
    log::info!("archived {} to {}", file_path.display(), dest.display());
    Ok(dest)
}

// ---------------------------------------------------------------------------
// Import runs (audit log)
// ---------------------------------------------------------------------------

fn start_run(conn: &Connection) -> Result<i64> {
    conn.execute("INSERT INTO import_runs DEFAULT VALUES", [])?;
    Ok(conn.last_insert_rowid())
}

fn set_run_storage(conn: &Connection, run_id: i64, storage_path: &Path) -> Result<()> {
    conn.execute(
        "UPDATE import_runs SET storage_path = ?2 WHERE id = ?1",
        rusqlite::params![run_id, storage_path.to_string_lossy()],
    )?;
    Ok(())
}

fn finish_run(
    conn: &Connection,
    run_id: i64,
    snapshot_id: i64,
    rows_read: usize,
    rows_imported: usize,
    warnings: &[ImportWarning],
) -> Result<()> {
    conn.execute(
        "UPDATE import_runs SET snapshot_id = ?2, finished_at = datetime('now'), rows_read = ?3, \
         rows_imported = ?4, warnings_count = ?5, errors_count = 0, warnings_json = ?6, errors_json = '[]' \
         WHERE id = ?1",
        rusqlite::params![
            run_id,
            snapshot_id,
            rows_read as i64,
            rows_imported as i64,
            warnings.len() as i64,
            serde_json::to_string(warnings)?,
        ],
    )?;
    Ok(())
}

fn fail_run(conn: &Connection, run_id: i64, code: &str, message: &str) -> Result<()> {
    let errors = vec![ImportError {
        code: code.to_string(),
        message: message.to_string(),
    }];
    conn.execute(
        "UPDATE import_runs SET finished_at = datetime('now'), errors_count = ?2, errors_json = ?3 WHERE id = ?1",
        rusqlite::params![run_id, errors.len() as i64, serde_json::to_string(&errors)?],
    )?;
    Ok(())
}

fn record_failure(conn: &Connection, run_id: i64, code: &str, err: &InventoryError) {
    log::error!("import run {run_id} failed: {err}");
    if let Err(e) = fail_run(conn, run_id, code, &err.to_string()) {
        log::error!("could not record failure on import run {run_id}: {e}");
    }
}

// ---------------------------------------------------------------------------
// Preview (parse + aggregate, no persistence)
// ---------------------------------------------------------------------------

pub struct Preview {
    pub sheet_name: String,
    /// Parser warnings followed by aggregator warnings.
    pub warnings: Vec<ImportWarning>,
    pub aggregation: Aggregation,
}

pub fn preview_file(file_path: &Path) -> Result<Preview> {
    let parsed = parse_inventory_file(file_path)?;
    let aggregation = aggregate_and_validate(&parsed.rows);
    let mut warnings = parsed.warnings;
    warnings.extend(aggregation.warnings.iter().cloned());
    Ok(Preview {
        sheet_name: parsed.sheet_name,
        warnings,
        aggregation,
    })
}

// ---------------------------------------------------------------------------
// import_file
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ImportOutcome {
    pub run_id: i64,
    pub snapshot_id: i64,
    pub week_date: String,
    pub sheet_name: String,
    pub status: &'static str,
    pub stats: ImportStats,
    pub warnings: Vec<ImportWarning>,
    pub kpis: Kpis,
    pub rows_imported: usize,
    pub storage_path: PathBuf,
    /// Week that was previously imported from a byte-identical file.
    pub same_file_as: Option<String>,
}

/// Import one weekly spreadsheet as the snapshot for `week_date`.
///
/// Every attempt is logged in `import_runs`. A week that already has a
/// snapshot is rejected. Everything from snapshot creation through product
/// resolution and line insertion happens in one transaction, so a failure
/// leaves no partial snapshot behind.
pub fn import_file(
    conn: &mut Connection,
    file_path: &Path,
    week_date: &str,
    settings: &Settings,
) -> Result<ImportOutcome> {
    let week_date = validate_week(week_date)?;
    let run_id = start_run(conn)?;

    let storage_path = match archive_source(file_path, settings)
        .and_then(|p| set_run_storage(conn, run_id, &p).map(|_| p))
    {
        Ok(p) => p,
        Err(e) => {
            record_failure(conn, run_id, "import_failed", &e);
            return Err(e);
        }
    };

    match snapshot_exists(conn, &week_date) {
        Ok(false) => {}
        Ok(true) => {
            let err = InventoryError::WeekAlreadyExists(week_date);
            record_failure(conn, run_id, "week_already_exists", &err);
            return Err(err);
        }
        Err(e) => {
            record_failure(conn, run_id, "import_failed", &e);
            return Err(e);
        }
    }

    match commit_snapshot(conn, run_id, &storage_path, &week_date) {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            record_failure(conn, run_id, "import_failed", &e);
            Err(e)
        }
    }
}

fn commit_snapshot(
    conn: &mut Connection,
    run_id: i64,
    storage_path: &Path,
    week_date: &str,
) -> Result<ImportOutcome> {
    let preview = preview_file(storage_path)?;
    let checksum = compute_checksum(storage_path)?;
    let same_file_as = week_with_checksum(conn, &checksum)?;
    if let Some(week) = &same_file_as {
        log::warn!("this file was already imported for week {week}");
    }

    let Preview {
        sheet_name,
        warnings,
        aggregation,
    } = preview;
    let status = if warnings.is_empty() {
        STATUS_IMPORTED
    } else {
        STATUS_IMPORTED_WITH_WARNINGS
    };
    let source_filename = storage_path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string);

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO inventory_snapshots (week_date, source_filename, source_checksum, total_rows_read, total_products, status) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            week_date,
            source_filename,
            checksum,
            aggregation.stats.rows_read as i64,
            aggregation.stats.rows_aggregated as i64,
            status,
        ],
    )?;
    let snapshot_id = tx.last_insert_rowid();

    let mut lines = Vec::with_capacity(aggregation.aggregated.len());
    {
        let mut insert_line = tx.prepare(
            "INSERT INTO inventory_snapshot_lines \
             (snapshot_id, product_id, sku_raw, unit_price, qty_on_hand, qty_available, value_on_hand) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for agg in &aggregation.aggregated {
            let r = &agg.row;
            let product_id = resolve_product(&tx, r)?;
            let line = SnapshotLine {
                product_id,
                name: r.name.clone(),
                sku_raw: normalized_sku(r.sku.as_deref()).map(str::to_string),
                unit_price: r.unit_price,
                qty_on_hand: r.qty_on_hand,
                qty_available: r.qty_available,
                value_on_hand: value_on_hand(r.qty_on_hand, r.unit_price),
            };
            insert_line.execute(rusqlite::params![
                snapshot_id,
                line.product_id,
                line.sku_raw,
                line.unit_price,
                line.qty_on_hand,
                line.qty_available,
                line.value_on_hand,
            ])?;
            lines.push(line);
        }
    }

    let kpis = compute_kpis(&lines);
    tx.execute(
        "UPDATE inventory_snapshots SET total_qty_on_hand = ?2, total_qty_available = ?3, total_value_on_hand = ?4 \
         WHERE id = ?1",
        rusqlite::params![snapshot_id, kpis.total_on_hand, kpis.total_available, kpis.total_value],
    )?;
    finish_run(
        &tx,
        run_id,
        snapshot_id,
        aggregation.stats.rows_read,
        lines.len(),
        &warnings,
    )?;
    tx.commit()?;

    log::info!(
        "committed snapshot {snapshot_id} for week {week_date}: {} lines, status {status}",
        lines.len()
    );

    Ok(ImportOutcome {
        run_id,
        snapshot_id,
        week_date: week_date.to_string(),
        sheet_name,
        status,
        stats: aggregation.stats,
        warnings,
        kpis,
        rows_imported: lines.len(),
        storage_path: storage_path.to_path_buf(),
        same_file_as,
    })
}

/// Find the stored product for `row` by identity key, refreshing its metadata,
/// or create it.
fn resolve_product(conn: &Connection, row: &RawInventoryRow) -> Result<i64> {
    let key = identity_key(row);
    let sku = normalized_sku(row.sku.as_deref());
    let existing: Option<i64> = conn
        .prepare_cached("SELECT id FROM products WHERE identity_key = ?1")?
        .query_row([&key], |r| r.get(0))
        .optional()?;

    match existing {
        Some(id) if sku.is_some() => {
            conn.execute(
                "UPDATE products SET name = ?2, unit = ?3, location = ?4 WHERE id = ?1",
                rusqlite::params![id, row.name, row.unit, row.location],
            )?;
            Ok(id)
        }
        Some(id) => {
            conn.execute(
                "UPDATE products SET unit = ?2, location = ?3 WHERE id = ?1",
                rusqlite::params![id, row.unit, row.location],
            )?;
            Ok(id)
        }
        None => {
            conn.execute(
                "INSERT INTO products (identity_key, sku, name, unit, location) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![key, sku, row.name, row.unit, row.location],
            )?;
            Ok(conn.last_insert_rowid())
        }
    }
}
