use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const DB_FILE: &str = "inventario.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY,
    identity_key TEXT NOT NULL UNIQUE,
    sku TEXT,
    name TEXT NOT NULL,
    unit TEXT,
    location TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS inventory_snapshots (
    id INTEGER PRIMARY KEY,
    week_date TEXT NOT NULL UNIQUE,
    imported_at TEXT DEFAULT (datetime('now')),
    source_filename TEXT,
    source_checksum TEXT,
    total_rows_read INTEGER NOT NULL DEFAULT 0,
    total_products INTEGER NOT NULL DEFAULT 0,
    total_qty_on_hand REAL NOT NULL DEFAULT 0,
    total_qty_available REAL NOT NULL DEFAULT 0,
    total_value_on_hand REAL,
    status TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS inventory_snapshot_lines (
    id INTEGER PRIMARY KEY,
    snapshot_id INTEGER NOT NULL,
    product_id INTEGER NOT NULL,
    sku_raw TEXT,
    unit_price REAL,
    qty_on_hand REAL NOT NULL,
    qty_available REAL NOT NULL,
    value_on_hand REAL,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE (snapshot_id, product_id),
    FOREIGN KEY (snapshot_id) REFERENCES inventory_snapshots(id) ON DELETE CASCADE,
    FOREIGN KEY (product_id) REFERENCES products(id)
);

CREATE INDEX IF NOT EXISTS idx_lines_product
    ON inventory_snapshot_lines (product_id);

CREATE TABLE IF NOT EXISTS import_runs (
    id INTEGER PRIMARY KEY,
    snapshot_id INTEGER,
    started_at TEXT DEFAULT (datetime('now')),
    finished_at TEXT,
    storage_path TEXT,
    rows_read INTEGER,
    rows_imported INTEGER,
    warnings_count INTEGER NOT NULL DEFAULT 0,
    errors_count INTEGER NOT NULL DEFAULT 0,
    warnings_json TEXT NOT NULL DEFAULT '[]',
    errors_json TEXT NOT NULL DEFAULT '[]',
    FOREIGN KEY (snapshot_id) REFERENCES inventory_snapshots(id) ON DELETE SET NULL
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Open the database in `data_dir`, creating the schema if needed.
pub fn open_data_dir(data_dir: &Path) -> Result<Connection> {
    let conn = get_connection(&data_dir.join(DB_FILE))?;
    init_db(&conn)?;
    Ok(conn)
}

#[cfg(test)]
pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = get_connection(&dir.path().join("test.db")).unwrap();
    init_db(&conn).unwrap();
    (dir, conn)
}
