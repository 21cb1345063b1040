use thiserror::Error;

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "xlsx")]
    #[error("Spreadsheet error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Spreadsheet has no sheets")]
    NoSheet,

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("A snapshot already exists for week {0}")]
    WeekAlreadyExists(String),

    #[error("Invalid week date (expected YYYY-MM-DD): {0}")]
    InvalidWeek(String),

    #[error("No snapshot found for week {0}")]
    SnapshotNotFound(String),

    #[error("Unknown product id: {0}")]
    ProductNotFound(i64),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, InventoryError>;
