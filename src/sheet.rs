use std::path::Path;

use crate::error::{InventoryError, Result};

/// A single cell value as read from a workbook or CSV file.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    /// Render the cell as text. Numbers use the shortest round-trip form, so
    /// a numeric SKU like `12345.0` reads back as `"12345"`.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            Cell::Number(_) => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

/// The first sheet of a source file: a header row plus data records.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub records: Vec<Vec<Cell>>,
}

impl Table {
    /// Build a table from raw rows. The first row becomes the (trimmed)
    /// headers; fully blank rows after it are skipped.
    pub fn from_rows(sheet_name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        let mut iter = rows.into_iter();
        let headers = iter
            .next()
            .map(|row| {
                row.iter()
                    .map(|c| c.as_text().trim_start_matches('\u{feff}').trim().to_string())
                    .collect()
            })
            .unwrap_or_default();
        let records = iter
            .filter(|row| !row.iter().all(Cell::is_empty))
            .collect();
        Self {
            sheet_name: sheet_name.into(),
            headers,
            records,
        }
    }

    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Cell at `col` of `record`, or an empty cell when the column is absent
    /// or the row is short.
    pub fn cell<'a>(record: &'a [Cell], col: Option<usize>) -> &'a Cell {
        col.and_then(|i| record.get(i)).unwrap_or(&EMPTY_CELL)
    }
}

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

/// Read the first sheet of a workbook, or a CSV file, picking the reader by
/// file extension.
pub fn read_table(file_path: &Path) -> Result<Table> {
    let ext = file_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if ext == "csv" {
        return read_csv(file_path);
    }
    if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
        return read_workbook(file_path);
    }
    Err(InventoryError::UnsupportedFile(file_path.display().to_string()))
}

pub fn read_csv(file_path: &Path) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(file_path)?;
    let mut rows = Vec::new();
    for result in rdr.byte_records() {
        let record = result?;
        rows.push(record.iter().map(|field| Cell::from(decode_field(field).as_str())).collect());
    }
    let sheet_name = file_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("csv")
        .to_string();
    Ok(Table::from_rows(sheet_name, rows))
}

/// UTF-8 when valid, else Latin-1 (the usual encoding of ERP exports).
fn decode_field(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

#[cfg(feature = "xlsx")]
pub fn read_workbook(file_path: &Path) -> Result<Table> {
    let workbook = calamine::open_workbook_auto(file_path)?;
    table_from_workbook(workbook)
}

#[cfg(not(feature = "xlsx"))]
pub fn read_workbook(file_path: &Path) -> Result<Table> {
    Err(InventoryError::UnsupportedFile(format!(
        "{} (built without xlsx support)",
        file_path.display()
    )))
}

#[cfg(feature = "xlsx")]
fn table_from_workbook<RS>(mut workbook: calamine::Sheets<RS>) -> Result<Table>
where
    RS: std::io::Read + std::io::Seek,
{
    use calamine::Reader;

    let sheet_name = first_sheet(&workbook.sheet_names())?;
    let range = workbook.worksheet_range(&sheet_name)?;
    log::debug!("sheet '{}' has {:?} cells", sheet_name, range.get_size());

    let rows = range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();
    Ok(Table::from_rows(sheet_name, rows))
}

pub fn first_sheet(names: &[String]) -> Result<String> {
    names.first().cloned().ok_or(InventoryError::NoSheet)
}

#[cfg(feature = "xlsx")]
fn cell_from_data(data: &calamine::Data) -> Cell {
    use calamine::Data;
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::from(s.as_str()),
        other => Cell::Text(other.to_string()),
    }
}
