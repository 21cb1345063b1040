use std::path::Path;

use serde_json::json;

use crate::error::Result;
use crate::models::{ImportWarning, RawInventoryRow, WarningCode};
use crate::sheet::{read_table, Cell, Table};

pub const COL_NAME: &str = "Produto";
pub const COL_SKU: &str = "Código (SKU)";
pub const COL_PRICE: &str = "Preço";
pub const COL_UNIT: &str = "UN";
pub const COL_LOCATION: &str = "Localização";
pub const COL_ON_HAND: &str = "Estoque atual";
pub const COL_AVAILABLE: &str = "Estoque disponível";

pub const EXPECTED_COLUMNS: [&str; 7] = [
    COL_NAME,
    COL_SKU,
    COL_PRICE,
    COL_UNIT,
    COL_LOCATION,
    COL_ON_HAND,
    COL_AVAILABLE,
];

#[derive(Debug, Clone)]
pub struct ParsedSheet {
    pub rows: Vec<RawInventoryRow>,
    pub warnings: Vec<ImportWarning>,
    pub sheet_name: String,
}

/// Parse a Brazilian-formatted number ("1.234,56"). When a comma is present,
/// dots are thousands separators and the comma is the decimal point;
/// otherwise the text is read as-is once whitespace is removed.
pub fn parse_number_br(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Empty => None,
        Cell::Number(n) => n.is_finite().then_some(*n),
        Cell::Text(s) => parse_number_br_str(s),
    }
}

pub fn parse_number_br_str(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let cleaned = if s.contains(',') {
        s.replace('.', "").replacen(',', ".", 1)
    } else {
        s.to_string()
    };
    let compact: String = cleaned.chars().filter(|c| !c.is_whitespace()).collect();
    compact.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn text_field(cell: &Cell) -> Option<String> {
    let s = cell.as_text();
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Map the fixed inventory columns of `table` into raw rows. Missing columns
/// produce one `unknown_columns` warning; rows with a blank product name are
/// dropped.
pub fn parse_inventory(table: &Table) -> ParsedSheet {
    // Headers count as observed only when there is at least one data record.
    let observed: &[String] = if table.records.is_empty() {
        &[]
    } else {
        &table.headers
    };
    let missing: Vec<&str> = EXPECTED_COLUMNS
        .iter()
        .copied()
        .filter(|h| !observed.iter().any(|o| o == h))
        .collect();

    let mut warnings = Vec::new();
    if !missing.is_empty() {
        log::warn!("missing expected columns: {}", missing.join(", "));
        warnings.push(
            ImportWarning::new(
                WarningCode::UnknownColumns,
                "Some expected columns were not found; importing anyway.",
            )
            .with_meta(json!({ "missing": missing })),
        );
    }

    let name_col = table.column(COL_NAME);
    let sku_col = table.column(COL_SKU);
    let price_col = table.column(COL_PRICE);
    let unit_col = table.column(COL_UNIT);
    let location_col = table.column(COL_LOCATION);
    let on_hand_col = table.column(COL_ON_HAND);
    let available_col = table.column(COL_AVAILABLE);

    let rows: Vec<RawInventoryRow> = table
        .records
        .iter()
        .filter_map(|record| {
            let name = text_field(Table::cell(record, name_col))?;
            Some(RawInventoryRow {
                name,
                sku: text_field(Table::cell(record, sku_col)),
                unit: text_field(Table::cell(record, unit_col)),
                location: text_field(Table::cell(record, location_col)),
                unit_price: parse_number_br(Table::cell(record, price_col)),
                qty_on_hand: parse_number_br(Table::cell(record, on_hand_col)).unwrap_or(0.0),
                qty_available: parse_number_br(Table::cell(record, available_col)).unwrap_or(0.0),
            })
        })
        .collect();

    log::info!(
        "parsed {} rows from sheet '{}' ({} records read)",
        rows.len(),
        table.sheet_name,
        table.records.len()
    );

    ParsedSheet {
        rows,
        warnings,
        sheet_name: table.sheet_name.clone(),
    }
}

pub fn parse_inventory_file(file_path: &Path) -> Result<ParsedSheet> {
    let table = read_table(file_path)?;
    Ok(parse_inventory(&table))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_header() -> Vec<Cell> {
        EXPECTED_COLUMNS.iter().map(|h| Cell::from(*h)).collect()
    }

    fn record(name: &str, sku: &str, price: &str, on_hand: &str, available: &str) -> Vec<Cell> {
        vec![
            Cell::from(name),
            Cell::from(sku),
            Cell::from(price),
            Cell::from("UN"),
            Cell::from("A1"),
            Cell::from(on_hand),
            Cell::from(available),
        ]
    }

    #[test]
    fn test_parse_number_br() {
        assert_eq!(parse_number_br_str("1.234,56"), Some(1234.56));
        assert_eq!(parse_number_br_str("1234,56"), Some(1234.56));
        assert_eq!(parse_number_br_str("1234.56"), Some(1234.56));
        assert_eq!(parse_number_br_str(" 1 234 "), Some(1234.0));
        assert_eq!(parse_number_br_str("-3,5"), Some(-3.5));
        assert_eq!(parse_number_br_str(""), None);
        assert_eq!(parse_number_br_str("   "), None);
        assert_eq!(parse_number_br_str("abc"), None);
        assert_eq!(parse_number_br_str("inf"), None);
        assert_eq!(parse_number_br_str(","), None);
    }

    #[test]
    fn test_parse_number_br_cells() {
        assert_eq!(parse_number_br(&Cell::Number(10.0)), Some(10.0));
        assert_eq!(parse_number_br(&Cell::Number(f64::NAN)), None);
        assert_eq!(parse_number_br(&Cell::Empty), None);
        assert_eq!(parse_number_br(&Cell::from("2,5")), Some(2.5));
    }

    #[test]
    fn test_parse_full_sheet() {
        let table = Table::from_rows(
            "Plan1",
            vec![
                full_header(),
                record(" Café ", " C1 ", "1.234,56", "5", "4,5"),
                record("Açúcar", "", "", "", "abc"),
            ],
        );
        let parsed = parse_inventory(&table);
        assert_eq!(parsed.sheet_name, "Plan1");
        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.rows.len(), 2);

        let cafe = &parsed.rows[0];
        assert_eq!(cafe.name, "Café");
        assert_eq!(cafe.sku.as_deref(), Some("C1"));
        assert_eq!(cafe.unit.as_deref(), Some("UN"));
        assert_eq!(cafe.location.as_deref(), Some("A1"));
        assert_eq!(cafe.unit_price, Some(1234.56));
        assert_eq!(cafe.qty_on_hand, 5.0);
        assert_eq!(cafe.qty_available, 4.5);

        let acucar = &parsed.rows[1];
        assert_eq!(acucar.sku, None);
        assert_eq!(acucar.unit_price, None);
        assert_eq!(acucar.qty_on_hand, 0.0);
        assert_eq!(acucar.qty_available, 0.0);
    }

    #[test]
    fn test_blank_names_are_dropped() {
        let table = Table::from_rows(
            "Plan1",
            vec![
                full_header(),
                record("   ", "X9", "10", "1", "1"),
                record("Feijão", "F1", "10", "1", "1"),
            ],
        );
        let parsed = parse_inventory(&table);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].name, "Feijão");
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_missing_columns_warn_once_and_default() {
        let table = Table::from_rows(
            "Plan1",
            vec![
                vec![Cell::from("Produto"), Cell::from("Estoque atual")],
                vec![Cell::from("Arroz"), Cell::Number(7.0)],
            ],
        );
        let parsed = parse_inventory(&table);
        assert_eq!(parsed.warnings.len(), 1);
        let warning = &parsed.warnings[0];
        assert_eq!(warning.code, WarningCode::UnknownColumns);
        let missing = warning.meta.as_ref().unwrap()["missing"].as_array().unwrap().clone();
        assert_eq!(missing.len(), 5);
        assert!(missing.contains(&json!("Código (SKU)")));
        assert!(!missing.contains(&json!("Produto")));

        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].qty_on_hand, 7.0);
        assert_eq!(parsed.rows[0].qty_available, 0.0);
        assert_eq!(parsed.rows[0].unit_price, None);
    }

    #[test]
    fn test_header_only_sheet_reports_every_column() {
        let table = Table::from_rows("Plan1", vec![full_header()]);
        let parsed = parse_inventory(&table);
        assert!(parsed.rows.is_empty());
        let missing = parsed.warnings[0].meta.as_ref().unwrap()["missing"]
            .as_array()
            .unwrap()
            .len();
        assert_eq!(missing, 7);
    }

    #[test]
    fn test_numeric_sku_cell_becomes_text() {
        let table = Table::from_rows(
            "Plan1",
            vec![
                full_header(),
                vec![
                    Cell::from("Milho"),
                    Cell::Number(789.0),
                    Cell::Number(3.25),
                    Cell::Empty,
                    Cell::Empty,
                    Cell::Number(-2.0),
                    Cell::Number(0.0),
                ],
            ],
        );
        let row = &parse_inventory(&table).rows[0];
        assert_eq!(row.sku.as_deref(), Some("789"));
        assert_eq!(row.unit, None);
        assert_eq!(row.unit_price, Some(3.25));
        assert_eq!(row.qty_on_hand, -2.0);
    }
}
