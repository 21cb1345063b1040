use serde::{Deserialize, Serialize};

/// One spreadsheet row after header mapping and number coercion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawInventoryRow {
    pub name: String,
    pub sku: Option<String>,
    pub unit: Option<String>,
    pub location: Option<String>,
    pub unit_price: Option<f64>,
    pub qty_on_hand: f64,
    pub qty_available: f64,
}

/// A raw row plus how many raw rows were merged into it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRow {
    #[serde(flatten)]
    pub row: RawInventoryRow,
    pub source_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    MissingSku,
    DuplicateSkuAggregated,
    NegativeStock,
    ZeroPrice,
    UnknownColumns,
}

impl WarningCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingSku => "missing_sku",
            Self::DuplicateSkuAggregated => "duplicate_sku_aggregated",
            Self::NegativeStock => "negative_stock",
            Self::ZeroPrice => "zero_price",
            Self::UnknownColumns => "unknown_columns",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportWarning {
    pub code: WarningCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl ImportWarning {
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// Fatal problems recorded on an import run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportStats {
    pub rows_read: usize,
    pub rows_aggregated: usize,
    pub missing_sku_count: usize,
    pub duplicate_sku_count: usize,
    pub negative_stock_count: usize,
    pub zero_price_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub sku: Option<String>,
    pub name: String,
    pub unit: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub id: i64,
    pub week_date: String,
    pub imported_at: String,
    pub status: String,
    pub total_products: i64,
    pub total_qty_on_hand: f64,
    pub total_qty_available: f64,
    pub total_value_on_hand: Option<f64>,
}

/// A stored per-product line of one snapshot, joined with the product name.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotLine {
    pub product_id: i64,
    pub name: String,
    pub sku_raw: Option<String>,
    pub unit_price: Option<f64>,
    pub qty_on_hand: f64,
    pub qty_available: f64,
    pub value_on_hand: Option<f64>,
}
