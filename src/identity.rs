//! Identity resolution: deciding when two spreadsheet rows describe the same
//! product within one import.
//!
//! A strategy maps a row to a canonical key. The aggregation loop only ever
//! sees keys, so a different policy (say, fuzzy name matching) can be swapped
//! in without touching the merge logic.

use crate::models::RawInventoryRow;

pub trait IdentityStrategy {
    /// Canonical key for `row`, or `None` if this strategy cannot identify it.
    fn key(&self, row: &RawInventoryRow) -> Option<String>;
}

/// Identify by SKU, ignoring case and surrounding whitespace.
pub struct BySku;

/// Identify by product name, ignoring case and surrounding whitespace.
pub struct ByName;

/// SKU when present, else name.
pub struct SkuOrName;

impl IdentityStrategy for BySku {
    fn key(&self, row: &RawInventoryRow) -> Option<String> {
        row.sku.as_deref().and_then(sku_key)
    }
}

impl IdentityStrategy for ByName {
    fn key(&self, row: &RawInventoryRow) -> Option<String> {
        Some(name_key(&row.name))
    }
}

impl IdentityStrategy for SkuOrName {
    fn key(&self, row: &RawInventoryRow) -> Option<String> {
        BySku.key(row).or_else(|| ByName.key(row))
    }
}

pub fn sku_key(sku: &str) -> Option<String> {
    let sku = sku.trim();
    (!sku.is_empty()).then(|| format!("SKU:{}", sku.to_uppercase()))
}

pub fn name_key(name: &str) -> String {
    format!("NAME:{}", name.trim().to_uppercase())
}

/// Trimmed SKU, or `None` when blank.
pub fn normalized_sku(sku: Option<&str>) -> Option<&str> {
    sku.map(str::trim).filter(|s| !s.is_empty())
}

/// Resolve a key with `strategy`, falling back to the name key so that every
/// row is always identifiable.
pub fn resolve_key(strategy: &dyn IdentityStrategy, row: &RawInventoryRow) -> String {
    strategy.key(row).unwrap_or_else(|| name_key(&row.name))
}

/// The default key: `SKU:<SKU>` or `NAME:<NAME>`.
pub fn identity_key(row: &RawInventoryRow) -> String {
    resolve_key(&SkuOrName, row)
}
