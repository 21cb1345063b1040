use std::collections::HashMap;

use crate::identity::{normalized_sku, resolve_key, IdentityStrategy, SkuOrName};
use crate::models::{AggregatedRow, ImportStats, ImportWarning, RawInventoryRow, WarningCode};

// ---------------------------------------------------------------------------
// Per-field merge policy
// ---------------------------------------------------------------------------

pub type Reducer = fn(&mut RawInventoryRow, &RawInventoryRow);

/// How each field of an already-seen product absorbs a later row with the
/// same identity key.
pub const MERGE_RULES: &[(&str, Reducer)] = &[
    ("name", keep),
    ("sku", keep),
    ("unit", merge_unit),
    ("location", merge_location),
    ("unit_price", merge_unit_price),
    ("qty_on_hand", merge_qty_on_hand),
    ("qty_available", merge_qty_available),
];

pub fn first_non_null(slot: &mut Option<String>, incoming: &Option<String>) {
    if slot.is_none() {
        slot.clone_from(incoming);
    }
}

/// Keep the larger price, reading null as 0. Ties keep the earlier value, so
/// a group whose prices are all null stays null.
pub fn max_price(slot: &mut Option<f64>, incoming: Option<f64>) {
    let current = slot.unwrap_or(0.0);
    let candidate = incoming.unwrap_or(0.0);
    if candidate > current {
        *slot = Some(candidate);
    }
}

fn keep(_: &mut RawInventoryRow, _: &RawInventoryRow) {}

fn merge_unit(acc: &mut RawInventoryRow, row: &RawInventoryRow) {
    first_non_null(&mut acc.unit, &row.unit);
}

fn merge_location(acc: &mut RawInventoryRow, row: &RawInventoryRow) {
    first_non_null(&mut acc.location, &row.location);
}

fn merge_unit_price(acc: &mut RawInventoryRow, row: &RawInventoryRow) {
    max_price(&mut acc.unit_price, row.unit_price);
}

fn merge_qty_on_hand(acc: &mut RawInventoryRow, row: &RawInventoryRow) {
    acc.qty_on_hand += row.qty_on_hand;
}

fn merge_qty_available(acc: &mut RawInventoryRow, row: &RawInventoryRow) {
    acc.qty_available += row.qty_available;
}

pub fn merge_into(acc: &mut AggregatedRow, row: &RawInventoryRow) {
    for (_, reduce) in MERGE_RULES {
        reduce(&mut acc.row, row);
    }
    acc.source_count += 1;
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Aggregation {
    pub aggregated: Vec<AggregatedRow>,
    pub warnings: Vec<ImportWarning>,
    pub stats: ImportStats,
}

/// Deduplicate `rows` by the default SKU-or-name key and collect data-quality
/// warnings. Rows with blank names are expected to be filtered out already.
pub fn aggregate_and_validate(rows: &[RawInventoryRow]) -> Aggregation {
    aggregate_with(rows, &SkuOrName)
}

pub fn aggregate_with(rows: &[RawInventoryRow], strategy: &dyn IdentityStrategy) -> Aggregation {
    let mut warnings = Vec::new();
    let mut stats = ImportStats {
        rows_read: rows.len(),
        ..ImportStats::default()
    };

    // Pass 1: SKU coverage and duplicates (exact trimmed value).
    let mut sku_counts: HashMap<&str, usize> = HashMap::new();
    for r in rows {
        match normalized_sku(r.sku.as_deref()) {
            Some(sku) => *sku_counts.entry(sku).or_default() += 1,
            None => stats.missing_sku_count += 1,
        }
    }
    stats.duplicate_sku_count = sku_counts.values().filter(|c| **c > 1).map(|c| c - 1).sum();

    if stats.missing_sku_count > 0 {
        warnings.push(ImportWarning::new(
            WarningCode::MissingSku,
            format!(
                "{} rows have an empty SKU; those items will be identified by name.",
                stats.missing_sku_count
            ),
        ));
    }
    if stats.duplicate_sku_count > 0 {
        warnings.push(ImportWarning::new(
            WarningCode::DuplicateSkuAggregated,
            "Duplicate SKUs were found in the same week; those rows will be aggregated (summed) by SKU.",
        ));
    }

    // Pass 2: merge by identity key, preserving first-seen order.
    let mut aggregated: Vec<AggregatedRow> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for r in rows {
        if r.qty_on_hand < 0.0 || r.qty_available < 0.0 {
            stats.negative_stock_count += 1;
        }
        if r.unit_price.unwrap_or(0.0) == 0.0 {
            stats.zero_price_count += 1;
        }

        let key = resolve_key(strategy, r);
        match index.get(&key) {
            Some(&i) => merge_into(&mut aggregated[i], r),
            None => {
                index.insert(key, aggregated.len());
                aggregated.push(AggregatedRow {
                    row: r.clone(),
                    source_count: 1,
                });
            }
        }
    }

    if stats.negative_stock_count > 0 {
        warnings.push(ImportWarning::new(
            WarningCode::NegativeStock,
            format!(
                "{} rows have negative stock (on hand or available); they will be imported and flagged.",
                stats.negative_stock_count
            ),
        ));
    }
    if stats.zero_price_count > 0 {
        warnings.push(ImportWarning::new(
            WarningCode::ZeroPrice,
            format!(
                "{} rows have a zero or missing price; the total stock value will be partial.",
                stats.zero_price_count
            ),
        ));
    }

    stats.rows_aggregated = aggregated.len();
    log::info!(
        "aggregated {} rows into {} products ({} warnings)",
        stats.rows_read,
        stats.rows_aggregated,
        warnings.len()
    );

    Aggregation {
        aggregated,
        warnings,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{identity_key, ByName};

    fn row(name: &str, sku: Option<&str>, on_hand: f64, available: f64, price: Option<f64>) -> RawInventoryRow {
        RawInventoryRow {
            name: name.to_string(),
            sku: sku.map(str::to_string),
            unit: None,
            location: None,
            unit_price: price,
            qty_on_hand: on_hand,
            qty_available: available,
        }
    }

    fn codes(agg: &Aggregation) -> Vec<WarningCode> {
        agg.warnings.iter().map(|w| w.code).collect()
    }

    #[test]
    fn test_merges_same_sku_ignoring_case() {
        let rows = vec![
            row("Café", Some("C1"), 5.0, 5.0, Some(10.0)),
            row("Café", Some("c1"), 3.0, 2.0, Some(12.0)),
        ];
        let agg = aggregate_and_validate(&rows);
        assert_eq!(agg.aggregated.len(), 1);
        let out = &agg.aggregated[0];
        assert_eq!(out.row.name, "Café");
        assert_eq!(out.row.sku.as_deref(), Some("C1"));
        assert_eq!(out.row.qty_on_hand, 8.0);
        assert_eq!(out.row.qty_available, 7.0);
        assert_eq!(out.row.unit_price, Some(12.0));
        assert_eq!(out.source_count, 2);
        // "C1" and "c1" are distinct exact values, so no duplicate is counted.
        assert_eq!(agg.stats.duplicate_sku_count, 0);
    }

    #[test]
    fn test_duplicate_and_missing_sku_warnings() {
        let rows = vec![
            row("A", Some("A"), 1.0, 1.0, Some(1.0)),
            row("A", Some("A"), 1.0, 1.0, Some(1.0)),
            row("B", Some(""), 1.0, 1.0, Some(1.0)),
        ];
        let agg = aggregate_and_validate(&rows);
        assert_eq!(agg.stats.duplicate_sku_count, 1);
        assert_eq!(agg.stats.missing_sku_count, 1);
        assert_eq!(
            codes(&agg),
            vec![WarningCode::MissingSku, WarningCode::DuplicateSkuAggregated]
        );
    }

    #[test]
    fn test_duplicate_count_is_excess_occurrences() {
        let rows = vec![
            row("A", Some("A"), 1.0, 1.0, Some(1.0)),
            row("A", Some("A"), 1.0, 1.0, Some(1.0)),
            row("A", Some(" A "), 1.0, 1.0, Some(1.0)),
            row("B", Some("B"), 1.0, 1.0, Some(1.0)),
            row("B", Some("B"), 1.0, 1.0, Some(1.0)),
        ];
        let agg = aggregate_and_validate(&rows);
        assert_eq!(agg.stats.duplicate_sku_count, 3);
        assert_eq!(agg.aggregated.len(), 2);
    }

    #[test]
    fn test_warning_order_and_counts() {
        let rows = vec![
            row("A", None, -1.0, 0.0, None),
            row("B", Some("B"), 2.0, -4.0, Some(0.0)),
            row("C", Some("C"), 2.0, 2.0, Some(3.0)),
        ];
        let agg = aggregate_and_validate(&rows);
        assert_eq!(
            codes(&agg),
            vec![
                WarningCode::MissingSku,
                WarningCode::NegativeStock,
                WarningCode::ZeroPrice
            ]
        );
        assert_eq!(agg.stats.negative_stock_count, 2);
        assert_eq!(agg.stats.zero_price_count, 2);
        assert_eq!(agg.stats.rows_read, 3);
        assert_eq!(agg.stats.rows_aggregated, 3);
    }

    #[test]
    fn test_clean_batch_has_no_warnings() {
        let rows = vec![row("A", Some("A"), 1.0, 1.0, Some(2.0))];
        assert!(aggregate_and_validate(&rows).warnings.is_empty());
    }

    #[test]
    fn test_name_fallback_groups_blank_skus() {
        let rows = vec![
            row("Arroz ", None, 1.0, 1.0, None),
            row("arroz", Some("  "), 2.0, 2.0, None),
            row("Arroz", Some("R1"), 4.0, 4.0, None),
        ];
        let agg = aggregate_and_validate(&rows);
        assert_eq!(agg.aggregated.len(), 2);
        assert_eq!(agg.aggregated[0].row.qty_on_hand, 3.0);
        assert_eq!(agg.aggregated[0].source_count, 2);
        assert_eq!(agg.aggregated[1].row.sku.as_deref(), Some("R1"));
    }

    #[test]
    fn test_output_keys_are_distinct_and_sums_hold() {
        let rows = vec![
            row("X", Some("x"), 1.5, 1.0, Some(2.0)),
            row("Y", None, 2.0, 2.0, None),
            row("X", Some("X "), 2.5, 0.5, Some(1.0)),
            row("y", None, -1.0, 3.0, Some(4.0)),
            row("Z", Some("z"), 0.0, 0.0, None),
        ];
        let agg = aggregate_and_validate(&rows);
        let mut keys: Vec<String> = agg.aggregated.iter().map(|a| identity_key(&a.row)).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), agg.aggregated.len());
        assert_eq!(agg.aggregated.len(), 3);

        for out in &agg.aggregated {
            let key = identity_key(&out.row);
            let members: Vec<&RawInventoryRow> =
                rows.iter().filter(|r| identity_key(r) == key).collect();
            let on_hand: f64 = members.iter().map(|r| r.qty_on_hand).sum();
            let available: f64 = members.iter().map(|r| r.qty_available).sum();
            assert_eq!(out.row.qty_on_hand, on_hand);
            assert_eq!(out.row.qty_available, available);
            assert_eq!(out.source_count as usize, members.len());
        }
    }

    #[test]
    fn test_max_price_reducer() {
        let mut slot = Some(10.0);
        max_price(&mut slot, None);
        assert_eq!(slot, Some(10.0));
        max_price(&mut slot, Some(9.0));
        assert_eq!(slot, Some(10.0));
        max_price(&mut slot, Some(11.0));
        assert_eq!(slot, Some(11.0));

        let mut empty = None;
        max_price(&mut empty, None);
        assert_eq!(empty, None);
        max_price(&mut empty, Some(0.0));
        assert_eq!(empty, None);
        max_price(&mut empty, Some(4.0));
        assert_eq!(empty, Some(4.0));
    }

    #[test]
    fn test_max_price_null_overrides_negative() {
        // Null reads as 0, which beats a negative price.
        let mut slot = Some(-5.0);
        max_price(&mut slot, None);
        assert_eq!(slot, Some(0.0));
    }

    #[test]
    fn test_first_non_null_reducer() {
        let mut slot = None;
        first_non_null(&mut slot, &None);
        assert_eq!(slot, None);
        first_non_null(&mut slot, &Some("KG".to_string()));
        assert_eq!(slot.as_deref(), Some("KG"));
        first_non_null(&mut slot, &Some("UN".to_string()));
        assert_eq!(slot.as_deref(), Some("KG"));
    }

    #[test]
    fn test_merge_rules_cover_every_field() {
        let fields: Vec<&str> = MERGE_RULES.iter().map(|(f, _)| *f).collect();
        assert_eq!(
            fields,
            vec!["name", "sku", "unit", "location", "unit_price", "qty_on_hand", "qty_available"]
        );
    }

    #[test]
    fn test_merge_keeps_identity_fields() {
        let mut acc = AggregatedRow {
            row: row("Café", Some("C1"), 1.0, 1.0, None),
            source_count: 1,
        };
        let mut later = row("CAFÉ torrado", Some("c1"), 1.0, 1.0, None);
        later.unit = Some("KG".to_string());
        later.location = Some("B2".to_string());
        merge_into(&mut acc, &later);
        assert_eq!(acc.row.name, "Café");
        assert_eq!(acc.row.sku.as_deref(), Some("C1"));
        assert_eq!(acc.row.unit.as_deref(), Some("KG"));
        assert_eq!(acc.row.location.as_deref(), Some("B2"));
        assert_eq!(acc.source_count, 2);
    }

    #[test]
    fn test_aggregate_with_name_strategy() {
        let rows = vec![
            row("Café", Some("C1"), 1.0, 1.0, None),
            row("café", Some("C2"), 1.0, 1.0, None),
        ];
        let agg = aggregate_with(&rows, &ByName);
        assert_eq!(agg.aggregated.len(), 1);
        assert_eq!(agg.aggregated[0].row.qty_on_hand, 2.0);
    }
}
