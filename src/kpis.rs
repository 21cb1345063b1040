use serde::Serialize;

use crate::models::SnapshotLine;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub total_products: usize,
    pub total_on_hand: f64,
    pub total_available: f64,
    /// Sum of line values; `None` when no line has a usable price.
    pub total_value: Option<f64>,
    pub zero_qty: usize,
    pub negative_qty: usize,
    /// Share of lines that carry a value, used to caveat `total_value`.
    pub value_coverage: f64,
}

pub fn compute_kpis(lines: &[SnapshotLine]) -> Kpis {
    let mut kpis = Kpis {
        total_products: lines.len(),
        ..Kpis::default()
    };
    let mut total_value = 0.0;
    let mut value_count = 0usize;

    for l in lines {
        kpis.total_on_hand += l.qty_on_hand;
        kpis.total_available += l.qty_available;
        if l.qty_on_hand == 0.0 {
            kpis.zero_qty += 1;
        }
        if l.qty_on_hand < 0.0 || l.qty_available < 0.0 {
            kpis.negative_qty += 1;
        }
        if let Some(v) = l.value_on_hand.filter(|v| v.is_finite()) {
            total_value += v;
            value_count += 1;
        }
    }

    kpis.total_value = (value_count > 0).then_some(total_value);
    kpis.value_coverage = if lines.is_empty() {
        0.0
    } else {
        value_count as f64 / lines.len() as f64
    };
    kpis
}

/// Line value: quantity times price, only when the price is positive.
pub fn value_on_hand(qty_on_hand: f64, unit_price: Option<f64>) -> Option<f64> {
    unit_price.filter(|p| *p > 0.0).map(|p| qty_on_hand * p)
}
