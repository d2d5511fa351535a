use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::types::{CategoryShare, CategoryTotal};

/// Per-category totals and their percentage of the grand total.
/// A zero grand total gives every category 0%.
pub fn category_breakdown(totals: &[CategoryTotal]) -> BTreeMap<String, CategoryShare> {
    let mut merged: BTreeMap<String, Decimal> = BTreeMap::new();
    for t in totals {
        *merged.entry(t.category.clone()).or_default() += t.total;
    }
    let grand: Decimal = merged.values().copied().sum();

    merged
        .into_iter()
        .map(|(category, total)| {
            let percentage = if grand.is_zero() {
                0.0
            } else {
                total
                    .checked_div(grand)
                    .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                    .and_then(|pct| pct.to_f64())
                    .unwrap_or(0.0)
            };
            (category, CategoryShare { total, percentage })
        })
        .collect()
}
