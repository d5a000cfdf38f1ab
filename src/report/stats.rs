use serde::Serialize;
use std::collections::BTreeMap;

use crate::database::models::DataRow;

/// Value in the activation column that counts as activated.
pub const ACTIVATED_VALUE: &str = "Yes";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount {
    /// `None` groups rows where the column is empty.
    pub value: Option<String>,
    pub count: usize,
}

/// Share of rows whose activation column reads `Yes`, with a per-value breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivationStats {
    pub column: String,
    /// Percentage in `0.0..=100.0`, rounded to two decimals.
    pub rate: f64,
    pub activated: usize,
    pub total: usize,
    /// Most frequent value first; ties ordered by value with empties last.
    pub breakdown: Vec<ValueCount>,
}

impl ActivationStats {
    pub fn compute(rows: &[DataRow], column: &str) -> Self {
        let mut counts: BTreeMap<Option<&str>, usize> = BTreeMap::new();
        for row in rows {
            let value = row.get(column).map(str::trim).filter(|v| !v.is_empty());
            *counts.entry(value).or_default() += 1;
        }

        let activated = counts.get(&Some(ACTIVATED_VALUE)).copied().unwrap_or(0);
        let total = rows.len();
        let rate = if total == 0 {
            0.0
        } else {
            (activated as f64 * 10_000.0 / total as f64).round() / 100.0
        };

        let mut breakdown: Vec<ValueCount> = counts
            .into_iter()
            .map(|(value, count)| ValueCount {
                value: value.map(str::to_string),
                count,
            })
            .collect();
        breakdown.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.value.is_none().cmp(&b.value.is_none()))
                .then_with(|| a.value.cmp(&b.value))
        });

        Self {
            column: column.to_string(),
            rate,
            activated,
            total,
            breakdown,
        }
    }
}
