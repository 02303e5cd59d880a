//! Period Comparison Module
//! Joins one family's means from two survey waves on entity code.

use crate::data::{MetricFamily, SurveyTable};
use crate::stats::{desc_nan_last, AggregateError, PairedMetricAggregator};
use serde::Serialize;
use std::collections::HashMap;

/// One entity's mean in both waves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodChange {
    pub code: String,
    pub before: f64,
    pub after: f64,
    /// `after - before`
    pub change: f64,
    /// Change relative to `before`, in percent. Absent unless `before > 0`.
    pub pct_change: Option<f64>,
}

impl PeriodChange {
    fn new(code: String, before: f64, after: f64) -> Self {
        let change = after - before;
        let pct_change = (before > 0.0 && !change.is_nan()).then(|| change / before * 100.0);
        Self {
            code,
            before,
            after,
            change,
            pct_change,
        }
    }
}

/// Compare `family` between an earlier and a later table.
///
/// Only codes with a column in both tables are kept, in the earlier table's
/// column order.
pub fn compare_periods(
    before: &SurveyTable,
    after: &SurveyTable,
    family: &MetricFamily,
) -> Result<Vec<PeriodChange>, AggregateError> {
    let before_means = PairedMetricAggregator::family_means(before, family, None)?;
    let after_means: HashMap<String, f64> =
        PairedMetricAggregator::family_means(after, family, None)?
            .into_iter()
            .map(|m| (m.code, m.mean))
            .collect();

    Ok(before_means
        .into_iter()
        .filter_map(|m| {
            let after = *after_means.get(&m.code)?;
            Some(PeriodChange::new(m.code, m.mean, after))
        })
        .collect())
}

/// Sort by the later wave's value, highest first. Undefined values go last.
pub fn sort_by_latest(changes: &mut [PeriodChange]) {
    changes.sort_by(|a, b| desc_nan_last(a.after, b.after));
}
