//! Statistics Calculator Module
//! Descriptive statistics over survey columns with missing values removed.

use serde::Serialize;
use statrs::statistics::Statistics;

/// Summary of one column (or one group's slice of a column).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnSummary {
    /// Number of present values.
    pub count: usize,
    /// Arithmetic mean; NaN when `count == 0`.
    pub mean: f64,
    /// Sample standard deviation; NaN when `count < 2`.
    pub std: f64,
}

impl Default for ColumnSummary {
    fn default() -> Self {
        Self {
            count: 0,
            mean: f64::NAN,
            std: f64::NAN,
        }
    }
}

/// Handles statistical calculations over sparse survey columns.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Present values of `column`, optionally restricted to `rows`.
    pub fn present(column: &[Option<f64>], rows: Option<&[usize]>) -> Vec<f64> {
        match rows {
            Some(rows) => rows
                .iter()
                .filter_map(|&i| column.get(i).copied().flatten())
                .collect(),
            None => column.iter().filter_map(|v| *v).collect(),
        }
    }

    /// Mean of present values. An empty input yields NaN, never zero.
    pub fn mean(values: &[f64]) -> f64 {
        values.iter().mean()
    }

    /// Compute the summary for a set of present values.
    pub fn summarize(values: &[f64]) -> ColumnSummary {
        let count = values.len();
        if count == 0 {
            return ColumnSummary::default();
        }

        let std = if count > 1 {
            values.iter().std_dev()
        } else {
            f64::NAN
        };

        ColumnSummary {
            count,
            mean: Self::mean(values),
            std,
        }
    }

    /// Summarise a sparse column, optionally over a subset of rows.
    pub fn summarize_column(column: &[Option<f64>], rows: Option<&[usize]>) -> ColumnSummary {
        Self::summarize(&Self::present(column, rows))
    }

    /// Mean that skips NaN entries; NaN when nothing is left.
    pub fn nan_mean(values: &[f64]) -> f64 {
        let kept: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        Self::mean(&kept)
    }
}

/// Descending comparison that always places NaN last.
pub fn desc_nan_last(a: f64, b: f64) -> std::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}
