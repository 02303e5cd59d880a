//! Paired Metric Aggregator
//! Averages two declared metric families per entity code and derives the
//! signed gap between them, overall or per respondent group.

use crate::data::{MetricFamily, PairSpec, ResolvedPair, RowGroup, SurveyTable, TableError};
use crate::stats::StatsCalculator;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Column not found: {0}")]
    MissingColumn(String),
    #[error(transparent)]
    Table(TableError),
}

impl From<TableError> for AggregateError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::MissingColumn(name) => AggregateError::MissingColumn(name),
            other => AggregateError::Table(other),
        }
    }
}

/// One entity's paired means.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub code: String,
    pub left_mean: f64,
    pub right_mean: f64,
    /// Signed difference in the pair's declared direction.
    pub gap: f64,
    pub left_count: usize,
    pub right_count: usize,
}

impl AggregateRow {
    /// Both means are defined.
    pub fn is_complete(&self) -> bool {
        !self.left_mean.is_nan() && !self.right_mean.is_nan()
    }
}

/// Aggregate rows for one respondent group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedRows {
    pub group: String,
    pub respondents: usize,
    pub rows: Vec<AggregateRow>,
}

/// Mean of a single family column, optionally within one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilyMean {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub code: String,
    pub mean: f64,
    pub count: usize,
}

/// Sort rows by absolute gap, largest first. Undefined gaps go last.
pub fn sort_by_abs_gap(rows: &mut [AggregateRow]) {
    rows.sort_by(|a, b| crate::stats::desc_nan_last(a.gap.abs(), b.gap.abs()));
}

pub struct PairedMetricAggregator;

impl PairedMetricAggregator {
    /// One row per entity code with both columns present in `table`.
    ///
    /// An empty table or a pair matching no columns yields an empty result.
    pub fn aggregate(
        table: &SurveyTable,
        pair: &PairSpec,
    ) -> Result<Vec<AggregateRow>, AggregateError> {
        if table.is_empty() {
            return Ok(Vec::new());
        }
        let resolved = pair.resolve(table);
        debug!(
            "Pair {}: {} entities matched across {} and {}",
            pair.name,
            resolved.len(),
            pair.left.prefix,
            pair.right.prefix
        );

        let columns = Self::load_columns(table, &resolved)?;
        Ok(Self::rows_for(pair, &resolved, &columns, None))
    }

    /// Per-group rows, groups in first-appearance order of `group_key`.
    ///
    /// A missing `group_key` column is an error so the caller can report it
    /// and skip the dependent output.
    pub fn aggregate_grouped(
        table: &SurveyTable,
        pair: &PairSpec,
        group_key: &str,
    ) -> Result<Vec<GroupedRows>, AggregateError> {
        if !table.has_column(group_key) {
            return Err(AggregateError::MissingColumn(group_key.to_string()));
        }
        if table.is_empty() {
            return Ok(Vec::new());
        }

        let groups = table.partition(group_key)?;
        let resolved = pair.resolve(table);
        let columns = Self::load_columns(table, &resolved)?;

        // Order-preserving collect keeps groups in first-appearance order
        Ok(groups
            .par_iter()
            .map(|group| GroupedRows {
                group: group.label.clone(),
                respondents: group.rows.len(),
                rows: Self::rows_for(pair, &resolved, &columns, Some(group)),
            })
            .collect())
    }

    /// Mean of every column in `family`, overall or per group.
    pub fn family_means(
        table: &SurveyTable,
        family: &MetricFamily,
        group_key: Option<&str>,
    ) -> Result<Vec<FamilyMean>, AggregateError> {
        if let Some(key) = group_key {
            if !table.has_column(key) {
                return Err(AggregateError::MissingColumn(key.to_string()));
            }
        }
        if table.is_empty() {
            return Ok(Vec::new());
        }

        let mut columns = Vec::new();
        for (column, code) in table.family_columns(&family.prefix) {
            columns.push((code, table.numeric(&column)?));
        }

        let Some(key) = group_key else {
            return Ok(columns
                .iter()
                .map(|(code, values)| {
                    let summary = StatsCalculator::summarize_column(values, None);
                    FamilyMean {
                        group: None,
                        code: code.clone(),
                        mean: summary.mean,
                        count: summary.count,
                    }
                })
                .collect());
        };

        let groups = table.partition(key)?;
        Ok(groups
            .par_iter()
            .flat_map_iter(|group| {
                columns.iter().map(move |(code, values)| {
                    let summary = StatsCalculator::summarize_column(values, Some(&group.rows));
                    FamilyMean {
                        group: Some(group.label.clone()),
                        code: code.clone(),
                        mean: summary.mean,
                        count: summary.count,
                    }
                })
            })
            .collect())
    }

    fn load_columns(
        table: &SurveyTable,
        resolved: &[ResolvedPair],
    ) -> Result<Vec<(Vec<Option<f64>>, Vec<Option<f64>>)>, AggregateError> {
        resolved
            .iter()
            .map(|p| -> Result<_, AggregateError> {
                Ok((table.numeric(&p.left_column)?, table.numeric(&p.right_column)?))
            })
            .collect()
    }

    fn rows_for(
        pair: &PairSpec,
        resolved: &[ResolvedPair],
        columns: &[(Vec<Option<f64>>, Vec<Option<f64>>)],
        group: Option<&RowGroup>,
    ) -> Vec<AggregateRow> {
        let rows = group.map(|g| g.rows.as_slice());
        resolved
            .iter()
            .zip(columns)
            .map(|(p, (left, right))| {
                let left = StatsCalculator::summarize_column(left, rows);
                let right = StatsCalculator::summarize_column(right, rows);
                AggregateRow {
                    code: p.code.clone(),
                    left_mean: left.mean,
                    right_mean: right.mean,
                    gap: pair.gap.apply(left.mean, right.mean),
                    left_count: left.count,
                    right_count: right.count,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GapDirection;
    use polars::prelude::*;

    fn imp_ds() -> PairSpec {
        PairSpec::new(
            "importance-satisfaction",
            MetricFamily::new("IMP_", "importance"),
            MetricFamily::new("DS_", "satisfaction"),
        )
    }

    #[test]
    fn test_balanced_pair_has_zero_gap() {
        let table = SurveyTable::new(df!("IMP_A" => [4.0, 2.0], "DS_A" => [2.0, 4.0]).unwrap());
        let rows = PairedMetricAggregator::aggregate(&table, &imp_ds()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].code, "A");
        assert!((rows[0].left_mean - 3.0).abs() < 1e-9);
        assert!((rows[0].right_mean - 3.0).abs() < 1e-9);
        assert!(rows[0].gap.abs() < 1e-9);
    }

    #[test]
    fn test_unpaired_code_is_dropped() {
        let table = SurveyTable::new(df!("IMP_A" => [5.0], "DS_B" => [1.0]).unwrap());
        let rows = PairedMetricAggregator::aggregate(&table, &imp_ds()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_single_row_means_equal_row_values() {
        let table = SurveyTable::new(
            df!("IMP_A" => [5.0], "DS_A" => [1.0], "IMP_B" => [2.0], "DS_B" => [4.5]).unwrap(),
        );
        let rows = PairedMetricAggregator::aggregate(&table, &imp_ds()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].left_mean, rows[0].right_mean), (5.0, 1.0));
        assert_eq!((rows[1].left_mean, rows[1].right_mean), (2.0, 4.5));
        assert_eq!(rows[1].gap, -2.5);
    }

    #[test]
    fn test_all_missing_column_is_nan_not_zero() {
        let table = SurveyTable::new(
            df!("IMP_A" => [Some(4.0), Some(5.0)], "DS_A" => [None::<f64>, None]).unwrap(),
        );
        let rows = PairedMetricAggregator::aggregate(&table, &imp_ds()).unwrap();

        assert_eq!(rows.len(), 1);
        assert!(rows[0].right_mean.is_nan());
        assert!(rows[0].gap.is_nan());
        assert_eq!(rows[0].right_count, 0);
        assert!(!rows[0].is_complete());
    }

    #[test]
    fn test_declared_direction_flips_gap() {
        let table = SurveyTable::new(df!("SKL_CMS" => [4.0], "LRN_CMS" => [2.0]).unwrap());
        let pair = PairSpec::new(
            "skills",
            MetricFamily::new("SKL_", "skill"),
            MetricFamily::new("LRN_", "interest"),
        )
        .with_gap(GapDirection::RightMinusLeft);

        let rows = PairedMetricAggregator::aggregate(&table, &pair).unwrap();
        assert_eq!(rows[0].gap, -2.0);
    }

    #[test]
    fn test_grouped_family_means() {
        let table = SurveyTable::new(
            df!("USE_X" => [2.0, 4.0, 1.0], "DIV" => ["S", "S", "T"]).unwrap(),
        );
        let means = PairedMetricAggregator::family_means(
            &table,
            &MetricFamily::new("USE_", "usage"),
            Some("DIV"),
        )
        .unwrap();

        assert_eq!(means.len(), 2);
        assert_eq!(means[0].group.as_deref(), Some("S"));
        assert!((means[0].mean - 3.0).abs() < 1e-9);
        assert_eq!(means[1].group.as_deref(), Some("T"));
        assert!((means[1].mean - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_grouped_pairs() {
        let table = SurveyTable::new(
            df!(
                "IMP_A" => [5.0, 3.0, 1.0],
                "DS_A" => [1.0, 1.0, 2.0],
                "TEN" => ["Tenured", "Tenured", "Track"],
            )
            .unwrap(),
        );
        let grouped = PairedMetricAggregator::aggregate_grouped(&table, &imp_ds(), "TEN").unwrap();

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].group, "Tenured");
        assert_eq!(grouped[0].respondents, 2);
        assert_eq!(grouped[0].rows[0].gap, 3.0);
        assert_eq!(grouped[1].rows[0].gap, -1.0);
    }

    #[test]
    fn test_missing_group_key_is_error() {
        let table = SurveyTable::new(df!("IMP_A" => [5.0], "DS_A" => [1.0]).unwrap());
        let err = PairedMetricAggregator::aggregate_grouped(&table, &imp_ds(), "ADIV").unwrap_err();
        assert!(matches!(err, AggregateError::MissingColumn(c) if c == "ADIV"));
    }

    #[test]
    fn test_empty_table_yields_empty_result() {
        let table = SurveyTable::new(
            df!("IMP_A" => Vec::<f64>::new(), "DS_A" => Vec::<f64>::new()).unwrap(),
        );
        assert!(PairedMetricAggregator::aggregate(&table, &imp_ds())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_sort_by_abs_gap_puts_undefined_last() {
        let row = |code: &str, gap: f64| AggregateRow {
            code: code.to_string(),
            left_mean: 0.0,
            right_mean: 0.0,
            gap,
            left_count: 1,
            right_count: 1,
        };
        let mut rows = vec![row("a", 0.5), row("b", f64::NAN), row("c", -1.5)];
        sort_by_abs_gap(&mut rows);

        let order: Vec<&str> = rows.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }
}
