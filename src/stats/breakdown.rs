//! Breakdown Module
//! Single-table breakdowns that are not family pairs: subject x attribute
//! rating profiles, ownership rates, response distributions and
//! cross-tabulations of two categorical columns.

use crate::data::SurveyTable;
use crate::stats::{AggregateError, StatsCalculator};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A code with a display label (`DAHD_` / "Help Desk Staff", `F` / "Friendly").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labeled {
    pub code: String,
    pub label: String,
}

impl Labeled {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeProfile {
    pub subject: String,
    /// `(attribute label, mean)`, in attribute order. NaN when no column.
    pub values: Vec<(String, f64)>,
}

/// Rating profile per subject.
///
/// Each cell reads `subject.code + attribute.code`; when that column is
/// absent the bare `subject.code` column is used instead. Subjects with no
/// column for any attribute are left out.
pub fn attribute_matrix(
    table: &SurveyTable,
    subjects: &[Labeled],
    attributes: &[Labeled],
) -> Result<Vec<AttributeProfile>, AggregateError> {
    let mut profiles = Vec::new();

    for subject in subjects {
        let mut has_data = false;
        let mut values = Vec::with_capacity(attributes.len());

        for attribute in attributes {
            let column = format!("{}{}", subject.code, attribute.code);
            let source = if table.has_column(&column) {
                Some(column)
            } else if table.has_column(&subject.code) {
                Some(subject.code.clone())
            } else {
                None
            };

            let mean = match source {
                Some(column) => {
                    has_data = true;
                    StatsCalculator::summarize_column(&table.numeric(&column)?, None).mean
                }
                None => f64::NAN,
            };
            values.push((attribute.label.clone(), mean));
        }

        if has_data {
            profiles.push(AttributeProfile {
                subject: subject.label.clone(),
                values,
            });
        } else {
            debug!("No rating columns for {}", subject.code);
        }
    }

    Ok(profiles)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rate {
    pub label: String,
    /// Mean of a 0/1 column times 100.
    pub percent: f64,
    pub count: usize,
}

/// Share of respondents answering 1 in each binary column.
pub fn rates(table: &SurveyTable, columns: &[Labeled]) -> Result<Vec<Rate>, AggregateError> {
    columns
        .iter()
        .map(|c| -> Result<Rate, AggregateError> {
            let summary = StatsCalculator::summarize_column(&table.numeric(&c.code)?, None);
            Ok(Rate {
                label: c.label.clone(),
                percent: summary.mean * 100.0,
                count: summary.count,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share {
    pub label: String,
    pub count: usize,
    /// Fraction of counted responses, 0-1.
    pub share: f64,
}

/// Share of responses per category of `column`.
///
/// Categories are matched against the cell text (`"1"`, `"2"`, ...; numeric
/// cells like `1.0` match `"1"`). Responses outside the listed categories
/// are not counted.
pub fn distribution(
    table: &SurveyTable,
    column: &str,
    categories: &[Labeled],
) -> Result<Vec<Share>, AggregateError> {
    let values = table.labels(column)?;
    let mut counts = vec![0usize; categories.len()];

    for value in values.iter().flatten() {
        let key = normalize_category(value);
        if let Some(i) = categories.iter().position(|c| c.code == key) {
            counts[i] += 1;
        }
    }

    let total: usize = counts.iter().sum();
    Ok(categories
        .iter()
        .zip(counts)
        .map(|(c, count)| Share {
            label: c.label.clone(),
            count,
            share: if total == 0 {
                f64::NAN
            } else {
                count as f64 / total as f64
            },
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTab {
    pub row_labels: Vec<String>,
    pub column_labels: Vec<String>,
    pub counts: Vec<Vec<usize>>,
    pub total: usize,
}

impl CrossTab {
    /// Fraction of the counted total in a cell; NaN for an empty table.
    pub fn share(&self, row: usize, column: usize) -> f64 {
        if self.total == 0 {
            return f64::NAN;
        }
        self.counts[row][column] as f64 / self.total as f64
    }
}

/// Count respondents for every (row category, column category) combination.
/// Respondents missing either value, or outside the categories, are skipped.
pub fn crosstab(
    table: &SurveyTable,
    row_column: &str,
    row_categories: &[Labeled],
    column_column: &str,
    column_categories: &[Labeled],
) -> Result<CrossTab, AggregateError> {
    let rows = table.labels(row_column)?;
    let columns = table.labels(column_column)?;
    let mut counts = vec![vec![0usize; column_categories.len()]; row_categories.len()];
    let mut total = 0;

    for (r, c) in rows.iter().zip(&columns) {
        let (Some(r), Some(c)) = (r, c) else {
            continue;
        };
        let r = normalize_category(r);
        let c = normalize_category(c);
        let ri = row_categories.iter().position(|x| x.code == r);
        let ci = column_categories.iter().position(|x| x.code == c);
        if let (Some(ri), Some(ci)) = (ri, ci) {
            counts[ri][ci] += 1;
            total += 1;
        }
    }

    Ok(CrossTab {
        row_labels: row_categories.iter().map(|c| c.label.clone()).collect(),
        column_labels: column_categories.iter().map(|c| c.label.clone()).collect(),
        counts,
        total,
    })
}

/// `"2.0"` -> `"2"` so float-typed category columns match integer codes.
fn normalize_category(value: &str) -> String {
    match value.strip_suffix(".0") {
        Some(int) if !int.is_empty() && int.chars().all(|c| c.is_ascii_digit() || c == '-') => {
            int.to_string()
        }
        _ => value.to_string(),
    }
}
