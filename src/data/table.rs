//! Survey Table Module
//! Read-only view over one loaded survey wave: schema listing, numeric
//! columns with missing values preserved, and respondent partitioning.

use polars::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Column not found: {0}")]
    MissingColumn(String),
    #[error("Column {column} cannot be read: {source}")]
    Unreadable {
        column: String,
        #[source]
        source: PolarsError,
    },
}

/// Respondents sharing one value of a grouping column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowGroup {
    pub label: String,
    pub rows: Vec<usize>,
}

/// One survey wave. Immutable after load.
#[derive(Debug, Clone)]
pub struct SurveyTable {
    df: DataFrame,
}

impl SurveyTable {
    pub fn new(df: DataFrame) -> Self {
        Self { df }
    }

    /// Column names in file order.
    pub fn columns(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.column(name).is_ok()
    }

    /// Columns starting with `prefix`, paired with the suffix left after
    /// stripping it. A column equal to the bare prefix is not a member.
    pub fn family_columns(&self, prefix: &str) -> Vec<(String, String)> {
        self.columns()
            .into_iter()
            .filter_map(|col| {
                let code = col.strip_prefix(prefix)?.to_string();
                (!code.is_empty()).then_some((col, code))
            })
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Column values as `f64`; null, unparseable and NaN cells are `None`.
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>, TableError> {
        let column = self
            .df
            .column(name)
            .map_err(|_| TableError::MissingColumn(name.to_string()))?;
        let unreadable = |source| TableError::Unreadable {
            column: name.to_string(),
            source,
        };

        let as_f64 = column.cast(&DataType::Float64).map_err(unreadable)?;
        let values = as_f64.f64().map_err(unreadable)?;

        Ok(values
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect())
    }

    /// Column values rendered as text labels; null cells are `None`.
    pub fn labels(&self, name: &str) -> Result<Vec<Option<String>>, TableError> {
        let column = self
            .df
            .column(name)
            .map_err(|_| TableError::MissingColumn(name.to_string()))?;
        let unreadable = |source| TableError::Unreadable {
            column: name.to_string(),
            source,
        };

        let as_str = column.cast(&DataType::String).map_err(unreadable)?;
        let values = as_str.str().map_err(unreadable)?;

        Ok(values
            .into_iter()
            .map(|v| {
                v.map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty() && s != "NaN")
            })
            .collect())
    }

    /// Partition row indices by the distinct values of `group_key`, in order
    /// of first appearance. Rows with a missing group value are dropped.
    pub fn partition(&self, group_key: &str) -> Result<Vec<RowGroup>, TableError> {
        let labels = self.labels(group_key)?;
        let mut groups: Vec<RowGroup> = Vec::new();

        for (row, label) in labels.into_iter().enumerate() {
            let Some(label) = label else {
                continue;
            };
            match groups.iter_mut().find(|g| g.label == label) {
                Some(group) => group.rows.push(row),
                None => groups.push(RowGroup {
                    label,
                    rows: vec![row],
                }),
            }
        }

        Ok(groups)
    }

    /// Get a reference to the underlying DataFrame.
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }
}
