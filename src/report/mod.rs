//! Report assembly and output.
//!
//! Analysis results are collected into a [`Report`] with display names and
//! quadrant labels attached, then written as:
//! - plain-text tables (`text`)
//! - pretty JSON (`writer`), undefined means serialised as `null`

mod text;
mod writer;

pub use writer::{to_json_string, write_report, OutputError, OutputFormat};

use crate::data::{NameMap, PairSpec};
use crate::stats::{
    AdoptionQuadrant, AggregateRow, AttributeProfile, CrossTab, FamilyMean, GroupedRows,
    PeriodChange, Pivot, PriorityQuadrant, Rate, Share,
};
use serde::Serialize;

/// Everything produced by one run. Sections that were not computed are
/// omitted from every output format.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub source: String,
    pub respondents: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gaps: Vec<GapSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualitySection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ownership: Option<Vec<Rate>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub distributions: Vec<DistributionSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crosstab: Option<CrosstabSection>,
}

impl Report {
    pub fn new(source: impl Into<String>, respondents: usize) -> Self {
        Self {
            source: source.into(),
            respondents,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapEntry {
    pub code: String,
    pub name: String,
    pub left_mean: f64,
    pub right_mean: f64,
    pub gap: f64,
    pub left_count: usize,
    pub right_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quadrant: Option<PriorityQuadrant>,
}

/// Paired-family results for one declared pair.
#[derive(Debug, Clone, Serialize)]
pub struct GapSection {
    pub pair: String,
    pub left_label: String,
    pub right_label: String,
    pub entries: Vec<GapEntry>,
    /// Grouping column used for `groups`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_column: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupedRows>,
}

impl GapSection {
    pub fn new(pair: &PairSpec, rows: &[AggregateRow], names: &NameMap) -> Self {
        let entries = rows
            .iter()
            .map(|r| GapEntry {
                code: r.code.clone(),
                name: names.display(&r.code).to_string(),
                left_mean: r.left_mean,
                right_mean: r.right_mean,
                gap: r.gap,
                left_count: r.left_count,
                right_count: r.right_count,
                quadrant: PriorityQuadrant::classify(r, pair.midpoint),
            })
            .collect();

        Self {
            pair: pair.name.clone(),
            left_label: pair.left.display_label().to_string(),
            right_label: pair.right.display_label().to_string(),
            entries,
            group_column: None,
            groups: Vec::new(),
        }
    }

    pub fn with_groups(mut self, column: impl Into<String>, groups: Vec<GroupedRows>) -> Self {
        self.group_column = Some(column.into());
        self.groups = groups;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageEntry {
    pub code: String,
    pub name: String,
    pub mean: f64,
    pub count: usize,
}

/// Single-family means overall, plus the group pivot when a grouping column
/// was available.
#[derive(Debug, Clone, Serialize)]
pub struct UsageSection {
    pub family: String,
    pub entries: Vec<UsageEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivot: Option<Pivot>,
}

impl UsageSection {
    pub fn new(family: impl Into<String>, means: &[FamilyMean], names: &NameMap) -> Self {
        Self {
            family: family.into(),
            entries: means
                .iter()
                .map(|m| UsageEntry {
                    code: m.code.clone(),
                    name: names.display(&m.code).to_string(),
                    mean: m.mean,
                    count: m.count,
                })
                .collect(),
            group_column: None,
            pivot: None,
        }
    }

    pub fn with_pivot(mut self, column: impl Into<String>, pivot: Pivot) -> Self {
        self.group_column = Some(column.into());
        self.pivot = Some(pivot);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEntry {
    pub code: String,
    pub name: String,
    pub before: f64,
    pub after: f64,
    pub change: f64,
    pub pct_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quadrant: Option<AdoptionQuadrant>,
}

/// One family compared across two survey waves.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonSection {
    pub family: String,
    pub before_label: String,
    pub after_label: String,
    pub entries: Vec<ChangeEntry>,
}

impl ComparisonSection {
    pub fn new(
        family: impl Into<String>,
        before_label: impl Into<String>,
        after_label: impl Into<String>,
        changes: &[PeriodChange],
        names: &NameMap,
        scale_max: f64,
        midpoint: f64,
    ) -> Self {
        Self {
            family: family.into(),
            before_label: before_label.into(),
            after_label: after_label.into(),
            entries: changes
                .iter()
                .map(|c| ChangeEntry {
                    code: c.code.clone(),
                    name: names.display(&c.code).to_string(),
                    before: c.before,
                    after: c.after,
                    change: c.change,
                    pct_change: c.pct_change,
                    quadrant: AdoptionQuadrant::classify(c, scale_max, midpoint),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QualitySection {
    pub attributes: Vec<String>,
    pub profiles: Vec<AttributeProfile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionSection {
    pub column: String,
    pub title: String,
    pub shares: Vec<Share>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrosstabSection {
    pub rows: String,
    pub columns: String,
    pub table: CrossTab,
}
