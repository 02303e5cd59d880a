//! Stats module - aggregation, comparison and breakdowns over survey tables

mod aggregator;
mod breakdown;
mod calculator;
mod comparison;
mod pivot;
mod quadrant;

pub use aggregator::{
    sort_by_abs_gap, AggregateError, AggregateRow, FamilyMean, GroupedRows, PairedMetricAggregator,
};
pub use breakdown::{
    attribute_matrix, crosstab, distribution, rates, AttributeProfile, CrossTab, Labeled, Rate,
    Share,
};
pub use calculator::{desc_nan_last, ColumnSummary, StatsCalculator};
pub use comparison::{compare_periods, sort_by_latest, PeriodChange};
pub use pivot::Pivot;
pub use quadrant::{AdoptionQuadrant, PriorityQuadrant};
