//! Survey Insights - analysis of survey CSV exports.
//!
//! Matches paired metric families (importance/satisfaction, skill/learning
//! interest) by entity code, averages them overall or per respondent group,
//! and compares one family across two survey waves.

pub mod charts;
pub mod config;
pub mod data;
pub mod report;
pub mod stats;

pub use config::{Config, ConfigError};
pub use data::{GapDirection, MetricFamily, NameMap, PairSpec, SurveyLoader, SurveyTable};
pub use stats::{compare_periods, AggregateRow, PairedMetricAggregator, PeriodChange};
