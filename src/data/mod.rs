//! Data module - survey loading, table access and schema descriptors

mod loader;
mod schema;
mod table;

pub use loader::{LoaderError, SurveyLoader};
pub use schema::{GapDirection, MetricFamily, NameMap, PairSpec, ResolvedPair};
pub use table::{RowGroup, SurveyTable, TableError};
