//! Schema Descriptor Module
//! Declared metric families and family pairs, resolved against the columns a
//! survey table actually carries.

use crate::data::SurveyTable;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Columns sharing a prefix, one per entity code (`IMP_CMS`, `IMP_VPN`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricFamily {
    pub prefix: String,
    /// Human label for this family's values ("importance", "skill").
    #[serde(default)]
    pub label: String,
}

impl MetricFamily {
    pub fn new(prefix: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            label: label.into(),
        }
    }

    pub fn column(&self, code: &str) -> String {
        format!("{}{}", self.prefix, code)
    }

    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.prefix
        } else {
            &self.label
        }
    }
}

/// Sign convention of a pair's gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GapDirection {
    /// `gap = left - right` (importance minus satisfaction)
    #[default]
    LeftMinusRight,
    /// `gap = right - left` (learning interest minus skill)
    RightMinusLeft,
}

impl GapDirection {
    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            GapDirection::LeftMinusRight => left - right,
            GapDirection::RightMinusLeft => right - left,
        }
    }
}

fn default_midpoint() -> f64 {
    3.0
}

/// A declared pair of metric families.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSpec {
    pub name: String,
    pub left: MetricFamily,
    pub right: MetricFamily,
    #[serde(default)]
    pub gap: GapDirection,
    /// Entity codes to consider. When absent, codes are discovered from the
    /// left family's columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<String>>,
    /// Rating treated as the centre line when classifying rows.
    #[serde(default = "default_midpoint")]
    pub midpoint: f64,
}

impl PairSpec {
    pub fn new(name: impl Into<String>, left: MetricFamily, right: MetricFamily) -> Self {
        Self {
            name: name.into(),
            left,
            right,
            gap: GapDirection::default(),
            entities: None,
            midpoint: default_midpoint(),
        }
    }

    pub fn with_gap(mut self, gap: GapDirection) -> Self {
        self.gap = gap;
        self
    }

    pub fn with_entities<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities = Some(entities.into_iter().map(Into::into).collect());
        self
    }

    /// Entity codes present in both families of `table`, in left-family
    /// column order (or declared order when entities are listed).
    pub fn resolve(&self, table: &SurveyTable) -> Vec<ResolvedPair> {
        let candidates: Vec<String> = match &self.entities {
            Some(codes) => codes
                .iter()
                .filter(|code| table.has_column(&self.left.column(code)))
                .cloned()
                .collect(),
            None => table
                .family_columns(&self.left.prefix)
                .into_iter()
                .map(|(_, code)| code)
                .collect(),
        };

        candidates
            .into_iter()
            .filter_map(|code| {
                let right_column = self.right.column(&code);
                if !table.has_column(&right_column) {
                    debug!(
                        "Pair {}: dropping {} (no {} column)",
                        self.name, code, right_column
                    );
                    return None;
                }
                Some(ResolvedPair {
                    left_column: self.left.column(&code),
                    right_column,
                    code,
                })
            })
            .collect()
    }
}

/// One entity code with both of its columns present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPair {
    pub code: String,
    pub left_column: String,
    pub right_column: String,
}

/// Entity code -> display name. Unmapped codes display as themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameMap(HashMap<String, String>);

impl NameMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: impl Into<String>, name: impl Into<String>) {
        self.0.insert(code.into(), name.into());
    }

    pub fn display<'a>(&'a self, code: &'a str) -> &'a str {
        self.0.get(code).map(String::as_str).unwrap_or(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NameMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn table() -> SurveyTable {
        SurveyTable::new(
            df!(
                "IMP_A" => [4.0],
                "DS_A" => [2.0],
                "IMP_B" => [5.0],
                "DS_C" => [1.0],
                "IMP_C" => [3.0],
            )
            .unwrap(),
        )
    }

    fn imp_ds() -> PairSpec {
        PairSpec::new(
            "importance-satisfaction",
            MetricFamily::new("IMP_", "importance"),
            MetricFamily::new("DS_", "satisfaction"),
        )
    }

    #[test]
    fn test_resolve_is_inner_join_in_left_order() {
        let codes: Vec<String> = imp_ds()
            .resolve(&table())
            .into_iter()
            .map(|p| p.code)
            .collect();
        assert_eq!(codes, vec!["A", "C"]);
    }

    #[test]
    fn test_declared_entities_still_require_both_columns() {
        let spec = imp_ds().with_entities(["C", "B", "Z"]);
        let resolved = spec.resolve(&table());

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].code, "C");
        assert_eq!(resolved[0].left_column, "IMP_C");
        assert_eq!(resolved[0].right_column, "DS_C");
    }

    #[test]
    fn test_gap_direction() {
        assert_eq!(GapDirection::LeftMinusRight.apply(4.0, 1.5), 2.5);
        assert_eq!(GapDirection::RightMinusLeft.apply(4.0, 1.5), -2.5);
        assert!(GapDirection::LeftMinusRight.apply(f64::NAN, 1.0).is_nan());
    }

    #[test]
    fn test_name_map_falls_back_to_code() {
        let names: NameMap = [("CMS", "Content Management System")].into_iter().collect();
        assert_eq!(names.display("CMS"), "Content Management System");
        assert_eq!(names.display("XYZ"), "XYZ");
    }

    #[test]
    fn test_gap_direction_serde_names() {
        let spec: PairSpec = toml::from_str(
            r#"
name = "skills"
gap = "right-minus-left"
left = { prefix = "SKL_", label = "skill" }
right = { prefix = "LRN_", label = "learning interest" }
"#,
        )
        .unwrap();
        assert_eq!(spec.gap, GapDirection::RightMinusLeft);
        assert_eq!(spec.midpoint, 3.0);
        assert!(spec.entities.is_none());
    }
}
