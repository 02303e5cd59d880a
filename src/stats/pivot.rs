//! Pivot Module
//! Group x entity matrix of family means, as used for usage heatmaps.

use crate::stats::{desc_nan_last, FamilyMean, StatsCalculator};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pivot {
    pub groups: Vec<String>,
    pub entities: Vec<String>,
    /// `cells[g][e]` is the mean of entity `e` within group `g`; NaN if absent.
    pub cells: Vec<Vec<f64>>,
}

impl Pivot {
    /// Build from grouped family means. Rows without a group are ignored.
    pub fn from_means(means: &[FamilyMean]) -> Self {
        let mut groups: Vec<String> = Vec::new();
        let mut entities: Vec<String> = Vec::new();
        for m in means {
            let Some(group) = &m.group else {
                continue;
            };
            if !groups.contains(group) {
                groups.push(group.clone());
            }
            if !entities.contains(&m.code) {
                entities.push(m.code.clone());
            }
        }

        let mut cells = vec![vec![f64::NAN; entities.len()]; groups.len()];
        for m in means {
            let Some(group) = &m.group else {
                continue;
            };
            let g = groups.iter().position(|x| x == group);
            let e = entities.iter().position(|x| x == &m.code);
            if let (Some(g), Some(e)) = (g, e) {
                cells[g][e] = m.mean;
            }
        }

        Self {
            groups,
            entities,
            cells,
        }
    }

    /// Mean of each entity across groups, skipping undefined cells.
    pub fn entity_means(&self) -> Vec<f64> {
        (0..self.entities.len())
            .map(|e| {
                let column: Vec<f64> = self.cells.iter().map(|row| row[e]).collect();
                StatsCalculator::nan_mean(&column)
            })
            .collect()
    }

    /// Keep the `n` entities with the highest cross-group mean, highest first.
    pub fn top_entities(&self, n: usize) -> Pivot {
        let means = self.entity_means();
        let mut order: Vec<usize> = (0..self.entities.len()).collect();
        order.sort_by(|&a, &b| desc_nan_last(means[a], means[b]));
        order.truncate(n);

        Pivot {
            groups: self.groups.clone(),
            entities: order.iter().map(|&e| self.entities[e].clone()).collect(),
            cells: self
                .cells
                .iter()
                .map(|row| order.iter().map(|&e| row[e]).collect())
                .collect(),
        }
    }

    pub fn value(&self, group: &str, entity: &str) -> Option<f64> {
        let g = self.groups.iter().position(|x| x == group)?;
        let e = self.entities.iter().position(|x| x == entity)?;
        Some(self.cells[g][e])
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() || self.entities.is_empty()
    }
}
