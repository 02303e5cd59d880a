//! Quadrant Classification
//! Places paired means and period changes into the four action quadrants.

use crate::stats::{AggregateRow, PeriodChange};
use serde::Serialize;
use std::fmt;

/// Importance (left) against satisfaction (right) around a midpoint rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriorityQuadrant {
    /// Important, under-served
    ConcentrateHere,
    /// Important, well served
    KeepUpTheGoodWork,
    /// Unimportant, under-served
    LowPriority,
    /// Unimportant, well served
    PossibleOverkill,
}

impl PriorityQuadrant {
    /// `None` when either mean is undefined.
    pub fn classify(row: &AggregateRow, midpoint: f64) -> Option<Self> {
        if !row.is_complete() {
            return None;
        }
        let important = row.left_mean >= midpoint;
        let satisfied = row.right_mean >= midpoint;
        Some(match (important, satisfied) {
            (true, false) => PriorityQuadrant::ConcentrateHere,
            (true, true) => PriorityQuadrant::KeepUpTheGoodWork,
            (false, false) => PriorityQuadrant::LowPriority,
            (false, true) => PriorityQuadrant::PossibleOverkill,
        })
    }
}

impl fmt::Display for PriorityQuadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PriorityQuadrant::ConcentrateHere => "Concentrate here",
            PriorityQuadrant::KeepUpTheGoodWork => "Keep up the good work",
            PriorityQuadrant::LowPriority => "Low priority",
            PriorityQuadrant::PossibleOverkill => "Possible overkill",
        };
        f.write_str(label)
    }
}

/// Usage in the earlier wave against the later wave, both normalised to 0-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdoptionQuadrant {
    CoreGrowth,
    Emerging,
    LegacyReliance,
    SunsetCandidate,
}

impl AdoptionQuadrant {
    /// `scale_max` maps ratings onto 0-1 (5 for a 1-5 scale); `midpoint` is
    /// applied to the normalised values.
    pub fn classify(change: &PeriodChange, scale_max: f64, midpoint: f64) -> Option<Self> {
        if change.before.is_nan() || change.after.is_nan() || scale_max <= 0.0 {
            return None;
        }
        let was_high = change.before / scale_max >= midpoint;
        let is_high = change.after / scale_max >= midpoint;
        Some(match (was_high, is_high) {
            (true, true) => AdoptionQuadrant::CoreGrowth,
            (false, true) => AdoptionQuadrant::Emerging,
            (true, false) => AdoptionQuadrant::LegacyReliance,
            (false, false) => AdoptionQuadrant::SunsetCandidate,
        })
    }
}

impl fmt::Display for AdoptionQuadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AdoptionQuadrant::CoreGrowth => "Core growth",
            AdoptionQuadrant::Emerging => "Emerging",
            AdoptionQuadrant::LegacyReliance => "Legacy reliance",
            AdoptionQuadrant::SunsetCandidate => "Sunset candidate",
        };
        f.write_str(label)
    }
}
