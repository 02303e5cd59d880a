//! Configuration file handling.
//!
//! Loads `survey-insights.toml`: input tables, the declared family pairs,
//! grouping columns, the chart palette and the code -> name maps.

use crate::charts::Palette;
use crate::data::{GapDirection, MetricFamily, NameMap, PairSpec};
use crate::stats::Labeled;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "survey-insights.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Failed to serialize config")]
    Serialize(#[from] toml::ser::Error),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub palette: Palette,

    #[serde(default)]
    pub charts: ChartConfig,

    /// Grouping name -> column (`division = "ADIV"`).
    #[serde(default = "default_groups")]
    pub groups: BTreeMap<String, String>,

    #[serde(default)]
    pub usage: UsageConfig,

    #[serde(default)]
    pub quality: QualityConfig,

    #[serde(default)]
    pub ownership: OwnershipConfig,

    #[serde(default)]
    pub crosstab: CrosstabConfig,

    #[serde(default = "default_pairs")]
    pub pairs: Vec<PairSpec>,

    #[serde(default = "default_distributions")]
    pub distributions: Vec<DistributionConfig>,

    /// Entity code -> display name, shared by every analysis.
    #[serde(default = "default_names")]
    pub names: NameMap,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            palette: Palette::default(),
            charts: ChartConfig::default(),
            groups: default_groups(),
            usage: UsageConfig::default(),
            quality: QualityConfig::default(),
            ownership: OwnershipConfig::default(),
            crosstab: CrosstabConfig::default(),
            pairs: default_pairs(),
            distributions: default_distributions(),
            names: default_names(),
        }
    }
}

/// Survey tables and the labels used for each wave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_current")]
    pub current: PathBuf,

    /// Earlier wave; enables period comparison.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<PathBuf>,

    #[serde(default = "default_current_label")]
    pub current_label: String,

    #[serde(default = "default_baseline_label")]
    pub baseline_label: String,

    /// Highest rating on the survey's scale.
    #[serde(default = "default_scale_max")]
    pub scale_max: f64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            current: default_current(),
            baseline: None,
            current_label: default_current_label(),
            baseline_label: default_baseline_label(),
            scale_max: default_scale_max(),
        }
    }
}

fn default_current() -> PathBuf {
    PathBuf::from("cleaned_c24.csv")
}

fn default_current_label() -> String {
    "2024".to_string()
}

fn default_baseline_label() -> String {
    "2018".to_string()
}

fn default_scale_max() -> f64 {
    5.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

fn default_width() -> u32 {
    1200
}

fn default_height() -> u32 {
    800
}

fn default_groups() -> BTreeMap<String, String> {
    BTreeMap::from([("division".to_string(), "ADIV".to_string())])
}

/// Single-family usage analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    #[serde(default = "default_usage_family")]
    pub family: MetricFamily,

    /// Grouping (name from `[groups]`) used for the pivot.
    #[serde(default = "default_usage_group")]
    pub group: String,

    /// Entities kept in the pivot, ranked by mean usage.
    #[serde(default = "default_top")]
    pub top: usize,

    /// Normalised usage separating high from low adoption.
    #[serde(default = "default_adoption_midpoint")]
    pub adoption_midpoint: f64,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            family: default_usage_family(),
            group: default_usage_group(),
            top: default_top(),
            adoption_midpoint: default_adoption_midpoint(),
        }
    }
}

fn default_usage_family() -> MetricFamily {
    MetricFamily::new("USE_", "Usage")
}

fn default_usage_group() -> String {
    "division".to_string()
}

fn default_top() -> usize {
    10
}

fn default_adoption_midpoint() -> f64 {
    0.5
}

/// Staff-quality attribute matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    #[serde(default = "default_subjects")]
    pub subjects: Vec<Labeled>,

    #[serde(default = "default_attributes")]
    pub attributes: Vec<Labeled>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            subjects: default_subjects(),
            attributes: default_attributes(),
        }
    }
}

fn default_subjects() -> Vec<Labeled> {
    vec![
        Labeled::new("DAHD_", "Help Desk Staff"),
        Labeled::new("DAERPS_", "ERP System Support Staff"),
        Labeled::new("DAIT_", "Instructional Technology Staff"),
        Labeled::new("DAMMS_", "Multimedia Services Staff"),
    ]
}

fn default_attributes() -> Vec<Labeled> {
    vec![
        Labeled::new("F", "Friendly"),
        Labeled::new("K", "Knowledgeable"),
        Labeled::new("RL", "Reliable"),
        Labeled::new("RS", "Responsive"),
    ]
}

/// Binary ownership columns reported as rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipConfig {
    #[serde(default = "default_ownership")]
    pub columns: Vec<Labeled>,
}

impl Default for OwnershipConfig {
    fn default() -> Self {
        Self {
            columns: default_ownership(),
        }
    }
}

fn default_ownership() -> Vec<Labeled> {
    vec![
        Labeled::new("OWN_LC", "Laptop Computer"),
        Labeled::new("OWN_PDA", "Smart Phone"),
    ]
}

/// A categorical column and its answer codes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionConfig {
    pub column: String,

    #[serde(default)]
    pub title: String,

    pub categories: Vec<Labeled>,
}

fn scale(labels: [&str; 5]) -> Vec<Labeled> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| Labeled::new((i + 1).to_string(), *label))
        .collect()
}

fn default_distributions() -> Vec<DistributionConfig> {
    vec![
        DistributionConfig {
            column: "TREM".to_string(),
            title: "Teaching Modality".to_string(),
            categories: scale([
                "Entirely in-person",
                "Mostly in-person",
                "Equal mix",
                "Mostly remote",
                "Entirely remote",
            ]),
        },
        DistributionConfig {
            column: "TLIVE".to_string(),
            title: "Live vs Recorded Instruction".to_string(),
            categories: scale([
                "Entirely live",
                "Mostly live",
                "Equal mix",
                "Mostly recorded",
                "Entirely recorded",
            ]),
        },
    ]
}

/// Two categorical columns; categories come from `[[distributions]]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrosstabConfig {
    #[serde(default = "default_crosstab_rows")]
    pub rows: String,

    #[serde(default = "default_crosstab_columns")]
    pub columns: String,
}

impl Default for CrosstabConfig {
    fn default() -> Self {
        Self {
            rows: default_crosstab_rows(),
            columns: default_crosstab_columns(),
        }
    }
}

fn default_crosstab_rows() -> String {
    "TREM".to_string()
}

fn default_crosstab_columns() -> String {
    "TLIVE".to_string()
}

fn default_pairs() -> Vec<PairSpec> {
    vec![
        PairSpec::new(
            "imp-ds",
            MetricFamily::new("IMP_", "Importance"),
            MetricFamily::new("DS_", "Satisfaction"),
        )
        .with_gap(GapDirection::LeftMinusRight),
        PairSpec::new(
            "skl-lrn",
            MetricFamily::new("SKL_", "Current Skill Level"),
            MetricFamily::new("LRN_", "Learning Interest"),
        )
        .with_gap(GapDirection::RightMinusLeft),
    ]
}

fn default_names() -> NameMap {
    [
        ("AORO", "Access to Online Resources Off-campus"),
        ("BL", "Borrowing Laptops"),
        ("CFUS", "Copyright and Fair Use Support"),
        ("CMS", "Content Management System"),
        ("CMSGB", "Canvas Grade Book"),
        ("CS", "Classroom Support"),
        ("CWS", "Campus Wireless System"),
        ("ERP", "Enterprise Resource Planning"),
        ("ERPSS", "Enterprise Resource Planning System"),
        ("FPC", "Faculty Professional Community"),
        ("GAIT", "Generative AI Tools"),
        ("IDS", "Instructional Design Services"),
        ("IFE", "Identifying Fraudulent Emails"),
        ("ITS", "Instructional Technology Support"),
        ("LC", "Learning Commons"),
        ("LCS", "Lecture Capture Software"),
        ("LEC", "Learning Environment Configuration"),
        ("LSG", "Learning Support Group"),
        ("OAV", "Online Audio/Video"),
        ("OLC", "Online Learning Commons"),
        ("PIRO", "Protecting Identity/Reputation Online"),
        ("STMS", "Support for Technology in Meeting Spaces"),
        ("SWC", "Web Conferencing"),
        ("TMS", "Technology in Meeting Spaces"),
        ("VPN", "Virtual Private Network"),
    ]
    .into_iter()
    .collect()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load `survey-insights.toml` from the working directory.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>, ConfigError> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for pair in &self.pairs {
            if pair.left.prefix.is_empty() || pair.right.prefix.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "pair {} needs both prefixes",
                    pair.name
                )));
            }
        }
        if self.usage.family.prefix.is_empty() {
            return Err(ConfigError::Invalid("usage family needs a prefix".into()));
        }
        if self.input.scale_max <= 0.0 {
            return Err(ConfigError::Invalid("scale_max must be positive".into()));
        }
        self.palette
            .colors()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    pub fn pair(&self, name: &str) -> Option<&PairSpec> {
        self.pairs.iter().find(|p| p.name == name)
    }

    /// Column for a grouping name; unknown names are taken as column names.
    pub fn group_column<'a>(&'a self, name: &'a str) -> &'a str {
        self.groups.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn distribution(&self, column: &str) -> Option<&DistributionConfig> {
        self.distributions.iter().find(|d| d.column == column)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&Config::default())?)
    }
}
