//! Command-line interface argument parsing.
//!
//! Global flags pick the input tables, the config file and the output
//! format; each subcommand runs one analysis (or all of them for `report`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use survey_insights::report::OutputFormat;
use survey_insights::Config;

/// Survey Insights - paired-metric gaps, usage pivots and period comparison
///
/// Examples:
///   survey-insights --input cleaned_c24.csv gaps
///   survey-insights -i cleaned_c24.csv gaps --pair skl-lrn --by division
///   survey-insights -i cleaned_c24.csv -b cleaned_c18.csv compare
///   survey-insights -i cleaned_c24.csv --format json -o report.json report
///   survey-insights init-config
#[derive(Parser, Debug, Clone)]
#[command(name = "survey-insights", author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for survey-insights.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Survey CSV to analyze (overrides [input].current)
    #[arg(short, long, global = true, value_name = "CSV", env = "SURVEY_INPUT")]
    pub input: Option<PathBuf>,

    /// Earlier survey wave for period comparison (overrides [input].baseline)
    #[arg(short, long, global = true, value_name = "CSV")]
    pub baseline: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    pub format: Format,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Directory for PNG charts; no charts are drawn without it
    #[arg(long, global = true, value_name = "DIR")]
    pub charts: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Paired family means and gaps (importance vs satisfaction, skill vs interest)
    Gaps {
        /// Only this pair (by name); all configured pairs otherwise
        #[arg(long)]
        pair: Option<String>,

        /// Also break results down by a grouping from [groups] (or a column name)
        #[arg(long, value_name = "GROUP")]
        by: Option<String>,

        /// Keep the N entities with the largest absolute gap
        #[arg(long, value_name = "N")]
        top: Option<usize>,
    },

    /// Single-family means, with a group x entity pivot
    Usage {
        /// Grouping for the pivot (defaults to [usage].group)
        #[arg(long, value_name = "GROUP")]
        by: Option<String>,

        /// Entities kept in the pivot (defaults to [usage].top)
        #[arg(long, value_name = "N")]
        top: Option<usize>,
    },

    /// Compare the usage family between the baseline and current waves
    Compare {
        /// Family prefix to compare (defaults to [usage].family)
        #[arg(long, value_name = "PREFIX")]
        family: Option<String>,
    },

    /// Staff quality ratings per subject and attribute
    Quality,

    /// Device ownership rates
    Ownership,

    /// Response distribution of categorical columns
    Distribution {
        /// Only this column; every configured distribution otherwise
        column: Option<String>,
    },

    /// Cross-tabulate two categorical columns
    Crosstab {
        /// Row column (defaults to [crosstab].rows)
        #[arg(long)]
        rows: Option<String>,

        /// Column column (defaults to [crosstab].columns)
        #[arg(long)]
        columns: Option<String>,
    },

    /// Run every analysis; sections whose columns are missing are skipped
    Report,

    /// Write a default survey-insights.toml
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    /// Plain-text tables (default)
    #[default]
    Text,
    /// JSON document
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
        }
    }
}

impl Cli {
    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            Command::Gaps { top: Some(0), .. } | Command::Usage { top: Some(0), .. } => {
                return Err("--top must be at least 1".to_string());
            }
            _ => {}
        }

        if let Some(ref dir) = self.charts {
            if dir.exists() && !dir.is_dir() {
                return Err(format!(
                    "Chart path is not a directory: {}",
                    dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Apply CLI overrides on top of the file configuration.
    ///
    /// Only flags the user actually passed replace config values.
    pub fn merge_into(&self, config: &mut Config) {
        if let Some(ref input) = self.input {
            config.input.current = input.clone();
        }
        if let Some(ref baseline) = self.baseline {
            config.input.baseline = Some(baseline.clone());
        }
        if let Command::Usage { by, top } = &self.command {
            if let Some(by) = by {
                config.usage.group = by.clone();
            }
            if let Some(top) = top {
                config.usage.top = *top;
            }
        }
        if let Command::Compare {
            family: Some(prefix),
        } = &self.command
        {
            config.usage.family.prefix = prefix.clone();
            config.usage.family.label = String::new();
        }
        if let Command::Crosstab { rows, columns } = &self.command {
            if let Some(rows) = rows {
                config.crosstab.rows = rows.clone();
            }
            if let Some(columns) = columns {
                config.crosstab.columns = columns.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("survey-insights").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["gaps", "--pair", "imp-ds", "-i", "c24.csv", "--format", "json"]);
        assert_eq!(cli.input, Some(PathBuf::from("c24.csv")));
        assert_eq!(cli.format, Format::Json);
        assert_eq!(
            cli.command,
            Command::Gaps {
                pair: Some("imp-ds".into()),
                by: None,
                top: None
            }
        );
    }

    #[test]
    fn test_log_level() {
        assert_eq!(parse(&["report"]).log_level(), tracing::Level::INFO);
        assert_eq!(parse(&["-v", "report"]).log_level(), tracing::Level::DEBUG);
        assert_eq!(parse(&["-q", "report"]).log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_validate_conflicts() {
        assert!(parse(&["-v", "-q", "report"]).validate().is_err());
        assert!(parse(&["usage", "--top", "0"]).validate().is_err());
        assert!(parse(&["usage", "--top", "3"]).validate().is_ok());
    }

    #[test]
    fn test_merge_only_overrides_given_flags() {
        let mut config = Config::default();
        parse(&["-b", "c18.csv", "usage", "--top", "5"]).merge_into(&mut config);

        assert_eq!(config.input.current, PathBuf::from("cleaned_c24.csv"));
        assert_eq!(config.input.baseline, Some(PathBuf::from("c18.csv")));
        assert_eq!(config.usage.top, 5);
        assert_eq!(config.usage.group, "division");
    }

    #[test]
    fn test_compare_family_relabels_output() {
        let mut config = Config::default();
        assert_eq!(config.usage.family.display_label(), "Usage");

        parse(&["compare", "--family", "SKL_"]).merge_into(&mut config);
        assert_eq!(config.usage.family.prefix, "SKL_");
        assert_eq!(config.usage.family.display_label(), "SKL_");
    }

    #[test]
    fn test_distribution_column_is_positional() {
        let cli = parse(&["distribution", "TREM"]);
        assert_eq!(
            cli.command,
            Command::Distribution {
                column: Some("TREM".into())
            }
        );
    }
}
