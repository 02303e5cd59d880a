//! Subcommand execution.
//!
//! Each analysis loads what it needs from the [`Session`], builds its report
//! section and, when a chart directory was given, draws its charts.

use crate::cli::{Cli, Command};
use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use survey_insights::charts::{Axes, ChartRenderer, RenderError};
use survey_insights::config::DEFAULT_CONFIG_FILE;
use survey_insights::report::{
    write_report, ComparisonSection, CrosstabSection, DistributionSection, GapSection,
    QualitySection, Report, UsageSection,
};
use survey_insights::stats::{
    attribute_matrix, compare_periods, crosstab, desc_nan_last, distribution, rates,
    sort_by_abs_gap, sort_by_latest, AggregateError, PairedMetricAggregator, Pivot, Rate,
};
use survey_insights::{Config, PairSpec, SurveyLoader, SurveyTable};
use thiserror::Error;
use tracing::{debug, info, warn};

/// A categorical column has no `[[distributions]]` entry to count against.
#[derive(Error, Debug)]
#[error("No categories configured for {0}")]
struct Uncategorized(String);

/// Loaded tables plus everything needed to present results.
pub struct Session {
    pub config: Config,
    pub current: SurveyTable,
    pub baseline: Option<SurveyTable>,
    charts: Option<(ChartRenderer, PathBuf)>,
}

impl Session {
    pub fn open(config: Config, chart_dir: Option<&Path>) -> Result<Self> {
        let loader = SurveyLoader::new();
        let current = loader.load_csv(&config.input.current)?;
        let baseline = match &config.input.baseline {
            Some(path) => Some(loader.load_csv(path)?),
            None => None,
        };

        let charts = match chart_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).with_context(|| {
                    format!("Failed to create chart directory {}", dir.display())
                })?;
                let size = (config.charts.width, config.charts.height);
                Some((ChartRenderer::new(&config.palette, size)?, dir.to_path_buf()))
            }
            None => None,
        };

        Ok(Self {
            config,
            current,
            baseline,
            charts,
        })
    }

    fn source(&self) -> String {
        self.config.input.current.display().to_string()
    }

    /// Run a chart closure if charts are enabled. Failures are logged, not fatal.
    fn draw<F>(&self, file: &str, draw: F)
    where
        F: FnOnce(&ChartRenderer, &Path) -> Result<(), RenderError>,
    {
        let Some((renderer, dir)) = &self.charts else {
            return;
        };
        let path = dir.join(file);
        match draw(renderer, &path) {
            Ok(()) => {}
            Err(RenderError::Empty(what)) => debug!("Skipping chart {}: nothing to draw", what),
            Err(e) => warn!("Chart {} failed: {}", path.display(), e),
        }
    }
}

/// Dispatch a parsed command line. `init-config` is handled before this.
pub fn run(cli: &Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?.unwrap_or_default(),
    };
    cli.merge_into(&mut config);
    debug!("Configuration: {:?}", config);

    let session = Session::open(config, cli.charts.as_deref())?;
    let mut report = Report::new(session.source(), session.current.row_count());

    match &cli.command {
        Command::Gaps { pair, by, top } => {
            report.gaps = gap_sections(&session, pair.as_deref(), by.as_deref(), *top)?;
        }
        Command::Usage { .. } => {
            report.usage = Some(usage_with_fallback(&session)?);
        }
        Command::Compare { .. } => {
            report.comparison = Some(comparison_section(&session)?);
        }
        Command::Quality => {
            report.quality = Some(quality_section(&session)?);
        }
        Command::Ownership => {
            report.ownership = Some(ownership_section(&session)?);
        }
        Command::Distribution { column } => {
            report.distributions = distribution_sections(&session, column.as_deref())?;
        }
        Command::Crosstab { .. } => {
            report.crosstab = Some(crosstab_section(&session)?);
        }
        Command::Report => full_report(&session, &mut report)?,
        Command::InitConfig { .. } => bail!("init-config is handled before loading data"),
    }

    write_report(&report, cli.format.into(), cli.output.as_deref())?;
    Ok(())
}

/// Write the default configuration file.
pub fn init_config(force: bool) -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() && !force {
        bail!(
            "{} already exists. Remove it first, edit it manually, or pass --force.",
            DEFAULT_CONFIG_FILE
        );
    }

    let content = Config::default_toml()?;
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("Created {} with default settings.", DEFAULT_CONFIG_FILE);
    Ok(())
}

/// Every analysis in turn. A section whose columns are absent from the
/// table is skipped with a warning.
fn full_report(session: &Session, report: &mut Report) -> Result<()> {
    if let Some(gaps) = skip_missing("gaps", gap_sections(session, None, None, None))? {
        report.gaps = gaps;
    }

    report.usage = skip_missing("usage", usage_with_fallback(session))?;

    if session.baseline.is_some() {
        report.comparison = skip_missing("comparison", comparison_section(session))?;
    } else {
        info!("No baseline table; period comparison skipped");
    }

    report.quality = skip_missing("quality", quality_section(session))?;
    report.ownership = skip_missing("ownership", ownership_section(session))?;
    report.distributions = distribution_sections(session, None)?;
    report.crosstab = skip_missing("crosstab", crosstab_section(session))?;
    Ok(())
}

/// Missing columns and uncategorized columns skip a section; anything else
/// aborts the run.
fn is_skippable(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<AggregateError>(),
        Some(AggregateError::MissingColumn(_))
    ) || err.is::<Uncategorized>()
}

fn skip_missing<T>(section: &str, result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if is_skippable(&e) => {
            warn!("Section {} skipped: {}", section, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn gap_sections(
    session: &Session,
    pair_name: Option<&str>,
    group: Option<&str>,
    top: Option<usize>,
) -> Result<Vec<GapSection>> {
    let config = &session.config;
    let pairs: Vec<&PairSpec> = match pair_name {
        Some(name) => vec![config.pair(name).ok_or_else(|| {
            let known: Vec<&str> = config.pairs.iter().map(|p| p.name.as_str()).collect();
            anyhow!("Unknown pair {} (configured: {})", name, known.join(", "))
        })?],
        None => config.pairs.iter().collect(),
    };

    let mut sections = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let mut rows = PairedMetricAggregator::aggregate(&session.current, pair)?;
        if rows.is_empty() {
            info!("Pair {}: no entity has both columns", pair.name);
        }
        sort_by_abs_gap(&mut rows);
        if let Some(n) = top {
            rows.truncate(n);
        }

        let axes = Axes {
            title: &pair.name,
            left_label: pair.left.display_label(),
            right_label: pair.right.display_label(),
            range: (1.0, config.input.scale_max),
        };
        session.draw(&format!("{}_matrix.png", pair.name), |r, path| {
            r.gap_matrix(&rows, &axes, pair.midpoint, path)
        });
        session.draw(&format!("{}_bars.png", pair.name), |r, path| {
            r.paired_bars(&rows, &axes, path)
        });

        let mut section = GapSection::new(pair, &rows, &config.names);
        if let Some(group) = group {
            let column = config.group_column(group);
            match PairedMetricAggregator::aggregate_grouped(&session.current, pair, column) {
                Ok(grouped) => section = section.with_groups(column, grouped),
                Err(AggregateError::MissingColumn(missing)) => {
                    warn!("Pair {}: breakdown skipped, column not found: {}", pair.name, missing)
                }
                Err(e) => return Err(e.into()),
            }
        }
        sections.push(section);
    }
    Ok(sections)
}

/// Usage means with the group pivot, or without it when the grouping column
/// is absent.
fn usage_with_fallback(session: &Session) -> Result<UsageSection> {
    match usage_section(session, true) {
        Err(e) if is_skippable(&e) => {
            warn!("Usage pivot skipped: {}", e);
            usage_section(session, false)
        }
        other => other,
    }
}

fn usage_section(session: &Session, with_pivot: bool) -> Result<UsageSection> {
    let config = &session.config;
    let family = &config.usage.family;

    let mut means = PairedMetricAggregator::family_means(&session.current, family, None)?;
    means.sort_by(|a, b| desc_nan_last(a.mean, b.mean));
    let mut section = UsageSection::new(family.display_label(), &means, &config.names);

    if with_pivot {
        let column = config.group_column(&config.usage.group);
        let grouped =
            PairedMetricAggregator::family_means(&session.current, family, Some(column))?;
        let pivot = Pivot::from_means(&grouped).top_entities(config.usage.top);

        let title = format!("{} by {}", family.display_label(), config.usage.group);
        session.draw("usage_heatmap.png", |r, path| r.heatmap(&pivot, &title, path));
        section = section.with_pivot(column, pivot);
    }
    Ok(section)
}

fn comparison_section(session: &Session) -> Result<ComparisonSection> {
    let config = &session.config;
    let baseline = session
        .baseline
        .as_ref()
        .context("Period comparison needs a baseline table (--baseline or [input].baseline)")?;
    let family = &config.usage.family;

    let mut changes = compare_periods(baseline, &session.current, family)?;
    sort_by_latest(&mut changes);

    let axes = Axes {
        title: family.display_label(),
        left_label: &config.input.baseline_label,
        right_label: &config.input.current_label,
        range: (1.0, config.input.scale_max),
    };
    session.draw("usage_comparison.png", |r, path| {
        r.period_bars(&changes, &axes, path)
    });

    Ok(ComparisonSection::new(
        family.display_label(),
        &config.input.baseline_label,
        &config.input.current_label,
        &changes,
        &config.names,
        config.input.scale_max,
        config.usage.adoption_midpoint,
    ))
}

fn quality_section(session: &Session) -> Result<QualitySection> {
    let quality = &session.config.quality;
    let profiles = attribute_matrix(&session.current, &quality.subjects, &quality.attributes)?;
    if profiles.is_empty() {
        let first = quality.subjects.first().map(|s| s.code.clone()).unwrap_or_default();
        return Err(AggregateError::MissingColumn(first).into());
    }

    let attributes: Vec<String> = quality.attributes.iter().map(|a| a.label.clone()).collect();
    let pivot = Pivot {
        groups: profiles.iter().map(|p| p.subject.clone()).collect(),
        entities: attributes.clone(),
        cells: profiles
            .iter()
            .map(|p| p.values.iter().map(|(_, mean)| *mean).collect())
            .collect(),
    };
    session.draw("service_quality.png", |r, path| {
        r.heatmap(&pivot, "Service quality", path)
    });

    Ok(QualitySection {
        attributes,
        profiles,
    })
}

fn ownership_section(session: &Session) -> Result<Vec<Rate>> {
    let rates = rates(&session.current, &session.config.ownership.columns)?;

    let bars: Vec<(String, f64)> = rates.iter().map(|r| (r.label.clone(), r.percent)).collect();
    session.draw("device_ownership.png", |r, path| {
        r.simple_bars(&bars, "Device ownership", "Percent", 100.0, "%", path)
    });
    Ok(rates)
}

fn distribution_sections(
    session: &Session,
    column: Option<&str>,
) -> Result<Vec<DistributionSection>> {
    let config = &session.config;
    let selected: Vec<_> = match column {
        Some(column) => vec![config
            .distribution(column)
            .ok_or_else(|| Uncategorized(column.to_string()))?],
        None => config.distributions.iter().collect(),
    };

    let mut sections = Vec::with_capacity(selected.len());
    for d in selected {
        let shares = match distribution(&session.current, &d.column, &d.categories) {
            Ok(shares) => shares,
            Err(AggregateError::MissingColumn(missing)) => {
                warn!("Distribution {} skipped: column not found", missing);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let bars: Vec<(String, f64)> =
            shares.iter().map(|s| (s.label.clone(), s.share * 100.0)).collect();
        session.draw(&format!("{}_distribution.png", d.column.to_lowercase()), |r, path| {
            r.simple_bars(&bars, &d.title, "Percent of respondents", 100.0, "%", path)
        });

        sections.push(DistributionSection {
            column: d.column.clone(),
            title: d.title.clone(),
            shares,
        });
    }
    Ok(sections)
}

fn crosstab_section(session: &Session) -> Result<CrosstabSection> {
    let config = &session.config;
    let (rows, columns) = (&config.crosstab.rows, &config.crosstab.columns);
    let categories = |column: &str| {
        config
            .distribution(column)
            .map(|d| d.categories.clone())
            .ok_or_else(|| Uncategorized(column.to_string()))
    };

    let table = crosstab(
        &session.current,
        rows,
        &categories(rows.as_str())?,
        columns,
        &categories(columns.as_str())?,
    )?;

    let pivot = Pivot {
        groups: table.row_labels.clone(),
        entities: table.column_labels.clone(),
        cells: (0..table.row_labels.len())
            .map(|r| {
                (0..table.column_labels.len())
                    .map(|c| table.share(r, c) * 100.0)
                    .collect()
            })
            .collect(),
    };
    let title = format!("{} x {} (% of respondents)", rows, columns);
    session.draw("crosstab.png", |r, path| r.heatmap(&pivot, &title, path));

    Ok(CrosstabSection {
        rows: rows.clone(),
        columns: columns.clone(),
        table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn session(df: DataFrame, config: Config) -> Session {
        Session {
            config,
            current: SurveyTable::new(df),
            baseline: None,
            charts: None,
        }
    }

    fn wave() -> DataFrame {
        df!(
            "IMP_CMS" => [4.0, 2.0, 5.0],
            "DS_CMS" => [2.0, 4.0, 5.0],
            "USE_CMS" => [5.0, 4.0, 5.0],
            "USE_SWC" => [4.0, 5.0, 3.0],
            "ADIV" => ["Arts", "Arts", "Science"],
            "TREM" => [1i64, 2, 2],
            "TLIVE" => [1i64, 1, 5],
        )
        .unwrap()
    }

    #[test]
    fn test_report_skips_uncategorized_crosstab() {
        let mut config = Config::default();
        config.distributions.retain(|d| d.column == "TREM");
        let session = session(wave(), config);

        let mut report = Report::new("wave.csv", 3);
        full_report(&session, &mut report).unwrap();

        assert!(report.crosstab.is_none());
        assert_eq!(report.distributions.len(), 1);
        assert_eq!(report.distributions[0].column, "TREM");
        assert_eq!(report.gaps[0].entries[0].code, "CMS");
        assert!(report.usage.is_some());
    }

    #[test]
    fn test_report_skips_only_the_missing_distribution() {
        let df = wave().drop("TLIVE").unwrap();
        let session = session(df, Config::default());

        let mut report = Report::new("wave.csv", 3);
        full_report(&session, &mut report).unwrap();

        let columns: Vec<&str> = report.distributions.iter().map(|d| d.column.as_str()).collect();
        assert_eq!(columns, vec!["TREM"]);
        assert_eq!(report.distributions[0].shares[1].count, 2);
        assert!(report.crosstab.is_none());
        assert!(report.quality.is_none());
        assert!(report.ownership.is_none());
        assert!(report.comparison.is_none());
    }

    #[test]
    fn test_report_keeps_crosstab_when_categorized() {
        let session = session(wave(), Config::default());

        let mut report = Report::new("wave.csv", 3);
        full_report(&session, &mut report).unwrap();

        let crosstab = report.crosstab.unwrap();
        assert_eq!(crosstab.table.total, 3);
        assert_eq!(crosstab.table.counts[1][0], 1);
    }

    #[test]
    fn test_usage_falls_back_without_group_column() {
        let df = wave().drop("ADIV").unwrap();
        let session = session(df, Config::default());

        let usage = usage_with_fallback(&session).unwrap();
        assert!(usage.pivot.is_none());
        assert!(usage.group_column.is_none());
        let codes: Vec<&str> = usage.entries.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["CMS", "SWC"]);
    }

    #[test]
    fn test_usage_pivot_uses_group_column() {
        let session = session(wave(), Config::default());

        let usage = usage_with_fallback(&session).unwrap();
        assert_eq!(usage.group_column.as_deref(), Some("ADIV"));
        assert_eq!(usage.pivot.unwrap().groups, vec!["Arts", "Science"]);
    }

    #[test]
    fn test_gaps_by_missing_column_keeps_overall_rows() {
        let session = session(wave(), Config::default());

        let sections = gap_sections(&session, Some("imp-ds"), Some("tenure"), None).unwrap();
        assert_eq!(sections.len(), 1);
        assert!(sections[0].group_column.is_none());
        assert!(sections[0].groups.is_empty());
        assert_eq!(sections[0].entries[0].code, "CMS");
    }

    #[test]
    fn test_gaps_by_named_group() {
        let session = session(wave(), Config::default());

        let sections = gap_sections(&session, Some("imp-ds"), Some("division"), None).unwrap();
        assert_eq!(sections[0].group_column.as_deref(), Some("ADIV"));
        assert_eq!(sections[0].groups.len(), 2);
    }

    #[test]
    fn test_unknown_distribution_column_is_skippable_error() {
        let session = session(wave(), Config::default());

        let err = distribution_sections(&session, Some("ADIV")).unwrap_err();
        assert_eq!(err.to_string(), "No categories configured for ADIV");
        assert!(is_skippable(&err));
    }
}
