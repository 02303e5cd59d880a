//! Plain-text rendering of a report. Undefined values print as `n/a`.

use super::{
    ComparisonSection, CrosstabSection, DistributionSection, GapSection, QualitySection, Report,
    UsageSection,
};
use crate::stats::Rate;
use std::fmt;

fn value(v: f64) -> String {
    if v.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:.2}", v)
    }
}

fn signed(v: f64) -> String {
    if v.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:+.2}", v)
    }
}

fn percent(v: Option<f64>) -> String {
    match v {
        Some(p) if !p.is_nan() => format!("{:+.1}%", p),
        _ => "n/a".to_string(),
    }
}

fn heading(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "{}", title)?;
    writeln!(f, "{}", "-".repeat(title.chars().count()))
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Survey report: {} ({} respondents)", self.source, self.respondents)?;

        for section in &self.gaps {
            write!(f, "{}", section)?;
        }
        if let Some(usage) = &self.usage {
            write!(f, "{}", usage)?;
        }
        if let Some(comparison) = &self.comparison {
            write!(f, "{}", comparison)?;
        }
        if let Some(quality) = &self.quality {
            write!(f, "{}", quality)?;
        }
        if let Some(rates) = &self.ownership {
            write_rates(f, rates)?;
        }
        for distribution in &self.distributions {
            write!(f, "{}", distribution)?;
        }
        if let Some(crosstab) = &self.crosstab {
            write!(f, "{}", crosstab)?;
        }
        Ok(())
    }
}

impl fmt::Display for GapSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(
            f,
            &format!("{}: {} vs {}", self.pair, self.left_label, self.right_label),
        )?;
        writeln!(
            f,
            "{:<42} {:>8} {:>8} {:>8}  {}",
            "Entity", "Left", "Right", "Gap", "Quadrant"
        )?;
        for e in &self.entries {
            let quadrant = e.quadrant.map(|q| q.to_string()).unwrap_or_default();
            writeln!(
                f,
                "{:<42} {:>8} {:>8} {:>8}  {}",
                e.name,
                value(e.left_mean),
                value(e.right_mean),
                signed(e.gap),
                quadrant
            )?;
        }

        if let Some(column) = &self.group_column {
            for group in &self.groups {
                writeln!(f)?;
                writeln!(f, "  {} = {} ({} respondents)", column, group.group, group.respondents)?;
                for row in &group.rows {
                    writeln!(
                        f,
                        "  {:<40} {:>8} {:>8} {:>8}",
                        row.code,
                        value(row.left_mean),
                        value(row.right_mean),
                        signed(row.gap)
                    )?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for UsageSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, &self.family)?;
        writeln!(f, "{:<42} {:>8} {:>6}", "Entity", "Mean", "n")?;
        for e in &self.entries {
            writeln!(f, "{:<42} {:>8} {:>6}", e.name, value(e.mean), e.count)?;
        }

        if let (Some(column), Some(pivot)) = (&self.group_column, &self.pivot) {
            writeln!(f)?;
            write!(f, "{:<24}", column)?;
            for entity in &pivot.entities {
                write!(f, " {:>8}", entity)?;
            }
            writeln!(f)?;
            for (group, row) in pivot.groups.iter().zip(&pivot.cells) {
                write!(f, "{:<24}", group)?;
                for cell in row {
                    write!(f, " {:>8}", value(*cell))?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ComparisonSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(
            f,
            &format!("{}: {} vs {}", self.family, self.before_label, self.after_label),
        )?;
        writeln!(
            f,
            "{:<42} {:>8} {:>8} {:>8} {:>9}  {}",
            "Entity", self.before_label, self.after_label, "Change", "Pct", "Quadrant"
        )?;
        for e in &self.entries {
            let quadrant = e.quadrant.map(|q| q.to_string()).unwrap_or_default();
            writeln!(
                f,
                "{:<42} {:>8} {:>8} {:>8} {:>9}  {}",
                e.name,
                value(e.before),
                value(e.after),
                signed(e.change),
                percent(e.pct_change),
                quadrant
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for QualitySection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, "Service quality")?;
        write!(f, "{:<34}", "")?;
        for attribute in &self.attributes {
            write!(f, " {:>13}", attribute)?;
        }
        writeln!(f)?;
        for profile in &self.profiles {
            write!(f, "{:<34}", profile.subject)?;
            for (_, mean) in &profile.values {
                write!(f, " {:>13}", value(*mean))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn write_rates(f: &mut fmt::Formatter<'_>, rates: &[Rate]) -> fmt::Result {
    heading(f, "Ownership")?;
    for rate in rates {
        let pct = if rate.percent.is_nan() {
            "n/a".to_string()
        } else {
            format!("{:.1}%", rate.percent)
        };
        writeln!(f, "{:<32} {:>8} {:>6}", rate.label, pct, rate.count)?;
    }
    Ok(())
}

impl fmt::Display for DistributionSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = if self.title.is_empty() {
            self.column.as_str()
        } else {
            self.title.as_str()
        };
        heading(f, title)?;
        for share in &self.shares {
            let pct = if share.share.is_nan() {
                "n/a".to_string()
            } else {
                format!("{:.1}%", share.share * 100.0)
            };
            writeln!(f, "{:<24} {:>8} {:>6}", share.label, pct, share.count)?;
        }
        Ok(())
    }
}

impl fmt::Display for CrosstabSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, &format!("{} x {}", self.rows, self.columns))?;
        write!(f, "{:<20}", "")?;
        for label in &self.table.column_labels {
            write!(f, " {:>18}", label)?;
        }
        writeln!(f)?;
        for (r, label) in self.table.row_labels.iter().enumerate() {
            write!(f, "{:<20}", label)?;
            for (c, count) in self.table.counts[r].iter().enumerate() {
                let share = self.table.share(r, c);
                let cell = if share.is_nan() {
                    format!("{}", count)
                } else {
                    format!("{} ({:.1}%)", count, share * 100.0)
                };
                write!(f, " {:>18}", cell)?;
            }
            writeln!(f)?;
        }
        writeln!(f, "Total: {}", self.table.total)
    }
}
