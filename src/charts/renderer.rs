//! Static Chart Renderer
//! Writes PNG charts for the survey analyses with plotters.
//!
//! Charts:
//! 1. Gap matrix: right-family mean (x) against left-family mean (y), points
//!    coloured by gap, quadrant lines at the pair's midpoint
//! 2. Paired bars: both family means per entity with the gap annotated
//! 3. Period bars: earlier vs later wave per entity with percent change
//! 4. Heatmap: group x entity pivot with cell annotations
//! 5. Simple bars: one value per label (ownership rates, distributions)

use crate::charts::{ColorError, Colors, Palette};
use crate::stats::{AggregateRow, PeriodChange, Pivot, PriorityQuadrant};
use plotters::prelude::*;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Palette(#[from] ColorError),
    #[error("Nothing to draw for {0}")]
    Empty(String),
    #[error("Drawing failed: {0}")]
    Draw(String),
}

fn draw_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Draw(e.to_string())
}

const FONT: &str = "sans-serif";

/// Two series labels and the rating range shared by bar and matrix charts.
#[derive(Debug, Clone)]
pub struct Axes<'a> {
    pub title: &'a str,
    pub left_label: &'a str,
    pub right_label: &'a str,
    /// Lowest and highest rating on the scale (1-5 by default).
    pub range: (f64, f64),
}

pub struct ChartRenderer {
    colors: Colors,
    size: (u32, u32),
}

impl ChartRenderer {
    pub fn new(palette: &Palette, size: (u32, u32)) -> Result<Self, RenderError> {
        Ok(Self {
            colors: palette.colors()?,
            size,
        })
    }

    /// Importance/satisfaction style matrix. Rows with an undefined mean are
    /// not plotted.
    pub fn gap_matrix(
        &self,
        rows: &[AggregateRow],
        axes: &Axes,
        midpoint: f64,
        path: &Path,
    ) -> Result<(), RenderError> {
        let points: Vec<&AggregateRow> = rows.iter().filter(|r| r.is_complete()).collect();
        if points.is_empty() {
            return Err(RenderError::Empty(axes.title.to_string()));
        }
        let (lo, hi) = axes.range;
        let (gap_min, gap_max) = finite_bounds(points.iter().map(|r| r.gap));

        let root = BitMapBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(axes.title, (FONT, 28).into_font().color(&self.colors.primary))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(lo..hi, lo..hi)
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .x_desc(format!("{} rating", axes.right_label))
            .y_desc(format!("{} rating", axes.left_label))
            .light_line_style(self.colors.secondary.mix(0.2))
            .draw()
            .map_err(draw_err)?;

        // Quadrant lines
        let guide = self.colors.secondary.stroke_width(1);
        chart
            .draw_series(LineSeries::new(vec![(midpoint, lo), (midpoint, hi)], guide))
            .map_err(draw_err)?;
        chart
            .draw_series(LineSeries::new(vec![(lo, midpoint), (hi, midpoint)], guide))
            .map_err(draw_err)?;

        let low = (lo + midpoint) / 2.0;
        let high = (midpoint + hi) / 2.0;
        let quadrant_labels = [
            (PriorityQuadrant::ConcentrateHere, (low, high)),
            (PriorityQuadrant::KeepUpTheGoodWork, (high, high)),
            (PriorityQuadrant::LowPriority, (low, low)),
            (PriorityQuadrant::PossibleOverkill, (high, low)),
        ];
        let label_style = (FONT, 16).into_font().color(&self.colors.primary);
        chart
            .draw_series(
                quadrant_labels
                    .iter()
                    .map(|(q, pos)| Text::new(q.to_string(), *pos, label_style.clone())),
            )
            .map_err(draw_err)?;

        chart
            .draw_series(points.iter().map(|r| {
                let t = unit(r.gap, gap_min, gap_max);
                Circle::new((r.right_mean, r.left_mean), 7, self.colors.ramp(t).filled())
            }))
            .map_err(draw_err)?;

        let code_style = (FONT, 12).into_font().color(&self.colors.primary);
        chart
            .draw_series(points.iter().map(|r| {
                Text::new(
                    r.code.clone(),
                    (r.right_mean + 0.03, r.left_mean + 0.03),
                    code_style.clone(),
                )
            }))
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
        info!("Wrote {} ({} points)", path.display(), points.len());
        Ok(())
    }

    /// Both means per entity as side-by-side bars, gap printed above.
    pub fn paired_bars(
        &self,
        rows: &[AggregateRow],
        axes: &Axes,
        path: &Path,
    ) -> Result<(), RenderError> {
        let bars: Vec<(String, f64, f64, String)> = rows
            .iter()
            .map(|r| (r.code.clone(), r.left_mean, r.right_mean, signed(r.gap)))
            .collect();
        self.grouped_bars(&bars, axes, path)
    }

    /// Earlier vs later wave per entity, percent change printed above.
    pub fn period_bars(
        &self,
        changes: &[PeriodChange],
        axes: &Axes,
        path: &Path,
    ) -> Result<(), RenderError> {
        let bars: Vec<(String, f64, f64, String)> = changes
            .iter()
            .map(|c| {
                let note = c
                    .pct_change
                    .map(|p| format!("{:.1}%", p))
                    .unwrap_or_else(|| "N/A".to_string());
                (c.code.clone(), c.before, c.after, note)
            })
            .collect();
        self.grouped_bars(&bars, axes, path)
    }

    fn grouped_bars(
        &self,
        bars: &[(String, f64, f64, String)],
        axes: &Axes,
        path: &Path,
    ) -> Result<(), RenderError> {
        if bars.is_empty() {
            return Err(RenderError::Empty(axes.title.to_string()));
        }
        let n = bars.len();
        let labels: Vec<String> = bars.iter().map(|b| b.0.clone()).collect();
        let y_max = axes.range.1 * 1.15;
        let width = 0.35;

        let root = BitMapBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(axes.title, (FONT, 28).into_font().color(&self.colors.primary))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(-0.5..(n as f64 - 0.5), 0.0..y_max)
            .map_err(draw_err)?;

        let x_fmt = |x: &f64| category_label(&labels, *x);
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&x_fmt)
            .y_desc("Rating")
            .light_line_style(self.colors.secondary.mix(0.2))
            .draw()
            .map_err(draw_err)?;

        let left = self.colors.series(0);
        let right = self.colors.series(1);
        chart
            .draw_series(bars.iter().enumerate().filter(|(_, b)| !b.1.is_nan()).map(
                |(i, b)| {
                    let x = i as f64;
                    Rectangle::new([(x - width, 0.0), (x, b.1)], left.filled())
                },
            ))
            .map_err(draw_err)?
            .label(axes.left_label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], left.filled()));
        chart
            .draw_series(bars.iter().enumerate().filter(|(_, b)| !b.2.is_nan()).map(
                |(i, b)| {
                    let x = i as f64;
                    Rectangle::new([(x, 0.0), (x + width, b.2)], right.filled())
                },
            ))
            .map_err(draw_err)?
            .label(axes.right_label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], right.filled()));

        let note_style = (FONT, 13).into_font().color(&self.colors.primary);
        chart
            .draw_series(bars.iter().enumerate().map(|(i, b)| {
                let top = [b.1, b.2]
                    .into_iter()
                    .filter(|v| !v.is_nan())
                    .fold(0.0, f64::max);
                Text::new(b.3.clone(), (i as f64 - 0.15, top + 0.1), note_style.clone())
            }))
            .map_err(draw_err)?;

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.9))
            .border_style(self.colors.primary)
            .draw()
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
        info!("Wrote {} ({} entities)", path.display(), n);
        Ok(())
    }

    /// Group x entity heatmap with each defined cell annotated.
    pub fn heatmap(&self, pivot: &Pivot, title: &str, path: &Path) -> Result<(), RenderError> {
        if pivot.is_empty() {
            return Err(RenderError::Empty(title.to_string()));
        }
        let cols = pivot.entities.len();
        let rows = pivot.groups.len();
        let (lo, hi) = finite_bounds(pivot.cells.iter().flatten().copied());

        let root = BitMapBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 28).into_font().color(&self.colors.primary))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(120)
            .build_cartesian_2d(-0.5..(cols as f64 - 0.5), -0.5..(rows as f64 - 0.5))
            .map_err(draw_err)?;

        let x_fmt = |x: &f64| category_label(&pivot.entities, *x);
        let y_fmt = |y: &f64| category_label(&pivot.groups, *y);
        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(cols)
            .y_labels(rows)
            .x_label_formatter(&x_fmt)
            .y_label_formatter(&y_fmt)
            .draw()
            .map_err(draw_err)?;

        let cells: Vec<(usize, usize, f64)> = pivot
            .cells
            .iter()
            .enumerate()
            .flat_map(|(r, row)| row.iter().enumerate().map(move |(c, v)| (r, c, *v)))
            .collect();

        chart
            .draw_series(cells.iter().map(|&(r, c, v)| {
                let (x, y) = (c as f64, r as f64);
                let fill = if v.is_nan() {
                    WHITE
                } else {
                    self.colors.ramp(unit(v, lo, hi))
                };
                Rectangle::new([(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)], fill.filled())
            }))
            .map_err(draw_err)?;

        chart
            .draw_series(cells.iter().filter(|(_, _, v)| !v.is_nan()).map(|&(r, c, v)| {
                let text_color = if unit(v, lo, hi) < 0.5 {
                    WHITE
                } else {
                    self.colors.primary
                };
                Text::new(
                    format!("{:.2}", v),
                    (c as f64 - 0.2, r as f64),
                    (FONT, 13).into_font().color(&text_color),
                )
            }))
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
        info!("Wrote {} ({}x{} cells)", path.display(), rows, cols);
        Ok(())
    }

    /// One bar per label, value printed above with `suffix`.
    pub fn simple_bars(
        &self,
        bars: &[(String, f64)],
        title: &str,
        y_desc: &str,
        y_max: f64,
        suffix: &str,
        path: &Path,
    ) -> Result<(), RenderError> {
        if bars.is_empty() {
            return Err(RenderError::Empty(title.to_string()));
        }
        let n = bars.len();
        let labels: Vec<String> = bars.iter().map(|b| b.0.clone()).collect();

        let root = BitMapBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 28).into_font().color(&self.colors.primary))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(-0.5..(n as f64 - 0.5), 0.0..y_max)
            .map_err(draw_err)?;

        let x_fmt = |x: &f64| category_label(&labels, *x);
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&x_fmt)
            .y_desc(y_desc)
            .light_line_style(self.colors.secondary.mix(0.2))
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(bars.iter().enumerate().filter(|(_, b)| !b.1.is_nan()).map(
                |(i, b)| {
                    let x = i as f64;
                    Rectangle::new(
                        [(x - 0.3, 0.0), (x + 0.3, b.1)],
                        self.colors.series(i).filled(),
                    )
                },
            ))
            .map_err(draw_err)?;

        let note_style = (FONT, 14).into_font().color(&self.colors.primary);
        chart
            .draw_series(bars.iter().enumerate().filter(|(_, b)| !b.1.is_nan()).map(
                |(i, b)| {
                    Text::new(
                        format!("{:.1}{}", b.1, suffix),
                        (i as f64 - 0.12, b.1 + y_max * 0.02),
                        note_style.clone(),
                    )
                },
            ))
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// Label for an integer tick; blank between categories.
fn category_label(labels: &[String], x: f64) -> String {
    let i = x.round();
    if (x - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    labels.get(i as usize).cloned().unwrap_or_default()
}

/// Min and max of the finite values; `(0, 1)` when there are none.
fn finite_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo.is_infinite() {
        (0.0, 1.0)
    } else {
        (lo, hi)
    }
}

/// Position of `v` within `[lo, hi]`; 0.5 when the range is degenerate.
fn unit(v: f64, lo: f64, hi: f64) -> f64 {
    if hi - lo <= f64::EPSILON {
        0.5
    } else {
        (v - lo) / (hi - lo)
    }
}

fn signed(gap: f64) -> String {
    if gap.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:+.2}", gap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_label_only_on_integer_ticks() {
        let labels = vec!["CMS".to_string(), "VPN".to_string()];
        assert_eq!(category_label(&labels, 0.0), "CMS");
        assert_eq!(category_label(&labels, 1.0), "VPN");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, 2.0), "");
        assert_eq!(category_label(&labels, -1.0), "");
    }

    #[test]
    fn test_finite_bounds_ignores_nan() {
        assert_eq!(finite_bounds([2.0, f64::NAN, -1.0].into_iter()), (-1.0, 2.0));
        assert_eq!(finite_bounds([f64::NAN].into_iter()), (0.0, 1.0));
    }

    #[test]
    fn test_unit_handles_flat_range() {
        assert_eq!(unit(3.0, 3.0, 3.0), 0.5);
        assert_eq!(unit(2.0, 1.0, 3.0), 0.5);
    }

    #[test]
    fn test_empty_inputs_are_reported_before_drawing() {
        let renderer = ChartRenderer::new(&Palette::default(), (400, 300)).unwrap();
        let axes = Axes {
            title: "Empty",
            left_label: "left",
            right_label: "right",
            range: (1.0, 5.0),
        };
        let path = Path::new("unused.png");

        assert!(matches!(
            renderer.paired_bars(&[], &axes, path),
            Err(RenderError::Empty(_))
        ));
        assert!(matches!(
            renderer.gap_matrix(&[], &axes, 3.0, path),
            Err(RenderError::Empty(_))
        ));
    }

    #[test]
    fn test_invalid_palette_is_rejected() {
        let palette = Palette {
            primary: "black".into(),
            ..Palette::default()
        };
        assert!(matches!(
            ChartRenderer::new(&palette, (400, 300)),
            Err(RenderError::Palette(_))
        ));
    }
}
