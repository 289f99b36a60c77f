//! Frontier JSON artifact and PNG plots.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use advisor_core::frontier::FrontierGrid;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::Serialize;
use thiserror::Error;

use crate::analytics::PolicyReport;

pub const FRONTIER_PLOT: &str = "patience_frontier.png";
pub const SCORE_PLOT: &str = "score_distribution.png";

const COLORBAR_LABEL: &str = "Expected Advantage of A vs B";
const COLORBAR_STEPS: usize = 64;

const STAY: RGBColor = RGBColor(33, 102, 172);
const SWITCH: RGBColor = RGBColor(178, 24, 43);

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialise {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to render plot: {0}")]
    Plot(String),
}

#[derive(Serialize)]
struct FrontierArtifact<'a> {
    run_id: &'a str,
    #[serde(flatten)]
    grid: &'a FrontierGrid,
    switch_thresholds: Vec<Option<usize>>,
}

/// Writes the frontier grid with `null` for cells beyond the horizon.
pub fn write_frontier_json(
    path: &Path,
    run_id: &str,
    grid: &FrontierGrid,
) -> Result<(), ReportError> {
    let artifact = FrontierArtifact {
        run_id,
        grid,
        switch_thresholds: grid.switch_thresholds(),
    };

    let file = File::create(path).map_err(|source| ReportError::Io {
        context: "creating frontier json",
        source,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &artifact).map_err(|source| ReportError::Json {
        context: "frontier grid",
        source,
    })?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|source| ReportError::Io {
            context: "writing frontier json",
            source,
        })
}

/// Diverging heatmap of the frontier: blue favours staying with A, red favours switching.
/// Each cell carries its gap to one decimal; a colorbar on the right gives the scale.
pub fn render_frontier_heatmap(dir: &Path, grid: &FrontierGrid) -> Result<PathBuf, ReportError> {
    ensure_dir(dir)?;
    let output_path = dir.join(FRONTIER_PLOT);
    let grid = grid.clone();

    with_quiet_panics(move || {
        let size = grid.grid_size();
        let extent = size as f64;
        let cells: Vec<(f64, f64, f64)> = grid
            .rows()
            .iter()
            .enumerate()
            .flat_map(|(losses, row)| {
                row.iter().enumerate().filter_map(move |(wins, cell)| {
                    cell.value().map(|gap| (wins as f64, losses as f64, gap))
                })
            })
            .collect();
        let max_abs = cells
            .iter()
            .fold(0.0f64, |acc, &(_, _, gap)| acc.max(gap.abs()))
            .max(f64::EPSILON);

        let backend_path = output_path.clone();
        let root = BitMapBackend::new(&backend_path, (840, 640)).into_drawing_area();
        root.fill(&WHITE).map_err(plot_error)?;
        let (heat_area, bar_area) = root.split_horizontally(700);

        let mut chart = ChartBuilder::on(&heat_area)
            .margin(20)
            .caption("Patience frontier (Q_A - Q_B)", ("sans-serif", 22))
            .set_label_area_size(LabelAreaPosition::Left, 50)
            .set_label_area_size(LabelAreaPosition::Bottom, 50)
            .build_cartesian_2d(0.0..extent, 0.0..extent)
            .map_err(plot_error)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(size + 1)
            .y_labels(size + 1)
            .x_label_formatter(&|v| format!("{v:.0}"))
            .y_label_formatter(&|v| format!("{v:.0}"))
            .x_desc("Successes with A")
            .y_desc("Failures with A")
            .draw()
            .map_err(plot_error)?;

        chart
            .draw_series(cells.iter().map(|&(wins, losses, gap)| {
                Rectangle::new(
                    [(wins, losses), (wins + 1.0, losses + 1.0)],
                    diverging_color(gap, max_abs).filled(),
                )
            }))
            .map_err(plot_error)?;

        let annotation = TextStyle::from(("sans-serif", 11).into_font())
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Center));
        chart
            .draw_series(cells.iter().map(|&(wins, losses, gap)| {
                Text::new(
                    cell_label(gap),
                    (wins + 0.5, losses + 0.5),
                    annotation.clone(),
                )
            }))
            .map_err(plot_error)?;

        let mut colorbar = ChartBuilder::on(&bar_area)
            .margin_top(62)
            .margin_bottom(70)
            .margin_right(10)
            .set_label_area_size(LabelAreaPosition::Right, 90)
            .build_cartesian_2d(0.0..1.0, -max_abs..max_abs)
            .map_err(plot_error)?;

        colorbar
            .configure_mesh()
            .disable_mesh()
            .disable_x_axis()
            .y_labels(7)
            .y_label_formatter(&|v| format!("{v:.1}"))
            .y_desc(COLORBAR_LABEL)
            .draw()
            .map_err(plot_error)?;

        colorbar
            .draw_series(
                colorbar_bands(max_abs, COLORBAR_STEPS)
                    .into_iter()
                    .map(|(low, high)| {
                        Rectangle::new(
                            [(0.0, low), (1.0, high)],
                            diverging_color((low + high) / 2.0, max_abs).filled(),
                        )
                    }),
            )
            .map_err(plot_error)?;

        drop(chart);
        drop(colorbar);
        root.present().map_err(plot_error)?;
        drop(root);

        Ok(output_path)
    })
}

/// Percentage histogram of scores with a dashed, labelled line at the mean.
pub fn render_score_histogram(
    dir: &Path,
    report: &PolicyReport,
    horizon: u32,
) -> Result<PathBuf, ReportError> {
    ensure_dir(dir)?;
    let output_path = dir.join(SCORE_PLOT);
    let percents = report.histogram_percent();
    let mean = report.mean_score;
    let caption = format!(
        "Score distribution ({} policy, {} runs)",
        report.policy.label(),
        report.runs
    );

    with_quiet_panics(move || {
        let y_max = percents.iter().copied().fold(0.0f64, f64::max).max(1.0) * 1.1;
        let x_max = f64::from(horizon) + 1.0;

        let root = BitMapBackend::new(&output_path, (800, 480)).into_drawing_area();
        root.fill(&WHITE).map_err(plot_error)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .caption(caption, ("sans-serif", 22))
            .set_label_area_size(LabelAreaPosition::Left, 50)
            .set_label_area_size(LabelAreaPosition::Bottom, 50)
            .build_cartesian_2d(-1.0..x_max, 0.0..y_max)
            .map_err(plot_error)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc("Score")
            .y_desc("% of runs")
            .draw()
            .map_err(plot_error)?;

        chart
            .draw_series(percents.iter().enumerate().map(|(score, &pct)| {
                let x = score as f64;
                Rectangle::new([(x - 0.4, 0.0), (x + 0.4, pct)], STAY.mix(0.8).filled())
            }))
            .map_err(plot_error)?;

        let dash = y_max / 40.0;
        chart
            .draw_series((0..20u32).map(|i| {
                let start = 2.0 * dash * f64::from(i);
                PathElement::new(
                    vec![(mean, start), (mean, (start + dash).min(y_max))],
                    SWITCH.stroke_width(2),
                )
            }))
            .map_err(plot_error)?
            .label(mean_label(mean))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], SWITCH.stroke_width(2)));

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(plot_error)?;

        drop(chart);
        root.present().map_err(plot_error)?;
        drop(root);

        Ok(output_path)
    })
}

fn cell_label(gap: f64) -> String {
    format!("{gap:.1}")
}

fn mean_label(mean: f64) -> String {
    format!("Mean Score: {mean:.2}")
}

/// Splits `[-max_abs, max_abs]` into `steps` contiguous bands, lowest first.
fn colorbar_bands(max_abs: f64, steps: usize) -> Vec<(f64, f64)> {
    let width = 2.0 * max_abs / steps as f64;
    (0..steps)
        .map(|step| {
            let low = -max_abs + width * step as f64;
            let high = if step + 1 == steps { max_abs } else { low + width };
            (low, high)
        })
        .collect()
}

fn diverging_color(gap: f64, max_abs: f64) -> RGBColor {
    let target = if gap < 0.0 { SWITCH } else { STAY };
    let t = (gap.abs() / max_abs).clamp(0.0, 1.0);
    let lerp = |channel: u8| (255.0 + (f64::from(channel) - 255.0) * t).round() as u8;
    RGBColor(lerp(target.0), lerp(target.1), lerp(target.2))
}

fn plot_error(err: impl std::fmt::Display) -> ReportError {
    ReportError::Plot(err.to_string())
}

fn ensure_dir(dir: &Path) -> Result<(), ReportError> {
    if !dir.as_os_str().is_empty() {
        fs::create_dir_all(dir).map_err(|source| ReportError::Io {
            context: "creating plots directory",
            source,
        })?;
    }
    Ok(())
}

/// Runs a plotters closure, converting panics (missing font support) into errors.
fn with_quiet_panics<F>(render: F) -> Result<PathBuf, ReportError>
where
    F: FnOnce() -> Result<PathBuf, ReportError> + std::panic::UnwindSafe,
{
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));
    let attempt = std::panic::catch_unwind(render);
    std::panic::set_hook(prev_hook);

    match attempt {
        Ok(result) => result,
        Err(_) => Err(ReportError::Plot(
            "plotters panicked while rendering (missing font support?)".into(),
        )),
    }
}
