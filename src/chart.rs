use std::fmt::Display;
use std::ops::Range;
use std::path::Path;

use chrono::NaiveDate;
use error_stack::Report;
use plotters::prelude::*;
use plotters::style::full_palette::{BLUE_700, GREEN_700, RED_A400};

use crate::analysis::{AnalysisWindow, DerivativeStats};
use crate::error::ChartError;
use crate::indicator::SMOOTHING_PERIOD;
use crate::provider::PAIR_LABEL;

/// Text form of the finite difference drawn in the derivative panel.
pub const FORMULA: &str = "dP/dt ≈ (P(t+1) - P(t-1)) / 2Δt";

const FONT: &str = "sans-serif";
const WHEAT: RGBColor = RGBColor(245, 222, 179);
const LIGHT_BLUE: RGBColor = RGBColor(173, 216, 230);
const MAX_X_LABELS: usize = 10;

fn render_err<E: Display>(stage: &'static str) -> impl FnOnce(E) -> Report<ChartError> {
    move |e| {
        Report::new(ChartError::Render {
            stage: stage.into(),
        })
        .attach(e.to_string())
    }
}

/// Lines of the statistics box.
pub fn stats_lines(stats: &DerivativeStats) -> [String; 5] {
    [
        "Derivative statistics:".to_owned(),
        format!("Mean: {:.6}", stats.mean),
        format!("Std. dev.: {:.6}", stats.std_dev),
        format!("Max: {:.6}", stats.max),
        format!("Min: {:.6}", stats.min),
    ]
}

/// Value range padded so flat or single-point series still get an axis.
fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return -1.0..1.0;
    }
    let span = max - min;
    let pad = if span > 0.0 {
        span * 0.05
    } else {
        (max.abs() * 0.001).max(1e-6)
    };
    (min - pad)..(max + pad)
}

/// Render the price and derivative panels of `window` into a PNG at `path`.
///
/// `window` must not be empty.
pub fn render(
    window: &AnalysisWindow,
    path: &Path,
    (width, height): (u32, u32),
) -> Result<(), Report<ChartError>> {
    let dates: Vec<NaiveDate> = window.series.dates();
    let prices = window.series.close_prices();
    let derivative = &window.analysis.derivative;
    let smoothed = &window.analysis.smoothed;

    let x_range = 0..dates.len().saturating_sub(1).max(1);
    let x_labels = dates.len().clamp(2, MAX_X_LABELS);
    let date_label = |i: &usize| {
        dates
            .get(*i)
            .map(|d| d.format("%m-%d").to_string())
            .unwrap_or_default()
    };

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err("fill background"))?;
    let (upper, lower) = root.split_vertically(height / 2);

    // ── Price panel ───────────────────────────────────────────────────────────
    let mut price_chart = ChartBuilder::on(&upper)
        .caption(
            format!("{PAIR_LABEL} closing price (last {} sessions)", dates.len()),
            (FONT, 26).into_font(),
        )
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(x_range.clone(), padded_range(prices.iter().copied()))
        .map_err(render_err("build price axes"))?;

    price_chart
        .configure_mesh()
        .light_line_style(BLACK.mix(0.05))
        .x_labels(x_labels)
        .x_label_formatter(&date_label)
        .y_label_formatter(&|y| format!("{y:.4}"))
        .y_desc("Price (USD)")
        .draw()
        .map_err(render_err("draw price mesh"))?;

    price_chart
        .draw_series(LineSeries::new(
            prices.iter().enumerate().map(|(i, &p)| (i, p)),
            BLUE_700.stroke_width(2),
        ))
        .map_err(render_err("draw price series"))?
        .label(format!("{PAIR_LABEL} close"))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE_700.stroke_width(2)));

    price_chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .draw()
        .map_err(render_err("draw price legend"))?;

    // ── Derivative panel ──────────────────────────────────────────────────────
    let y_values = derivative
        .iter()
        .copied()
        .chain(smoothed.iter().flatten().copied());

    let mut derivative_chart = ChartBuilder::on(&lower)
        .caption("Price derivative (rate of change)", (FONT, 26).into_font())
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(x_range, padded_range(y_values))
        .map_err(render_err("build derivative axes"))?;

    derivative_chart
        .configure_mesh()
        .light_line_style(BLACK.mix(0.05))
        .x_labels(x_labels)
        .x_label_formatter(&date_label)
        .y_label_formatter(&|y| format!("{y:.5}"))
        .x_desc("Date")
        .y_desc("Rate of change")
        .draw()
        .map_err(render_err("draw derivative mesh"))?;

    derivative_chart
        .draw_series(LineSeries::new(
            derivative.iter().enumerate().map(|(i, &d)| (i, d)),
            RED_A400.mix(0.7).stroke_width(1),
        ))
        .map_err(render_err("draw derivative series"))?
        .label("Derivative")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED_A400));

    // Warm-up entries have no mean and are left out
    derivative_chart
        .draw_series(LineSeries::new(
            smoothed
                .iter()
                .enumerate()
                .filter_map(|(i, v)| v.map(|v| (i, v))),
            GREEN_700.stroke_width(2),
        ))
        .map_err(render_err("draw smoothed series"))?
        .label(format!("{SMOOTHING_PERIOD}-session mean of derivative"))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GREEN_700.stroke_width(2)));

    derivative_chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .draw()
        .map_err(render_err("draw derivative legend"))?;

    // ── Annotations ───────────────────────────────────────────────────────────
    let (_, lower_height) = lower.dim_in_pixel();
    let text_style = (FONT, 16).into_font().color(&BLACK);

    let formula = format!("Formula: {FORMULA}");
    lower
        .draw(&Rectangle::new([(100, 50), (420, 78)], WHEAT.mix(0.8).filled()))
        .map_err(render_err("draw formula box"))?;
    lower
        .draw(&Text::new(formula, (108, 56), text_style.clone()))
        .map_err(render_err("draw formula"))?;

    if let Some(stats) = window.stats() {
        let lines = stats_lines(&stats);
        let line_height = 20;
        let box_height = line_height * lines.len() as i32 + 10;
        let top = lower_height as i32 - 60 - box_height;
        lower
            .draw(&Rectangle::new(
                [(100, top), (330, top + box_height)],
                LIGHT_BLUE.mix(0.8).filled(),
            ))
            .map_err(render_err("draw statistics box"))?;
        for (i, line) in lines.iter().enumerate() {
            lower
                .draw(&Text::new(
                    line.as_str(),
                    (108, top + 6 + line_height * i as i32),
                    text_style.clone(),
                ))
                .map_err(render_err("draw statistics"))?;
        }
    }

    root.present().map_err(render_err("write image"))?;
    Ok(())
}
