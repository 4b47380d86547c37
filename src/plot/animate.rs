//! Animated ripple chart (GIF) rendered with Plotters.
//!
//! Each frame shows every region's annualised change from the start of the
//! window up to the frame month. Regions are coloured on a gradient from the
//! most expensive (red) to the least expensive (blue), so growth that starts
//! in the red lines and later moves to the blue ones is the ripple.
//!
//! Plotters draws text through a registered font. Axis labels, caption and
//! legend are only drawn when a font file is supplied; otherwise frames
//! carry the series and the zero line only.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::{FontStyle, register_font};
use tracing::{debug, info};

use crate::derive::RippleTable;
use crate::domain::AnimationConfig;
use crate::error::AppError;

const FONT_FAMILY: &str = "sans-serif";
const EXPENSIVE: (u8, u8, u8) = (178, 24, 43);
const CHEAP: (u8, u8, u8) = (33, 102, 172);

struct Series {
    region: String,
    color: RGBColor,
    /// `(month index, annualised change)` in month order.
    points: Vec<(f64, f64)>,
}

/// Render the animation to `config.path`. Returns the number of frames written.
pub fn render_ripple_gif(ripple: &RippleTable, config: &AnimationConfig) -> Result<usize, AppError> {
    if config.step_months == 0 {
        return Err(AppError::usage("`--step` must be at least 1."));
    }
    if config.width < 64 || config.height < 64 {
        return Err(AppError::usage("GIF dimensions must be at least 64x64 pixels."));
    }

    let months = ripple.months();
    let (lo, hi) = ripple
        .change_range()
        .ok_or_else(|| AppError::no_data("Nothing to animate."))?;
    let (lo, hi) = pad_range(lo, hi);

    let labels = match &config.font {
        Some(path) => {
            load_font(path)?;
            true
        }
        None => false,
    };

    let series = build_series(ripple, &months);
    let frames = frame_ends(months.len(), config.step_months as usize);

    let root = BitMapBackend::gif(&config.path, (config.width, config.height), config.frame_delay_ms)
        .map_err(|e| AppError::external(format!("Failed to create GIF '{}': {e}", config.path.display())))?
        .into_drawing_area();

    let frame_ctx = FrameContext {
        months: &months,
        series: &series,
        y_range: (lo, hi),
        lag_years: ripple.lag_years,
        labels,
    };

    for &end in &frames {
        draw_frame(&root, &frame_ctx, end).map_err(render_err)?;
        root.present().map_err(render_err)?;
        debug!(frame_month = %months[end].format("%Y-%m"), "frame drawn");
    }

    info!(path = %config.path.display(), frames = frames.len(), "wrote ripple animation");
    Ok(frames.len())
}

struct FrameContext<'a> {
    months: &'a [NaiveDate],
    series: &'a [Series],
    y_range: (f64, f64),
    lag_years: u32,
    labels: bool,
}

fn draw_frame<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    ctx: &FrameContext<'_>,
    end: usize,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;

    let x_max = (ctx.months.len().saturating_sub(1)).max(1) as f64;
    let (lo, hi) = ctx.y_range;

    let mut builder = ChartBuilder::on(root);
    builder.margin(10);
    if ctx.labels {
        let caption = format!(
            "Annualised {}-year house price change, {}",
            ctx.lag_years,
            ctx.months[end].format("%b %Y")
        );
        builder
            .caption(caption, (FONT_FAMILY, 22))
            .set_label_area_size(LabelAreaPosition::Left, 55)
            .set_label_area_size(LabelAreaPosition::Bottom, 40);
    }
    let mut chart = builder.build_cartesian_2d(0f64..x_max, lo..hi)?;

    if ctx.labels {
        let months = ctx.months;
        chart
            .configure_mesh()
            .x_labels(8)
            .y_labels(8)
            .x_label_formatter(&|v| month_label(months, *v))
            .y_label_formatter(&|v| format!("{:.0}%", v * 100.0))
            .y_desc(format!("% per year over {} years", ctx.lag_years))
            .label_style((FONT_FAMILY, 13))
            .draw()?;
    }

    if lo < 0.0 && hi > 0.0 {
        chart.draw_series(LineSeries::new(vec![(0.0, 0.0), (x_max, 0.0)], &BLACK.mix(0.4)))?;
    }

    for s in ctx.series {
        let visible: Vec<(f64, f64)> = s.points.iter().copied().filter(|(x, _)| *x <= end as f64).collect();
        let color = s.color;
        let drawn = chart.draw_series(LineSeries::new(visible, color.stroke_width(2)))?;
        if ctx.labels {
            drawn
                .label(s.region.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }
    }

    if ctx.labels {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .label_font((FONT_FAMILY, 12))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    Ok(())
}

fn build_series(ripple: &RippleTable, months: &[NaiveDate]) -> Vec<Series> {
    let regions = ripple.region_order();
    let n = regions.len();
    regions
        .into_iter()
        .enumerate()
        .map(|(i, region)| {
            let points = ripple
                .series(&region)
                .into_iter()
                .filter_map(|(month, v)| months.binary_search(&month).ok().map(|idx| (idx as f64, v)))
                .collect();
            Series {
                color: gradient(i, n),
                region,
                points,
            }
        })
        .collect()
}

/// Month indices that end a frame: every `step`-th month, always including the last.
pub fn frame_ends(n_months: usize, step: usize) -> Vec<usize> {
    if n_months == 0 || step == 0 {
        return Vec::new();
    }
    let mut ends: Vec<usize> = (0..n_months).step_by(step).collect();
    if ends.last() != Some(&(n_months - 1)) {
        ends.push(n_months - 1);
    }
    ends
}

/// Colour of the `i`-th of `n` regions, most expensive first.
fn gradient(i: usize, n: usize) -> RGBColor {
    let t = if n <= 1 { 0.0 } else { i as f64 / (n - 1) as f64 };
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    RGBColor(lerp(EXPENSIVE.0, CHEAP.0), lerp(EXPENSIVE.1, CHEAP.1), lerp(EXPENSIVE.2, CHEAP.2))
}

fn month_label(months: &[NaiveDate], v: f64) -> String {
    let idx = v.round();
    if idx < 0.0 {
        return String::new();
    }
    months
        .get(idx as usize)
        .map(|m| m.format("%Y").to_string())
        .unwrap_or_default()
}

fn pad_range(lo: f64, hi: f64) -> (f64, f64) {
    let pad = ((hi - lo).abs() * 0.05).max(1e-3);
    (lo - pad, hi + pad)
}

fn load_font(path: &Path) -> Result<(), AppError> {
    let bytes = fs::read(path)
        .map_err(|e| AppError::usage(format!("Failed to read font '{}': {e}", path.display())))?;
    // Plotters keeps registered fonts for the life of the process.
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    register_font(FONT_FAMILY, FontStyle::Normal, bytes)
        .map_err(|_| AppError::usage(format!("'{}' is not a usable TTF/OTF font.", path.display())))?;
    Ok(())
}

fn render_err<E: std::fmt::Display>(e: E) -> AppError {
    AppError::external(format!("Failed to render ripple animation: {e}"))
}
