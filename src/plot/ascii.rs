//! ASCII plotting of the ripple table for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - one glyph per region (`1`..`9`, then `a`..`z`), most expensive region first
//! - zero-growth line: `.`
//! - legend below the grid

use chrono::NaiveDate;

use crate::derive::RippleTable;

const GLYPHS: &str = "123456789abcdefghijklmnopqrstuvwxyz";
const ZERO: char = '.';

/// Render every region's annualised change over the whole table.
pub fn render_ripple_plot(ripple: &RippleTable, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let months = ripple.months();
    let Some((y_min, y_max)) = ripple.change_range() else {
        return "Plot: no data\n".to_string();
    };
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);
    let n_months = months.len();

    let mut grid = vec![vec![' '; width]; height];

    if y_min < 0.0 && y_max > 0.0 {
        let zy = map_y(0.0, y_min, y_max, height);
        for cell in grid[zy].iter_mut() {
            *cell = ZERO;
        }
    }

    let regions = ripple.region_order();
    for (region, glyph) in regions.iter().zip(GLYPHS.chars()) {
        let series = ripple.series(region);
        let points: Vec<(usize, usize)> = series
            .iter()
            .filter_map(|(month, v)| {
                let idx = month_index(&months, *month)?;
                Some((map_x(idx, n_months, width), map_y(*v, y_min, y_max, height)))
            })
            .collect();
        draw_series(&mut grid, &points, glyph);
    }

    let mut out = String::new();
    if let (Some(first), Some(last)) = (months.first(), months.last()) {
        out.push_str(&format!(
            "Plot: months=[{}, {}] | change=[{:.1}%, {:.1}%] per year\n",
            first.format("%Y-%m"),
            last.format("%Y-%m"),
            y_min * 100.0,
            y_max * 100.0
        ));
    }

    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }

    for (region, glyph) in regions.iter().zip(GLYPHS.chars()) {
        out.push_str(&format!("  {glyph} {region}\n"));
    }
    if regions.len() > GLYPHS.len() {
        out.push_str(&format!("  ({} more regions not drawn)\n", regions.len() - GLYPHS.len()));
    }

    out
}

fn month_index(months: &[NaiveDate], month: NaiveDate) -> Option<usize> {
    months.binary_search(&month).ok()
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-6);
    (min - pad, max + pad)
}

fn map_x(idx: usize, n: usize, width: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let u = idx as f64 / (n as f64 - 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_series(grid: &mut [Vec<char>], points: &[(usize, usize)], glyph: char) {
    let mut prev = None;
    for &(x, y) in points {
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, y, glyph),
            None => plot(grid, x as isize, y as isize, glyph),
        }
        prev = Some((x, y));
    }
}

// Earlier (more expensive) regions win where lines overlap; only the zero line is overdrawn.
fn plot(grid: &mut [Vec<char>], x: isize, y: isize, glyph: char) {
    if y < 0 || x < 0 {
        return;
    }
    let Some(row) = grid.get_mut(y as usize) else { return };
    if let Some(cell) = row.get_mut(x as usize) {
        if *cell == ' ' || *cell == ZERO {
            *cell = glyph;
        }
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, glyph: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        plot(grid, x0, y0, glyph);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
