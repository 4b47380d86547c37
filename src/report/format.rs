//! Terminal output: run summaries and fixed-width text tables.
//!
//! Formatting lives in one place so the derive code stays free of
//! presentation concerns and output changes stay localized.

use crate::derive::{BedroomTenureTable, RippleTable};
use crate::domain::{CompletionsConfig, RippleConfig};
use crate::io::{CompletionTable, PriceTable, RowError};
use crate::report::Table;

/// How many row errors to list before summarising the rest.
const MAX_LISTED_ERRORS: usize = 5;

/// Render a table with a caption, left-aligned first column and right-aligned values.
pub fn format_table(table: &Table) -> String {
    let n_cols = table
        .headers
        .len()
        .max(table.rows.iter().map(Vec::len).max().unwrap_or(0));

    let mut widths = vec![0usize; n_cols];
    let all_rows = std::iter::once(&table.headers)
        .chain(table.rows.iter())
        .chain(table.footer.iter());
    for row in all_rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    out.push_str(&table.caption);
    out.push('\n');
    out.push_str(&format_row(&table.headers, &widths));
    out.push_str(&separator(&widths));
    for row in &table.rows {
        out.push_str(&format_row(row, &widths));
    }
    if let Some(footer) = &table.footer {
        out.push_str(&separator(&widths));
        out.push_str(&format_row(footer, &widths));
    }
    out
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    let mut parts = Vec::with_capacity(widths.len());
    for (i, &width) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        if i == 0 {
            parts.push(format!("{cell:<width$}"));
        } else {
            parts.push(format!("{cell:>width$}"));
        }
    }
    let mut line = parts.join("  ").trim_end().to_string();
    line.push('\n');
    line
}

fn separator(widths: &[usize]) -> String {
    let parts: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    format!("{}\n", parts.join("  "))
}

/// Summary of a ripple run: input coverage, window and what was dropped.
pub fn format_ripple_summary(prices: &PriceTable, ripple: &RippleTable, config: &RippleConfig) -> String {
    let mut out = String::new();
    out.push_str("=== housing - regional ripple (house price index) ===\n");
    out.push_str(&format!(
        "Regions: {} | lag: {} year(s)\n",
        config.regions.len(),
        config.lag_years
    ));
    out.push_str(&format!(
        "Rows: read={} used={} errors={}\n",
        prices.rows_read,
        prices.rows_used,
        prices.row_errors.len()
    ));
    if let (Some(first), Some(last)) = (ripple.first_month(), ripple.last_month()) {
        out.push_str(&format!(
            "Window: {} .. {} ({} months)\n",
            first.format("%Y-%m"),
            last.format("%Y-%m"),
            ripple.months().len()
        ));
    }
    out.push_str(&format!(
        "Dropped: without lagged price={} outside window={}\n",
        ripple.rows_without_lag, ripple.rows_outside_window
    ));
    if !prices.missing_regions.is_empty() {
        out.push_str(&format!("Not found in file: {}\n", prices.missing_regions.join(", ")));
    }
    out.push_str(&format_row_errors(&prices.row_errors));
    out
}

/// Summary of a completions run.
pub fn format_completions_summary(
    completions: &CompletionTable,
    bedrooms: &BedroomTenureTable,
    config: &CompletionsConfig,
) -> String {
    let mut out = String::new();
    out.push_str("=== housing - LDD completions (AMR tables) ===\n");
    out.push_str(&format!(
        "Rows: read={} completed={} not completed={} errors={}\n",
        completions.rows_read,
        completions.rows_used,
        completions.rows_dropped,
        completions.row_errors.len()
    ));
    out.push_str(&format!(
        "Bedroom table: {} | topcode: {}+\n",
        bedrooms.year, config.topcode
    ));
    out.push_str(&format_row_errors(&completions.row_errors));
    out
}

fn format_row_errors(errors: &[RowError]) -> String {
    let mut out = String::new();
    for e in errors.iter().take(MAX_LISTED_ERRORS) {
        out.push_str(&format!("  line {}: {}\n", e.line, e.message));
    }
    if errors.len() > MAX_LISTED_ERRORS {
        out.push_str(&format!("  ... and {} more\n", errors.len() - MAX_LISTED_ERRORS));
    }
    out
}
