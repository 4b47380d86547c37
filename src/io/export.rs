//! CSV exports of derived tables.
//!
//! Exports are meant to be easy to consume in spreadsheets or downstream scripts:
//! plain numbers (no thousands separators), empty cells for missing values.

use std::fmt::Display;
use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use crate::derive::{Pivot, RippleTable};
use crate::domain::RippleRow;
use crate::error::AppError;

/// Write a pivot as a wide CSV: first column holds the row labels.
pub fn write_pivot_csv<R, C>(
    path: &Path,
    pivot: &Pivot<R, C>,
    row_header: &str,
    with_total: bool,
    fmt_value: fn(f64) -> String,
) -> Result<(), AppError>
where
    R: Ord + Clone + Display,
    C: Ord + Clone + Display,
{
    write_wide(path, pivot, row_header, with_total, |r| r.to_string(), fmt_value)
}

/// Write the months x regions table of annualised change; months are labelled `YYYY-MM`.
pub fn write_ripple_wide_csv(path: &Path, ripple: &RippleTable) -> Result<(), AppError> {
    let pivot = ripple.to_pivot();
    write_wide(path, &pivot, "month", false, |m: &NaiveDate| m.format("%Y-%m").to_string(), fmt_fraction)
}

fn write_wide<R, C>(
    path: &Path,
    pivot: &Pivot<R, C>,
    row_header: &str,
    with_total: bool,
    row_label: impl Fn(&R) -> String,
    fmt_value: fn(f64) -> String,
) -> Result<(), AppError>
where
    R: Ord + Clone,
    C: Ord + Clone + Display,
{
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::usage(format!("Failed to create export CSV '{}': {e}", path.display())))?;

    let mut header: Vec<String> = vec![row_header.to_string()];
    header.extend(pivot.cols().iter().map(|c| c.to_string()));
    if with_total {
        header.push("Total".to_string());
    }
    writer
        .write_record(&header)
        .map_err(|e| AppError::usage(format!("Failed to write export CSV header: {e}")))?;

    for row in pivot.rows() {
        let mut record: Vec<String> = vec![row_label(row)];
        record.extend(
            pivot
                .cols()
                .iter()
                .map(|c| pivot.get(row, c).map(fmt_value).unwrap_or_default()),
        );
        if with_total {
            record.push(fmt_value(pivot.row_total(row)));
        }
        writer
            .write_record(&record)
            .map_err(|e| AppError::usage(format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::usage(format!("Failed to flush export CSV: {e}")))?;
    info!(path = %path.display(), rows = pivot.rows().len(), "wrote CSV export");
    Ok(())
}

/// Write the long ripple table (`month,region,price,lagged_price,pct_change,rank`).
pub fn write_ripple_long_csv(path: &Path, rows: &[RippleRow]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::usage(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::usage(format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::usage(format!("Failed to flush export CSV: {e}")))?;
    info!(path = %path.display(), rows = rows.len(), "wrote ripple rows");
    Ok(())
}

pub fn fmt_count(v: f64) -> String {
    format!("{v:.0}")
}

pub fn fmt_fraction(v: f64) -> String {
    format!("{v:.6}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn pivot_export_has_labels_blanks_and_totals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.csv");
        let pivot = Pivot::from_long(vec![("Camden", 2019, 13.0), ("Hackney", 2020, -2.0)]);

        write_pivot_csv(&path, &pivot, "Borough", true, fmt_count).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["Borough,2019,2020,Total", "Camden,13,,13", "Hackney,,-2,-2"]);
    }

    #[test]
    fn wide_ripple_export_labels_months_like_long_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.csv");
        let row = |month: u32, region: &str, pct_change: f64, rank: u32| RippleRow {
            month: NaiveDate::from_ymd_opt(2020, month, 1).unwrap(),
            region: region.to_string(),
            price: 100.0,
            lagged_price: 90.0,
            pct_change,
            rank,
        };
        let ripple = RippleTable {
            rows: vec![row(1, "London", 0.05, 1), row(1, "North East", 0.01, 2), row(2, "London", 0.04, 1)],
            lag_years: 3,
            rows_without_lag: 0,
            rows_outside_window: 0,
        };

        write_ripple_wide_csv(&path, &ripple).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "month,London,North East",
                "2020-01,0.050000,0.010000",
                "2020-02,0.040000,",
            ]
        );
    }

    #[test]
    fn ripple_export_uses_month_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ripple.csv");
        let rows = vec![RippleRow {
            month: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            region: "London".to_string(),
            price: 460.0,
            lagged_price: 400.0,
            pct_change: 0.05,
            rank: 1,
        }];

        write_ripple_long_csv(&path, &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "month,region,price,lagged_price,pct_change,rank");
        assert_eq!(lines[1], "2020-01,London,460.0,400.0,0.05,1");
    }
}
