//! Reporting: tables built from derived data, rendered to text or HTML.
//!
//! Builders here turn pivots into a presentation-neutral `Table` (strings
//! only, numbers already formatted). `format` renders tables and run
//! summaries for the terminal, `html` renders the same tables to a document.

use crate::derive::{BedroomTenureTable, Pivot, RippleTable};
use crate::domain::{BoroughRow, FinancialYear};

pub mod format;
pub mod html;

pub use format::*;
pub use html::*;

/// A rendered-ready table: caption, header row, body rows and an optional footer row.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub caption: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Totals row, rendered visually separated from the body.
    pub footer: Option<Vec<String>>,
}

/// Net completions by borough (rows) and financial year (columns).
pub fn net_completions_table(pivot: &Pivot<BoroughRow, FinancialYear>) -> Table {
    let mut headers = vec!["Borough".to_string()];
    headers.extend(pivot.cols().iter().map(|y| y.to_string()));
    headers.push("Total".to_string());

    let mut rows = Vec::new();
    let mut footer = None;
    for row in pivot.rows() {
        let mut cells = vec![row.to_string()];
        cells.extend(
            pivot
                .cols()
                .iter()
                .map(|c| pivot.get(row, c).map(fmt_thousands).unwrap_or_default()),
        );
        cells.push(fmt_thousands(pivot.row_total(row)));
        if *row == BoroughRow::LondonTotal {
            footer = Some(cells);
        } else {
            rows.push(cells);
        }
    }

    Table {
        caption: "Net conventional completions by borough and financial year".to_string(),
        headers,
        rows,
        footer,
    }
}

/// Gross completions by topcoded bedroom count (rows) and tenure (columns).
pub fn bedroom_tenure_table(table: &BedroomTenureTable) -> Table {
    let pivot = &table.pivot;
    let mut headers = vec!["Bedrooms".to_string()];
    headers.extend(pivot.cols().iter().map(|t| t.to_string()));
    headers.push("Total".to_string());
    headers.push("Share".to_string());

    let rows = pivot
        .rows()
        .iter()
        .map(|bucket| {
            let mut cells = vec![bucket.to_string()];
            cells.extend(
                pivot
                    .cols()
                    .iter()
                    .map(|c| pivot.get(bucket, c).map(fmt_thousands).unwrap_or_default()),
            );
            cells.push(fmt_thousands(pivot.row_total(bucket)));
            cells.push(table.row_share(bucket).map(fmt_percent).unwrap_or_default());
            cells
        })
        .collect();

    let mut footer = vec!["Total".to_string()];
    footer.extend(pivot.cols().iter().map(|c| fmt_thousands(pivot.col_total(c))));
    footer.push(fmt_thousands(pivot.grand_total()));
    footer.push(if pivot.grand_total() == 0.0 { String::new() } else { fmt_percent(1.0) });

    Table {
        caption: format!(
            "Gross completions by number of bedrooms and tenure, {} ({}+ bedrooms grouped)",
            table.year, table.topcode
        ),
        headers,
        rows,
        footer: Some(footer),
    }
}

/// Latest month of the ripple table: one row per region in price order.
pub fn ripple_latest_table(ripple: &RippleTable) -> Table {
    let month = ripple
        .last_month()
        .map(|m| m.format("%b %Y").to_string())
        .unwrap_or_default();

    let headers = vec![
        "Region".to_string(),
        "Rank".to_string(),
        "Average price".to_string(),
        format!("Price {}y earlier", ripple.lag_years),
        "Annualised change".to_string(),
    ];

    let rows = ripple
        .latest()
        .into_iter()
        .map(|r| {
            vec![
                r.region.clone(),
                r.rank.to_string(),
                fmt_pounds(r.price),
                fmt_pounds(r.lagged_price),
                fmt_percent(r.pct_change),
            ]
        })
        .collect();

    Table {
        caption: format!("Annualised {}-year house price change, {month}", ripple.lag_years),
        headers,
        rows,
        footer: None,
    }
}

/// Integer with thousands separators, e.g. `-12,345`.
pub fn fmt_thousands(v: f64) -> String {
    let rounded = v.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0 {
        out.insert(0, '-');
    }
    out
}

/// Fraction as a one-decimal percentage, e.g. `0.0512` -> `5.1%`.
pub fn fmt_percent(v: f64) -> String {
    format!("{:.1}%", v * 100.0)
}

pub fn fmt_pounds(v: f64) -> String {
    format!("£{}", fmt_thousands(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::{gross_by_bedrooms_tenure, net_by_borough_year};
    use crate::domain::{CompletionRecord, Tenure};
    use chrono::NaiveDate;

    fn record(borough: &str, tenure: &str, beds: u32, proposed: i64, existing: i64) -> CompletionRecord {
        let completed_on = NaiveDate::from_ymd_opt(2020, 6, 1).unwrap();
        CompletionRecord {
            borough: borough.to_string(),
            completed_on,
            financial_year: FinancialYear::containing(completed_on),
            tenure: Tenure::new(tenure),
            bedrooms: Some(beds),
            proposed_units: proposed,
            existing_units: existing,
        }
    }

    #[test]
    fn number_formatting() {
        assert_eq!(fmt_thousands(0.0), "0");
        assert_eq!(fmt_thousands(999.0), "999");
        assert_eq!(fmt_thousands(1234.4), "1,234");
        assert_eq!(fmt_thousands(-1234567.0), "-1,234,567");
        assert_eq!(fmt_percent(0.0512), "5.1%");
        assert_eq!(fmt_percent(-0.1), "-10.0%");
        assert_eq!(fmt_pounds(480000.0), "£480,000");
    }

    #[test]
    fn net_table_moves_london_total_to_footer() {
        let records = vec![record("Camden", "Market", 1, 1500, 0), record("Hackney", "Market", 2, 20, 30)];
        let table = net_completions_table(&net_by_borough_year(&records));

        assert_eq!(table.headers, vec!["Borough", "2020/21", "Total"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["Hackney", "-10", "-10"]);
        assert_eq!(table.footer, Some(vec!["London".to_string(), "1,490".to_string(), "1,490".to_string()]));
    }

    #[test]
    fn bedroom_table_has_shares_and_totals() {
        let records = vec![
            record("Camden", "Market", 1, 30, 0),
            record("Camden", "Social Rent", 5, 10, 0),
        ];
        let derived = gross_by_bedrooms_tenure(&records, None, 4).unwrap();
        let table = bedroom_tenure_table(&derived);

        assert_eq!(table.headers, vec!["Bedrooms", "Market", "Social Rent", "Total", "Share"]);
        assert_eq!(table.rows[0], vec!["1", "30", "", "30", "75.0%"]);
        assert_eq!(table.rows[1], vec!["4+", "", "10", "10", "25.0%"]);
        assert_eq!(
            table.footer,
            Some(vec!["Total".to_string(), "30".to_string(), "10".to_string(), "40".to_string(), "100.0%".to_string()])
        );
        assert!(table.caption.contains("2020/21"));
    }

    #[test]
    fn latest_ripple_table_lists_regions_by_rank_with_percentages() {
        use crate::domain::RippleRow;

        let row = |month: u32, region: &str, price: f64, lagged_price: f64, pct_change: f64, rank: u32| RippleRow {
            month: NaiveDate::from_ymd_opt(2020, month, 1).unwrap(),
            region: region.to_string(),
            price,
            lagged_price,
            pct_change,
            rank,
        };
        let ripple = RippleTable {
            rows: vec![
                row(1, "London", 500_000.0, 440_000.0, 0.045, 1),
                row(1, "North East", 150_000.0, 135_000.0, 0.037, 2),
                row(2, "London", 505_000.0, 445_000.0, 0.0449, 1),
                row(2, "North East", 152_000.0, 160_000.0, -0.0167, 2),
            ],
            lag_years: 3,
            rows_without_lag: 0,
            rows_outside_window: 0,
        };

        let table = ripple_latest_table(&ripple);

        assert_eq!(table.caption, "Annualised 3-year house price change, Feb 2020");
        assert_eq!(table.headers[3], "Price 3y earlier");
        assert_eq!(
            table.rows,
            vec![
                vec!["London", "1", "£505,000", "£445,000", "4.5%"],
                vec!["North East", "2", "£152,000", "£160,000", "-1.7%"],
            ]
        );
    }
}
