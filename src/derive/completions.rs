//! AMR completions tables.
//!
//! Two summaries are derived from completed LDD records:
//!
//! - net completions (proposed minus existing units) by borough and financial year,
//!   with a London total row
//! - gross completions (proposed units) for one financial year by topcoded
//!   bedroom count and tenure

use crate::derive::pivot::Pivot;
use crate::domain::{BedroomBucket, BoroughRow, CompletionRecord, FinancialYear, Tenure};
use crate::error::AppError;

/// Bedroom counts at or above `threshold` collapse into one `"{threshold}+"` bucket.
pub fn topcode_bedrooms(bedrooms: Option<u32>, threshold: u32) -> BedroomBucket {
    match bedrooms {
        None => BedroomBucket::Unknown,
        Some(n) if n >= threshold => BedroomBucket::AtLeast(threshold),
        Some(n) => BedroomBucket::Count(n),
    }
}

/// Net completions by borough and financial year, plus a London total row.
pub fn net_by_borough_year(records: &[CompletionRecord]) -> Pivot<BoroughRow, FinancialYear> {
    let boroughs = records
        .iter()
        .map(|r| (BoroughRow::Borough(r.borough.clone()), r.financial_year, r.net_units() as f64));
    let totals = records
        .iter()
        .map(|r| (BoroughRow::LondonTotal, r.financial_year, r.net_units() as f64));
    Pivot::from_long(boroughs.chain(totals))
}

/// Latest financial year with any completions.
pub fn latest_year(records: &[CompletionRecord]) -> Option<FinancialYear> {
    records.iter().map(|r| r.financial_year).max()
}

/// Gross completions by bedroom bucket and tenure for a single financial year.
#[derive(Debug, Clone)]
pub struct BedroomTenureTable {
    pub year: FinancialYear,
    pub topcode: u32,
    pub pivot: Pivot<BedroomBucket, Tenure>,
}

impl BedroomTenureTable {
    /// Share of all gross completions in the year that fall in `bucket`.
    pub fn row_share(&self, bucket: &BedroomBucket) -> Option<f64> {
        let total = self.pivot.grand_total();
        if total == 0.0 {
            return None;
        }
        Some(self.pivot.row_total(bucket) / total)
    }
}

pub fn gross_by_bedrooms_tenure(
    records: &[CompletionRecord],
    year: Option<FinancialYear>,
    topcode: u32,
) -> Result<BedroomTenureTable, AppError> {
    if topcode == 0 {
        return Err(AppError::usage("`--topcode` must be at least 1."));
    }

    let year = match year {
        Some(y) => y,
        None => latest_year(records).ok_or_else(|| AppError::no_data("No completions to summarise."))?,
    };

    let pivot = Pivot::from_long(records.iter().filter(|r| r.financial_year == year).map(|r| {
        (
            topcode_bedrooms(r.bedrooms, topcode),
            r.tenure.clone(),
            r.gross_units() as f64,
        )
    }));

    if pivot.is_empty() {
        return Err(AppError::no_data(format!("No completions recorded in financial year {year}.")));
    }

    Ok(BedroomTenureTable { year, topcode, pivot })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(borough: &str, date: (i32, u32, u32), tenure: &str, beds: Option<u32>, proposed: i64, existing: i64) -> CompletionRecord {
        let completed_on = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        CompletionRecord {
            borough: borough.to_string(),
            completed_on,
            financial_year: FinancialYear::containing(completed_on),
            tenure: Tenure::new(tenure),
            bedrooms: beds,
            proposed_units: proposed,
            existing_units: existing,
        }
    }

    fn sample() -> Vec<CompletionRecord> {
        vec![
            record("Camden", (2019, 6, 1), "Market", Some(1), 10, 2),
            record("Camden", (2020, 2, 1), "Social Rent", Some(2), 5, 0),
            record("Camden", (2020, 5, 1), "Market", Some(6), 3, 0),
            record("Hackney", (2019, 9, 1), "Intermediate", Some(4), 7, 1),
            record("Hackney", (2020, 7, 1), "market", None, 2, 4),
        ]
    }

    #[test]
    fn topcode_buckets() {
        assert_eq!(topcode_bedrooms(Some(1), 4), BedroomBucket::Count(1));
        assert_eq!(topcode_bedrooms(Some(3), 4), BedroomBucket::Count(3));
        assert_eq!(topcode_bedrooms(Some(4), 4), BedroomBucket::AtLeast(4));
        assert_eq!(topcode_bedrooms(Some(9), 4), BedroomBucket::AtLeast(4));
        assert_eq!(topcode_bedrooms(None, 4), BedroomBucket::Unknown);
        assert_eq!(topcode_bedrooms(Some(0), 1), BedroomBucket::Count(0));
    }

    #[test]
    fn net_table_has_london_total_row() {
        let pivot = net_by_borough_year(&sample());
        let camden = BoroughRow::Borough("Camden".to_string());
        let hackney = BoroughRow::Borough("Hackney".to_string());

        assert_eq!(pivot.rows().last(), Some(&BoroughRow::LondonTotal));
        assert_eq!(pivot.cols(), &[FinancialYear(2019), FinancialYear(2020)]);
        assert_eq!(pivot.get(&camden, &FinancialYear(2019)), Some(13.0));
        assert_eq!(pivot.get(&hackney, &FinancialYear(2020)), Some(-2.0));
        assert_eq!(pivot.get(&BoroughRow::LondonTotal, &FinancialYear(2019)), Some(19.0));
        assert_eq!(pivot.get(&BoroughRow::LondonTotal, &FinancialYear(2020)), Some(1.0));
    }

    #[test]
    fn bedroom_table_defaults_to_latest_year() {
        let table = gross_by_bedrooms_tenure(&sample(), None, 4).unwrap();
        assert_eq!(table.year, FinancialYear(2020));
        assert_eq!(table.pivot.rows(), &[BedroomBucket::AtLeast(4), BedroomBucket::Unknown]);
        assert_eq!(table.pivot.cols(), &[Tenure::new("Market")]);
        assert_eq!(table.pivot.grand_total(), 5.0);
        let share = table.row_share(&BedroomBucket::AtLeast(4)).unwrap();
        assert!((share - 0.6).abs() < 1e-12);
    }

    #[test]
    fn bedroom_table_for_explicit_year() {
        let table = gross_by_bedrooms_tenure(&sample(), Some(FinancialYear(2019)), 4).unwrap();
        assert_eq!(
            table.pivot.rows(),
            &[BedroomBucket::Count(1), BedroomBucket::Count(2), BedroomBucket::AtLeast(4)]
        );
        let tenures: Vec<&str> = table.pivot.cols().iter().map(Tenure::as_str).collect();
        assert_eq!(tenures, vec!["Market", "Social Rent", "Intermediate"]);
        assert_eq!(table.pivot.get(&BedroomBucket::AtLeast(4), &Tenure::new("Intermediate")), Some(7.0));
    }

    #[test]
    fn bedroom_table_errors() {
        let err = gross_by_bedrooms_tenure(&sample(), Some(FinancialYear(2001)), 4).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        let err = gross_by_bedrooms_tenure(&sample(), None, 0).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
