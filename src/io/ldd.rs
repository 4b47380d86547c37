//! LDD completions ingest.
//!
//! Each CSV row is one line of a permission (a borough, a tenure, a bedroom
//! count and proposed/existing unit counts). Only completed lines, i.e. rows
//! with a completion date, take part in the AMR tables.

use std::path::Path;

use crate::domain::{CompletionRecord, FinancialYear, Tenure};
use crate::error::AppError;
use crate::io::ingest::{HeaderMap, RowError, get_optional, get_required, open_csv, parse_count, parse_date, record_line};

const BOROUGH_COLUMN: &[&str] = &["borough", "borough_name"];
const COMPLETION_DATE_COLUMN: &[&str] = &["completion_date", "date_work_completed"];
const TENURE_COLUMN: &[&str] = &["tenure", "unit_tenure"];
const BEDROOMS_COLUMN: &[&str] = &["bedrooms", "number_of_bedrooms", "bedroom_count"];
const PROPOSED_COLUMN: &[&str] = &["proposed_units", "proposed"];
const EXISTING_COLUMN: &[&str] = &["existing_units", "existing"];

/// Ingest output: completed records plus row diagnostics.
#[derive(Debug, Clone)]
pub struct CompletionTable {
    pub records: Vec<CompletionRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
    /// Rows skipped because they have no completion date.
    pub rows_dropped: usize,
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    borough: usize,
    completion_date: usize,
    tenure: Option<usize>,
    bedrooms: Option<usize>,
    proposed: usize,
    existing: Option<usize>,
}

impl Columns {
    fn resolve(headers: &HeaderMap) -> Result<Self, AppError> {
        Ok(Self {
            borough: headers.require(BOROUGH_COLUMN)?,
            completion_date: headers.require(COMPLETION_DATE_COLUMN)?,
            tenure: headers.find(TENURE_COLUMN),
            bedrooms: headers.find(BEDROOMS_COLUMN),
            proposed: headers.require(PROPOSED_COLUMN)?,
            existing: headers.find(EXISTING_COLUMN),
        })
    }
}

/// Load completed records from an LDD CSV extract.
pub fn load_completions(path: &Path) -> Result<CompletionTable, AppError> {
    let (mut reader, headers) = open_csv(path)?;
    let cols = Columns::resolve(&headers)?;

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;
    let mut rows_dropped = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let fallback = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line: record_line(e.position(), fallback),
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };
        let line = record_line(record.position(), fallback);

        if get_optional(&record, Some(cols.completion_date)).is_none() {
            rows_dropped += 1;
            continue;
        }

        match parse_row(&record, cols) {
            Ok(r) => records.push(r),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    let rows_used = records.len();
    if rows_used == 0 {
        return Err(AppError::no_data("No completed rows found in the LDD extract."));
    }

    Ok(CompletionTable {
        records,
        row_errors,
        rows_read,
        rows_used,
        rows_dropped,
    })
}

fn parse_row(record: &csv::StringRecord, cols: Columns) -> Result<CompletionRecord, String> {
    let borough = get_required(record, cols.borough, "borough")?.to_string();
    let completed_on = parse_date(get_required(record, cols.completion_date, "completion_date")?)?;

    let tenure = Tenure::new(get_optional(record, cols.tenure).unwrap_or(""));

    let bedrooms = match get_optional(record, cols.bedrooms) {
        None => None,
        Some(raw) => {
            let n = parse_count(raw).ok_or_else(|| format!("Invalid `bedrooms` value '{raw}'."))?;
            Some(u32::try_from(n).map_err(|_| format!("Negative `bedrooms` value '{raw}'."))?)
        }
    };

    let raw = get_required(record, cols.proposed, "proposed_units")?;
    let proposed_units = parse_count(raw).ok_or_else(|| format!("Invalid `proposed_units` value '{raw}'."))?;

    let existing_units = match get_optional(record, cols.existing) {
        None => 0,
        Some(raw) => parse_count(raw).ok_or_else(|| format!("Invalid `existing_units` value '{raw}'."))?,
    };

    if proposed_units < 0 || existing_units < 0 {
        return Err("Unit counts must not be negative.".to_string());
    }

    Ok(CompletionRecord {
        borough,
        completed_on,
        financial_year: FinancialYear::containing(completed_on),
        tenure,
        bedrooms,
        proposed_units,
        existing_units,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_completed_rows_and_drops_incomplete() {
        let file = write_csv(
            "Borough_Name,Date_Work_Completed,Unit_Tenure,Number_of_Bedrooms,Proposed,Existing\n\
             Camden,15/06/2019,Market,2,10,1\n\
             Camden,,Market,2,8,0\n\
             Hackney,2020-03-31,social rent,5,4,\n",
        );
        let table = load_completions(file.path()).unwrap();

        assert_eq!(table.rows_read, 3);
        assert_eq!(table.rows_used, 2);
        assert_eq!(table.rows_dropped, 1);
        assert!(table.row_errors.is_empty());

        let camden = &table.records[0];
        assert_eq!(camden.financial_year, FinancialYear(2019));
        assert_eq!(camden.net_units(), 9);
        assert_eq!(camden.gross_units(), 10);

        let hackney = &table.records[1];
        assert_eq!(hackney.financial_year, FinancialYear(2019));
        assert_eq!(hackney.tenure.as_str(), "Social Rent");
        assert_eq!(hackney.bedrooms, Some(5));
        assert_eq!(hackney.existing_units, 0);
    }

    #[test]
    fn optional_columns_default() {
        let file = write_csv("borough,completion_date,proposed_units\nBarnet,2021-05-01,3\n");
        let table = load_completions(file.path()).unwrap();
        let r = &table.records[0];
        assert_eq!(r.tenure.as_str(), "Unknown");
        assert_eq!(r.bedrooms, None);
        assert_eq!(r.existing_units, 0);
    }

    #[test]
    fn invalid_values_become_row_errors() {
        let file = write_csv(
            "borough,completion_date,tenure,bedrooms,proposed_units\n\
             Barnet,2021-05-01,Market,two,3\n\
             Barnet,2021-05-01,Market,-1,3\n\
             Barnet,2021-05-01,Market,1,x\n\
             Barnet,2021-05-01,Market,1,3\n",
        );
        let table = load_completions(file.path()).unwrap();
        assert_eq!(table.rows_used, 1);
        assert_eq!(table.row_errors.len(), 3);
        assert!(table.row_errors[0].message.contains("bedrooms"));
    }

    #[test]
    fn missing_required_column_is_schema_error() {
        let file = write_csv("borough,tenure,proposed_units\nBarnet,Market,3\n");
        let err = load_completions(file.path()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("completion_date"));
    }

    #[test]
    fn nothing_completed_is_no_data() {
        let file = write_csv("borough,completion_date,proposed_units\nBarnet,,3\n");
        let err = load_completions(file.path()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
