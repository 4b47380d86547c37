//! House price index ingest.
//!
//! Reads the HPI "full file" CSV and keeps the `(region, month, average price)`
//! observations for the selected regions. Everything else in the file
//! (indices, sales volumes, property-type splits) is ignored.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use chrono::NaiveDate;

use crate::domain::{PriceObservation, month_start};
use crate::error::AppError;
use crate::io::ingest::{RowError, get_optional, get_required, open_csv, parse_date, parse_number, record_line};

const DATE_COLUMN: &[&str] = &["date"];
const REGION_COLUMN: &[&str] = &["regionname", "region_name", "region"];
const PRICE_COLUMN: &[&str] = &["averageprice", "average_price"];
const AREA_CODE_COLUMN: &[&str] = &["areacode", "area_code"];

/// Ingest output: observations sorted by `(region, month)` plus row diagnostics.
#[derive(Debug, Clone)]
pub struct PriceTable {
    pub observations: Vec<PriceObservation>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
    /// Selected regions that never appeared in the file.
    pub missing_regions: Vec<String>,
}

/// Load average prices for `regions` (matched case-insensitively).
pub fn load_prices(path: &Path, regions: &[String]) -> Result<PriceTable, AppError> {
    let (mut reader, headers) = open_csv(path)?;

    let date_idx = headers.require(DATE_COLUMN)?;
    let region_idx = headers.require(REGION_COLUMN)?;
    let price_idx = headers.require(PRICE_COLUMN)?;
    let area_idx = headers.find(AREA_CODE_COLUMN);

    let wanted: HashSet<String> = regions.iter().map(|r| r.trim().to_ascii_lowercase()).collect();

    // Keyed by (region, month) so duplicates collapse and output is ordered.
    let mut by_key: BTreeMap<(String, NaiveDate), PriceObservation> = BTreeMap::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header, lines are 1-based.
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

        let Some(region) = get_optional(&record, Some(region_idx)) else {
            row_errors.push(RowError {
                line,
                message: "Missing required value: `RegionName`".to_string(),
            });
            continue;
        };
        if !wanted.contains(&region.to_ascii_lowercase()) {
            continue;
        }

        let parsed = get_required(&record, date_idx, "Date")
            .and_then(parse_date)
            .and_then(|date| {
                let raw = get_required(&record, price_idx, "AveragePrice")?;
                let price = parse_number(raw).ok_or_else(|| format!("Invalid `AveragePrice` value '{raw}'."))?;
                if price <= 0.0 {
                    return Err(format!("Non-positive `AveragePrice` value '{raw}'."));
                }
                Ok((date, price))
            });

        let (date, price) = match parsed {
            Ok(v) => v,
            Err(message) => {
                row_errors.push(RowError { line, message });
                continue;
            }
        };

        let canonical = canonical_region(regions, region);
        let month = month_start(date);
        let obs = PriceObservation {
            region: canonical.clone(),
            area_code: get_optional(&record, area_idx).map(str::to_string),
            month,
            price,
        };
        if by_key.insert((canonical, month), obs).is_some() {
            row_errors.push(RowError {
                line,
                message: format!("Duplicate observation for {region} {}; keeping the later row.", month.format("%Y-%m")),
            });
        }
    }

    let observations: Vec<PriceObservation> = by_key.into_values().collect();
    let rows_used = observations.len();
    if rows_used == 0 {
        return Err(AppError::no_data(
            "No price observations found for the selected regions.",
        ));
    }

    let seen: HashSet<&str> = observations.iter().map(|o| o.region.as_str()).collect();
    let missing_regions = regions
        .iter()
        .filter(|r| !seen.contains(canonical_region(regions, r).as_str()))
        .cloned()
        .collect();

    Ok(PriceTable {
        observations,
        row_errors,
        rows_read,
        rows_used,
        missing_regions,
    })
}

/// Use the caller's spelling of a region so output labels are stable.
fn canonical_region(regions: &[String], found: &str) -> String {
    regions
        .iter()
        .find(|r| r.trim().eq_ignore_ascii_case(found.trim()))
        .map(|r| r.trim().to_string())
        .unwrap_or_else(|| found.trim().to_string())
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

    fn regions(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn loads_selected_regions_and_skips_others() {
        let file = write_csv(
            "Date,RegionName,AreaCode,AveragePrice,Index\n\
             01/01/2020,London,E12000007,480000,120.1\n\
             01/01/2020,North East,E12000001,130000,110.2\n\
             01/01/2020,Wales,W92000004,170000,115.0\n\
             01/02/2020,london,E12000007,\"482,500\",121.0\n",
        );
        let table = load_prices(file.path(), &regions(&["London", "North East"])).unwrap();

        assert_eq!(table.rows_read, 4);
        assert_eq!(table.rows_used, 3);
        assert!(table.row_errors.is_empty());
        assert!(table.missing_regions.is_empty());

        let london: Vec<&PriceObservation> =
            table.observations.iter().filter(|o| o.region == "London").collect();
        assert_eq!(london.len(), 2);
        assert_eq!(london[1].month, NaiveDate::from_ymd_opt(2020, 2, 1).unwrap());
        assert!((london[1].price - 482_500.0).abs() < 1e-9);
        assert_eq!(london[0].area_code.as_deref(), Some("E12000007"));
    }

    #[test]
    fn bad_rows_are_reported_not_fatal() {
        let file = write_csv(
            "Date,RegionName,AveragePrice\n\
             2020-01-01,London,480000\n\
             not-a-date,London,481000\n\
             2020-03-01,London,\n\
             2020-04-01,London,-5\n",
        );
        let table = load_prices(file.path(), &regions(&["London"])).unwrap();
        assert_eq!(table.rows_used, 1);
        assert_eq!(table.row_errors.len(), 3);
        assert_eq!(table.row_errors[0].line, 3);
    }

    #[test]
    fn duplicate_month_keeps_later_row() {
        let file = write_csv(
            "Date,RegionName,AveragePrice\n\
             2020-01-01,London,1\n\
             2020-01-15,London,2\n",
        );
        let table = load_prices(file.path(), &regions(&["London"])).unwrap();

        assert_eq!(table.rows_used, 1);
        assert_eq!(table.observations[0].price, 2.0);
        assert_eq!(table.row_errors.len(), 1);
        assert_eq!(table.row_errors[0].line, 3);
        assert!(table.row_errors[0].message.contains("Duplicate"));
    }

    #[test]
    fn error_lines_account_for_multiline_fields() {
        let file = write_csv(
            "Date,RegionName,AreaCode,AveragePrice\n2020-01-01,London,\"E12\n000007\",480000\n2020-02-01,London,E12000007,oops\n",
        );
        let table = load_prices(file.path(), &regions(&["London"])).unwrap();

        assert_eq!(table.rows_used, 1);
        assert_eq!(table.row_errors.len(), 1);
        assert_eq!(table.row_errors[0].line, 4);
    }

    #[test]
    fn missing_price_column_is_a_schema_error() {
        let file = write_csv("Date,RegionName\n2020-01-01,London\n");
        let err = load_prices(file.path(), &regions(&["London"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn no_matching_regions_is_no_data() {
        let file = write_csv("Date,RegionName,AveragePrice\n2020-01-01,Wales,170000\n");
        let err = load_prices(file.path(), &regions(&["London"])).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn reports_regions_absent_from_file() {
        let file = write_csv("Date,RegionName,AveragePrice\n2020-01-01,London,480000\n");
        let table = load_prices(file.path(), &regions(&["London", "Atlantis"])).unwrap();
        assert_eq!(table.missing_regions, vec!["Atlantis".to_string()]);
    }
}
