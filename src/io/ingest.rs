//! Shared CSV ingest helpers.
//!
//! Both datasets are published as CSV with loosely-controlled headers, so the
//! dataset-specific loaders (`hpi`, `ldd`) share:
//!
//! - case-insensitive, BOM-tolerant header lookup with aliases
//! - required/optional cell accessors with row-level error messages
//! - a small set of accepted date formats

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use csv::{Reader, StringRecord};

use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Normalized header name -> column index.
#[derive(Debug, Clone)]
pub struct HeaderMap {
    columns: HashMap<String, usize>,
}

impl HeaderMap {
    pub fn new(headers: &StringRecord) -> Self {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (normalize_header_name(name), idx))
            .collect();
        Self { columns }
    }

    /// Index of the first alias present in the header row.
    pub fn find(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|a| self.columns.get(&normalize_header_name(a)).copied())
    }

    /// Like `find`, but a missing column is a schema error (exit code 2).
    pub fn require(&self, aliases: &[&str]) -> Result<usize, AppError> {
        self.find(aliases).ok_or_else(|| {
            AppError::usage(format!(
                "Missing required column: `{}` (accepted: {})",
                aliases[0],
                aliases.join(", ")
            ))
        })
    }
}

pub fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}').trim();
    name.to_ascii_lowercase()
}

/// Open a CSV file for reading, returning the reader and its header map.
pub fn open_csv(path: &Path) -> Result<(Reader<File>, HeaderMap), AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::usage(format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::usage(format!("Failed to read CSV headers of '{}': {e}", path.display())))?
        .clone();

    Ok((reader, HeaderMap::new(&headers)))
}

/// 1-based line a record starts on. Quoted fields may span lines, so the
/// reader's position is used; `fallback` covers records without one.
pub fn record_line(position: Option<&csv::Position>, fallback: usize) -> usize {
    position.map_or(fallback, |p| p.line() as usize)
}

pub fn get_required<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, String> {
    get_optional(record, Some(idx)).ok_or_else(|| format!("Missing required value: `{name}`"))
}

pub fn get_optional(record: &StringRecord, idx: Option<usize>) -> Option<&str> {
    record.get(idx?).map(str::trim).filter(|s| !s.is_empty())
}

pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    // Publishers mix ISO and UK day-first dates, sometimes with a time part.
    const FMTS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%d/%m/%Y %H:%M"];
    let s = s.trim();
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    if let Some((date_part, _)) = s.split_once([' ', 'T']) {
        if let Ok(d) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
            return Ok(d);
        }
    }
    // Month-only values (`YYYY-MM`) map to the first of the month.
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
        return Ok(d);
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, DD/MM/YYYY, DD-MM-YYYY, YYYY/MM/DD, YYYY-MM."
    ))
}

/// Parse a numeric cell, tolerating thousands separators and a leading `£`.
pub fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .trim_start_matches('£')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let v = cleaned.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

/// Parse a whole-number cell. Values like `3.0` are accepted.
pub fn parse_count(s: &str) -> Option<i64> {
    let v = parse_number(s)?;
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}
