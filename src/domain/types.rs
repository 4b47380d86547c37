//! Shared domain types.
//!
//! These types are intentionally kept small and plain so they can be:
//!
//! - produced by the CSV ingest layer
//! - reshaped by the derive layer
//! - exported to CSV/HTML or drawn without further conversion

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use clap::ValueEnum;
use serde::Serialize;

/// English regions used for the ripple chart when none are given explicitly.
pub const DEFAULT_REGIONS: [&str; 9] = [
    "London",
    "South East",
    "East of England",
    "South West",
    "East Midlands",
    "West Midlands",
    "Yorkshire and The Humber",
    "North West",
    "North East",
];

/// Which remote dataset a command operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DatasetKind {
    /// House price index full file (ripple chart).
    Hpi,
    /// London Development Database completions extract (AMR tables).
    Ldd,
}

impl DatasetKind {
    pub fn display_name(self) -> &'static str {
        match self {
            DatasetKind::Hpi => "house price index",
            DatasetKind::Ldd => "LDD completions",
        }
    }

    /// Environment variable holding the dataset URL.
    pub fn url_env(self) -> &'static str {
        match self {
            DatasetKind::Hpi => "HPI_URL",
            DatasetKind::Ldd => "LDD_URL",
        }
    }
}

/// Normalize any date to the first day of its month.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// The same calendar month `years` years earlier; `None` when out of range.
pub fn years_before(month: NaiveDate, years: u32) -> Option<NaiveDate> {
    let year = month.year().checked_sub(i32::try_from(years).ok()?)?;
    NaiveDate::from_ymd_opt(year, month.month(), 1)
}

/// A single region/month price read from the house price index.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceObservation {
    pub region: String,
    pub area_code: Option<String>,
    /// First day of the observation month.
    pub month: NaiveDate,
    pub price: f64,
}

/// One fully derived ripple row: price, lagged price, annualised change and rank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RippleRow {
    #[serde(serialize_with = "serialize_month")]
    pub month: NaiveDate,
    pub region: String,
    pub price: f64,
    pub lagged_price: f64,
    /// Annualised change as a fraction (0.05 = 5% a year).
    pub pct_change: f64,
    /// Dense price rank within the month, 1 = most expensive.
    pub rank: u32,
}

fn serialize_month<S: serde::Serializer>(month: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&month.format("%Y-%m").to_string())
}

/// Ripple pipeline settings (derived from CLI flags).
#[derive(Debug, Clone)]
pub struct RippleConfig {
    pub regions: Vec<String>,
    pub lag_years: u32,
    /// Inclusive first month of the output window.
    pub from: Option<NaiveDate>,
    /// Inclusive last month of the output window.
    pub to: Option<NaiveDate>,
}

impl Default for RippleConfig {
    fn default() -> Self {
        Self {
            regions: DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
            lag_years: 3,
            from: None,
            to: None,
        }
    }
}

/// Animated chart settings.
#[derive(Debug, Clone)]
pub struct AnimationConfig {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub frame_delay_ms: u32,
    pub step_months: u32,
    pub font: Option<PathBuf>,
}

/// UK financial year (April to March), identified by its starting calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FinancialYear(pub i32);

impl FinancialYear {
    pub fn containing(date: NaiveDate) -> Self {
        if date.month() >= 4 {
            FinancialYear(date.year())
        } else {
            FinancialYear(date.year() - 1)
        }
    }
}

impl fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:02}", self.0, (self.0 + 1).rem_euclid(100))
    }
}

impl FromStr for FinancialYear {
    type Err = String;

    /// Accepts `2019/20`, `2019-20` or a bare starting year `2019`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bad = || format!("Invalid financial year '{s}'. Expected YYYY/YY, e.g. 2019/20.");
        let (start, end) = match s.split_once(['/', '-']) {
            Some((a, b)) => (a, Some(b)),
            None => (s, None),
        };
        let start: i32 = start.parse().map_err(|_| bad())?;
        if let Some(end) = end {
            let end: i32 = end.parse().map_err(|_| bad())?;
            let expected = if end < 100 { (start + 1).rem_euclid(100) } else { start + 1 };
            if end != expected {
                return Err(bad());
            }
        }
        Ok(FinancialYear(start))
    }
}

/// Tenure categories in AMR table order. Anything else sorts after these, alphabetically.
const TENURE_ORDER: [&str; 5] = [
    "Market",
    "Social Rent",
    "Affordable Rent",
    "London Affordable Rent",
    "Intermediate",
];

pub const UNKNOWN_TENURE: &str = "Unknown";

/// A housing tenure label, compared case-insensitively.
#[derive(Debug, Clone)]
pub struct Tenure(String);

impl Tenure {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Tenure(UNKNOWN_TENURE.to_string());
        }
        let canonical = TENURE_ORDER
            .iter()
            .chain(std::iter::once(&UNKNOWN_TENURE))
            .find(|t| t.eq_ignore_ascii_case(trimmed))
            .map(|t| t.to_string())
            .unwrap_or_else(|| trimmed.to_string());
        Tenure(canonical)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn sort_key(&self) -> (usize, String) {
        let lower = self.0.to_ascii_lowercase();
        if self.0 == UNKNOWN_TENURE {
            return (TENURE_ORDER.len() + 1, lower);
        }
        let idx = TENURE_ORDER
            .iter()
            .position(|t| *t == self.0)
            .unwrap_or(TENURE_ORDER.len());
        (idx, lower)
    }
}

impl PartialEq for Tenure {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Tenure {}

impl PartialOrd for Tenure {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tenure {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for Tenure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Topcoded bedroom bucket.
///
/// The derived ordering is the table order: exact counts ascending, then the
/// topcoded bucket, then rows with no bedroom count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BedroomBucket {
    Count(u32),
    AtLeast(u32),
    Unknown,
}

impl fmt::Display for BedroomBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BedroomBucket::Count(n) => write!(f, "{n}"),
            BedroomBucket::AtLeast(n) => write!(f, "{n}+"),
            BedroomBucket::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Row key of the net completions table: one row per borough, then the London total.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BoroughRow {
    Borough(String),
    LondonTotal,
}

impl fmt::Display for BoroughRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoroughRow::Borough(name) => f.write_str(name),
            BoroughRow::LondonTotal => f.write_str("London"),
        }
    }
}

/// A completed scheme line from the LDD extract.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRecord {
    pub borough: String,
    pub completed_on: NaiveDate,
    pub financial_year: FinancialYear,
    pub tenure: Tenure,
    pub bedrooms: Option<u32>,
    pub proposed_units: i64,
    pub existing_units: i64,
}

impl CompletionRecord {
    pub fn net_units(&self) -> i64 {
        self.proposed_units - self.existing_units
    }

    pub fn gross_units(&self) -> i64 {
        self.proposed_units
    }
}

/// Completions pipeline settings.
#[derive(Debug, Clone)]
pub struct CompletionsConfig {
    /// Bedroom counts at or above this value share one bucket.
    pub topcode: u32,
    /// Financial year for the bedroom/tenure table; `None` = latest in the data.
    pub year: Option<FinancialYear>,
}

impl Default for CompletionsConfig {
    fn default() -> Self {
        Self { topcode: 4, year: None }
    }
}
