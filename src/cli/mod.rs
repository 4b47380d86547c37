//! Command-line parsing for the housing statistics tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipelines; `app` turns these structs into domain configs.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{DatasetKind, FinancialYear};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "housing",
    version,
    about = "House price ripple charts and LDD completions tables",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download (or refresh) a dataset into the cache without processing it.
    Fetch(FetchArgs),
    /// Regional ripple: lagged price growth by region, as a table, terminal plot and GIF.
    Ripple(RippleArgs),
    /// AMR tables from the LDD completions extract.
    Completions(CompletionsArgs),
}

/// Where a dataset is read from.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Read a local CSV instead of downloading.
    #[arg(short = 'i', long, value_name = "CSV")]
    pub input: Option<PathBuf>,

    /// Dataset URL (defaults to HPI_URL / LDD_URL from the environment or `.env`).
    #[arg(long)]
    pub url: Option<String>,

    /// Download again even if a cached copy exists.
    #[arg(long)]
    pub refresh: bool,

    /// Directory for downloaded files.
    #[arg(long, env = "HOUSING_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    /// Which dataset to download.
    #[arg(short = 'd', long, value_enum)]
    pub dataset: DatasetKind,

    /// Dataset URL (defaults to HPI_URL / LDD_URL from the environment or `.env`).
    #[arg(long)]
    pub url: Option<String>,

    /// Download again even if a cached copy exists.
    #[arg(long)]
    pub refresh: bool,

    /// Directory for downloaded files.
    #[arg(long, env = "HOUSING_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct RippleArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Region to include (repeatable). Defaults to the nine English regions.
    #[arg(short = 'r', long = "region", value_name = "NAME")]
    pub regions: Vec<String>,

    /// Years between a price and the lagged price it is compared with.
    #[arg(long, default_value_t = 3)]
    pub lag_years: u32,

    /// First month to report (YYYY-MM).
    #[arg(long, value_parser = parse_month)]
    pub from: Option<NaiveDate>,

    /// Last month to report (YYYY-MM).
    #[arg(long, value_parser = parse_month)]
    pub to: Option<NaiveDate>,

    /// Write the animated chart to this GIF file.
    #[arg(long, value_name = "GIF")]
    pub gif: Option<PathBuf>,

    /// TTF/OTF font used for GIF labels; without it frames have no text.
    #[arg(long, env = "HOUSING_FONT", value_name = "FONT")]
    pub font: Option<PathBuf>,

    /// Months between animation frames.
    #[arg(long, default_value_t = 1)]
    pub step: u32,

    /// Delay between animation frames (milliseconds).
    #[arg(long, default_value_t = 120)]
    pub frame_delay: u32,

    /// GIF width (pixels).
    #[arg(long, default_value_t = 960)]
    pub gif_width: u32,

    /// GIF height (pixels).
    #[arg(long, default_value_t = 540)]
    pub gif_height: u32,

    /// Export the months x regions table of annualised change to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the long table (price, lagged price, change, rank) to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_long: Option<PathBuf>,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct CompletionsArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Bedroom counts at or above this value are grouped as "N+".
    #[arg(long, default_value_t = 4)]
    pub topcode: u32,

    /// Financial year for the bedroom/tenure table (YYYY/YY). Defaults to the latest.
    #[arg(long)]
    pub year: Option<FinancialYear>,

    /// Write both tables to an HTML file.
    #[arg(long, value_name = "HTML")]
    pub html: Option<PathBuf>,

    /// Export net completions by borough and year to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_net: Option<PathBuf>,

    /// Export gross completions by bedrooms and tenure to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_bedrooms: Option<PathBuf>,
}

/// Parse `YYYY-MM` (or a full `YYYY-MM-DD`) into the first day of the month.
pub fn parse_month(s: &str) -> Result<NaiveDate, String> {
    let s = s.trim();
    NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .map(crate::domain::month_start)
        .map_err(|_| format!("Invalid month '{s}'. Expected YYYY-MM."))
}
