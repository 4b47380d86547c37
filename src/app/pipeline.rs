//! Shared pipeline logic for both datasets.
//!
//! Keeping the passes in one place keeps the CLI layer to dispatch and printing:
//! - ripple: locate -> load prices -> lag/change/rank -> window
//! - completions: locate -> load records -> net table + bedroom/tenure table

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::data::{DatasetSource, Fetcher};
use crate::derive::{BedroomTenureTable, Pivot, RippleTable, build_ripple, gross_by_bedrooms_tenure, net_by_borough_year};
use crate::domain::{BoroughRow, CompletionsConfig, FinancialYear, RippleConfig};
use crate::error::AppError;
use crate::io::{CompletionTable, PriceTable, load_completions, load_prices};

/// All computed outputs of a `housing ripple` run.
#[derive(Debug, Clone)]
pub struct RippleRun {
    pub prices: PriceTable,
    pub ripple: RippleTable,
}

/// All computed outputs of a `housing completions` run.
#[derive(Debug, Clone)]
pub struct CompletionsRun {
    pub completions: CompletionTable,
    pub net: Pivot<BoroughRow, FinancialYear>,
    pub bedrooms: BedroomTenureTable,
}

/// Resolve the CSV to read: an explicit local file wins, otherwise the (cached) download.
pub fn locate_dataset(input: Option<&Path>, source: &DatasetSource, refresh: bool) -> Result<PathBuf, AppError> {
    match input {
        Some(path) => {
            if !path.exists() {
                return Err(AppError::usage(format!("Input file '{}' does not exist.", path.display())));
            }
            Ok(path.to_path_buf())
        }
        None => Fetcher::new().fetch(source, refresh),
    }
}

/// Load prices from `path` and derive the ripple table.
pub fn run_ripple(path: &Path, config: &RippleConfig) -> Result<RippleRun, AppError> {
    if let (Some(from), Some(to)) = (config.from, config.to) {
        if from > to {
            return Err(AppError::usage("`--from` must not be after `--to`."));
        }
    }

    let prices = load_prices(path, &config.regions)?;
    info!(rows_read = prices.rows_read, rows_used = prices.rows_used, "loaded prices");
    if !prices.row_errors.is_empty() {
        warn!(count = prices.row_errors.len(), "skipped malformed price rows");
    }
    for region in &prices.missing_regions {
        warn!(%region, "region not found in price file");
    }

    let ripple = build_ripple(&prices.observations, config)?;
    info!(
        rows = ripple.rows.len(),
        dropped_without_lag = ripple.rows_without_lag,
        "derived ripple table"
    );

    Ok(RippleRun { prices, ripple })
}

/// Load completions from `path` and derive both AMR tables.
pub fn run_completions(path: &Path, config: &CompletionsConfig) -> Result<CompletionsRun, AppError> {
    let completions = load_completions(path)?;
    info!(
        rows_read = completions.rows_read,
        completed = completions.rows_used,
        not_completed = completions.rows_dropped,
        "loaded completions"
    );
    if !completions.row_errors.is_empty() {
        warn!(count = completions.row_errors.len(), "skipped malformed completion rows");
    }

    let net = net_by_borough_year(&completions.records);
    let bedrooms = gross_by_bedrooms_tenure(&completions.records, config.year, config.topcode)?;

    Ok(CompletionsRun {
        completions,
        net,
        bedrooms,
    })
}
