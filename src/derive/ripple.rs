//! Regional "ripple" derivation.
//!
//! Pipeline (one pass):
//! prices -> lagged price (same month, `lag_years` earlier) -> annualised change
//!        -> dense price rank per month -> window filter -> drop rows without a lag
//!
//! The result is a long table (`RippleTable`) that the pivot, terminal plot
//! and GIF renderer all read from.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use tracing::debug;

use crate::derive::pivot::Pivot;
use crate::domain::{PriceObservation, RippleConfig, RippleRow, years_before};
use crate::error::AppError;

/// An observation joined with its lagged price (if the lag month exists).
#[derive(Debug, Clone, PartialEq)]
pub struct LaggedRow {
    pub month: NaiveDate,
    pub region: String,
    pub price: f64,
    pub lagged_price: Option<f64>,
}

/// Derived ripple data plus counts of what was dropped on the way.
#[derive(Debug, Clone)]
pub struct RippleTable {
    pub rows: Vec<RippleRow>,
    pub lag_years: u32,
    pub rows_without_lag: usize,
    pub rows_outside_window: usize,
}

/// Join every observation with the same region's price `lag_years` earlier.
pub fn lag_prices(observations: &[PriceObservation], lag_years: u32) -> Vec<LaggedRow> {
    let lookup: HashMap<(&str, NaiveDate), f64> = observations
        .iter()
        .map(|o| ((o.region.as_str(), o.month), o.price))
        .collect();

    observations
        .iter()
        .map(|o| {
            let lagged_price = years_before(o.month, lag_years)
                .and_then(|m| lookup.get(&(o.region.as_str(), m)).copied());
            LaggedRow {
                month: o.month,
                region: o.region.clone(),
                price: o.price,
                lagged_price,
            }
        })
        .collect()
}

/// Annualised simple change: `(price / lagged - 1) / lag_years`.
pub fn annualised_change(price: f64, lagged_price: f64, lag_years: u32) -> Option<f64> {
    if lag_years == 0 || !price.is_finite() || !lagged_price.is_finite() || lagged_price <= 0.0 {
        return None;
    }
    Some((price / lagged_price - 1.0) / lag_years as f64)
}

/// Dense rank, descending: the largest value gets 1, ties share a rank and
/// the next distinct value gets the next integer.
pub fn dense_rank_desc(values: &[f64]) -> Vec<u32> {
    let mut distinct: Vec<f64> = values.to_vec();
    distinct.sort_by(|a, b| b.total_cmp(a));
    distinct.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);

    values
        .iter()
        .map(|v| {
            let pos = distinct
                .binary_search_by(|x| v.total_cmp(x))
                .unwrap_or_else(|p| p);
            pos as u32 + 1
        })
        .collect()
}

/// Price rank of every `(region, month)` among the regions observed that month.
pub fn rank_by_month(observations: &[PriceObservation]) -> HashMap<(String, NaiveDate), u32> {
    let mut by_month: BTreeMap<NaiveDate, Vec<&PriceObservation>> = BTreeMap::new();
    for o in observations {
        by_month.entry(o.month).or_default().push(o);
    }

    let mut out = HashMap::with_capacity(observations.len());
    for (month, group) in by_month {
        let prices: Vec<f64> = group.iter().map(|o| o.price).collect();
        for (o, rank) in group.iter().zip(dense_rank_desc(&prices)) {
            out.insert((o.region.clone(), month), rank);
        }
    }
    out
}

/// Run the full ripple derivation.
pub fn build_ripple(observations: &[PriceObservation], config: &RippleConfig) -> Result<RippleTable, AppError> {
    if config.lag_years == 0 {
        return Err(AppError::usage("`--lag-years` must be at least 1."));
    }

    let ranks = rank_by_month(observations);
    let mut rows = Vec::new();
    let mut rows_without_lag = 0usize;
    let mut rows_outside_window = 0usize;

    for lagged in lag_prices(observations, config.lag_years) {
        let in_window = config.from.is_none_or(|f| lagged.month >= f) && config.to.is_none_or(|t| lagged.month <= t);
        if !in_window {
            rows_outside_window += 1;
            continue;
        }

        let Some(lagged_price) = lagged.lagged_price else {
            rows_without_lag += 1;
            continue;
        };
        let Some(pct_change) = annualised_change(lagged.price, lagged_price, config.lag_years) else {
            rows_without_lag += 1;
            continue;
        };

        let rank = ranks
            .get(&(lagged.region.clone(), lagged.month))
            .copied()
            .unwrap_or(u32::MAX);

        rows.push(RippleRow {
            month: lagged.month,
            region: lagged.region,
            price: lagged.price,
            lagged_price,
            pct_change,
            rank,
        });
    }

    rows.sort_by(|a, b| a.month.cmp(&b.month).then_with(|| a.rank.cmp(&b.rank)).then_with(|| a.region.cmp(&b.region)));
    debug!(rows = rows.len(), rows_without_lag, rows_outside_window, "ripple derived");

    if rows.is_empty() {
        return Err(AppError::no_data(format!(
            "No months in the selected window have a price {} year(s) earlier.",
            config.lag_years
        )));
    }

    Ok(RippleTable {
        rows,
        lag_years: config.lag_years,
        rows_without_lag,
        rows_outside_window,
    })
}

impl RippleTable {
    /// Distinct months in ascending order.
    pub fn months(&self) -> Vec<NaiveDate> {
        let set: BTreeSet<NaiveDate> = self.rows.iter().map(|r| r.month).collect();
        set.into_iter().collect()
    }

    pub fn first_month(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.month)
    }

    pub fn last_month(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.month)
    }

    /// Regions from most to least expensive at the start of the table.
    ///
    /// A region's position comes from its first row; regions that enter the
    /// table later sort after those present from the start.
    pub fn region_order(&self) -> Vec<String> {
        let mut first: BTreeMap<&str, (NaiveDate, u32)> = BTreeMap::new();
        for r in &self.rows {
            first.entry(r.region.as_str()).or_insert((r.month, r.rank));
        }
        let mut regions: Vec<(&str, (NaiveDate, u32))> = first.into_iter().collect();
        regions.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        regions.into_iter().map(|(name, _)| name.to_string()).collect()
    }

    /// One region's annualised change over time.
    pub fn series(&self, region: &str) -> Vec<(NaiveDate, f64)> {
        self.rows
            .iter()
            .filter(|r| r.region == region)
            .map(|r| (r.month, r.pct_change))
            .collect()
    }

    /// Rows of the last month, in region order.
    pub fn latest(&self) -> Vec<&RippleRow> {
        let Some(last) = self.last_month() else {
            return Vec::new();
        };
        let order = self.region_order();
        let mut rows: Vec<&RippleRow> = self.rows.iter().filter(|r| r.month == last).collect();
        rows.sort_by_key(|r| order.iter().position(|o| *o == r.region).unwrap_or(usize::MAX));
        rows
    }

    /// Range of annualised change across all rows.
    pub fn change_range(&self) -> Option<(f64, f64)> {
        let mut it = self.rows.iter().map(|r| r.pct_change);
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    /// Months x regions of annualised change.
    pub fn to_pivot(&self) -> Pivot<NaiveDate, String> {
        Pivot::from_long(self.rows.iter().map(|r| (r.month, r.region.clone(), r.pct_change)))
            .with_col_order(&self.region_order())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(y: i32, month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, month, 1).unwrap()
    }

    fn obs(region: &str, month: NaiveDate, price: f64) -> PriceObservation {
        PriceObservation {
            region: region.to_string(),
            area_code: None,
            month,
            price,
        }
    }

    fn config(lag_years: u32) -> RippleConfig {
        RippleConfig {
            regions: vec!["London".to_string(), "North East".to_string()],
            lag_years,
            from: None,
            to: None,
        }
    }

    #[test]
    fn annualised_change_matches_formula() {
        let v = annualised_change(133.0, 100.0, 3).unwrap();
        assert!((v - 0.11).abs() < 1e-12);
        let v = annualised_change(90.0, 100.0, 1).unwrap();
        assert!((v + 0.1).abs() < 1e-12);
        assert!(annualised_change(100.0, 0.0, 3).is_none());
        assert!(annualised_change(100.0, 50.0, 0).is_none());
    }

    #[test]
    fn dense_rank_handles_ties() {
        assert_eq!(dense_rank_desc(&[10.0, 30.0, 20.0, 30.0]), vec![3, 1, 2, 1]);
        assert_eq!(dense_rank_desc(&[5.0]), vec![1]);
        assert!(dense_rank_desc(&[]).is_empty());
    }

    #[test]
    fn lag_uses_same_month_and_tolerates_gaps() {
        let data = vec![
            obs("London", m(2017, 1), 100.0),
            obs("London", m(2020, 1), 130.0),
            obs("London", m(2020, 2), 131.0),
        ];
        let lagged = lag_prices(&data, 3);
        assert_eq!(lagged[0].lagged_price, None);
        assert_eq!(lagged[1].lagged_price, Some(100.0));
        // February 2017 is missing, so February 2020 has no lag.
        assert_eq!(lagged[2].lagged_price, None);
    }

    #[test]
    fn huge_lag_finds_no_earlier_month() {
        let data = vec![obs("London", m(2020, 1), 130.0)];
        for lag in [10_000, 1 << 31, u32::MAX] {
            assert_eq!(lag_prices(&data, lag)[0].lagged_price, None);
        }
    }

    #[test]
    fn lag_does_not_cross_regions() {
        let data = vec![obs("London", m(2017, 1), 100.0), obs("North East", m(2020, 1), 50.0)];
        let lagged = lag_prices(&data, 3);
        assert!(lagged.iter().all(|r| r.lagged_price.is_none()));
    }

    #[test]
    fn build_ripple_drops_rows_without_lag_and_ranks() {
        let data = vec![
            obs("London", m(2017, 1), 400.0),
            obs("North East", m(2017, 1), 100.0),
            obs("London", m(2020, 1), 460.0),
            obs("North East", m(2020, 1), 130.0),
        ];
        let table = build_ripple(&data, &config(3)).unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows_without_lag, 2);
        assert_eq!(table.rows[0].region, "London");
        assert_eq!(table.rows[0].rank, 1);
        assert_eq!(table.rows[1].rank, 2);
        assert!((table.rows[0].pct_change - 0.05).abs() < 1e-12);
        assert!((table.rows[1].pct_change - 0.1).abs() < 1e-12);
        assert_eq!(table.region_order(), vec!["London".to_string(), "North East".to_string()]);
    }

    #[test]
    fn window_filter_is_inclusive() {
        let mut data = Vec::new();
        for year in 2015..=2020 {
            data.push(obs("London", m(year, 6), 100.0 + year as f64));
        }
        let mut cfg = config(1);
        cfg.from = Some(m(2017, 6));
        cfg.to = Some(m(2019, 6));
        let table = build_ripple(&data, &cfg).unwrap();
        assert_eq!(table.months(), vec![m(2017, 6), m(2018, 6), m(2019, 6)]);
        assert_eq!(table.rows_outside_window, 3);
    }

    #[test]
    fn empty_result_is_no_data() {
        let data = vec![obs("London", m(2020, 1), 100.0)];
        let err = build_ripple(&data, &config(3)).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        let err = build_ripple(&data, &config(0)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn pivot_and_latest_follow_region_order() {
        let data = vec![
            obs("North East", m(2019, 1), 100.0),
            obs("London", m(2019, 1), 400.0),
            obs("North East", m(2020, 1), 110.0),
            obs("London", m(2020, 1), 420.0),
            obs("North East", m(2020, 2), 100.0),
            obs("London", m(2020, 2), 400.0),
            obs("North East", m(2021, 1), 121.0),
            obs("London", m(2021, 1), 420.0),
        ];
        let table = build_ripple(&data, &config(1)).unwrap();
        let pivot = table.to_pivot();
        assert_eq!(pivot.cols(), &["London".to_string(), "North East".to_string()]);
        assert_eq!(pivot.rows(), &[m(2020, 1), m(2021, 1)]);
        assert_eq!(pivot.get(&m(2021, 1), &"London".to_string()), Some(0.0));

        let latest = table.latest();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].region, "London");
        assert!((latest[1].pct_change - 0.1).abs() < 1e-12);

        let (lo, hi) = table.change_range().unwrap();
        assert!((lo - 0.0).abs() < 1e-12);
        assert!((hi - 0.1).abs() < 1e-12);
        assert_eq!(table.series("London").len(), 2);
    }
}
