//! Long → wide reshaping.
//!
//! A `Pivot` is built from `(row, column, value)` triples. Values sharing a
//! key are summed, which makes the pivot double as a group-by-and-sum. Cells
//! with no contributing triple stay empty (`None`) rather than zero so that
//! "no data" and "zero" remain distinguishable in the output.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
pub struct Pivot<R, C> {
    rows: Vec<R>,
    cols: Vec<C>,
    cells: BTreeMap<(R, C), f64>,
}

impl<R: Ord + Clone, C: Ord + Clone> Pivot<R, C> {
    pub fn from_long<I>(triples: I) -> Self
    where
        I: IntoIterator<Item = (R, C, f64)>,
    {
        let mut cells: BTreeMap<(R, C), f64> = BTreeMap::new();
        let mut rows = BTreeSet::new();
        let mut cols = BTreeSet::new();

        for (r, c, v) in triples {
            rows.insert(r.clone());
            cols.insert(c.clone());
            *cells.entry((r, c)).or_insert(0.0) += v;
        }

        Self {
            rows: rows.into_iter().collect(),
            cols: cols.into_iter().collect(),
            cells,
        }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn cols(&self) -> &[C] {
        &self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, row: &R, col: &C) -> Option<f64> {
        // BTreeMap lookup needs an owned tuple key.
        self.cells.get(&(row.clone(), col.clone())).copied()
    }

    pub fn row_total(&self, row: &R) -> f64 {
        self.cols.iter().filter_map(|c| self.get(row, c)).sum()
    }

    pub fn col_total(&self, col: &C) -> f64 {
        self.rows.iter().filter_map(|r| self.get(r, col)).sum()
    }

    pub fn grand_total(&self) -> f64 {
        self.cells.values().sum()
    }

    /// Reorder rows: keys listed in `order` first (if present), the rest keep their natural order.
    pub fn with_row_order(mut self, order: &[R]) -> Self {
        self.rows = reorder(&self.rows, order);
        self
    }

    /// Reorder columns: keys listed in `order` first (if present), the rest keep their natural order.
    pub fn with_col_order(mut self, order: &[C]) -> Self {
        self.cols = reorder(&self.cols, order);
        self
    }
}

fn reorder<K: Ord + Clone>(existing: &[K], order: &[K]) -> Vec<K> {
    let present: BTreeSet<&K> = existing.iter().collect();
    let mut out: Vec<K> = Vec::with_capacity(existing.len());
    for k in order {
        if present.contains(k) && !out.contains(k) {
            out.push(k.clone());
        }
    }
    for k in existing {
        if !out.contains(k) {
            out.push(k.clone());
        }
    }
    out
}
