//! Derived columns, aggregation and reshaping.
//!
//! - `ripple`: lag, annualised change and price rank for the house price series
//! - `completions`: topcoding and the two AMR summary tables
//! - `pivot`: the long → wide reshape both pipelines end with

pub mod completions;
pub mod pivot;
pub mod ripple;

pub use completions::*;
pub use pivot::Pivot;
pub use ripple::*;
