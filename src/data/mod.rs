//! Remote dataset access.

pub mod fetch;

pub use fetch::{DatasetSource, Fetcher};
