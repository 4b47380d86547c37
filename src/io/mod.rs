//! Input/output helpers.
//!
//! - shared CSV ingest helpers (`ingest`)
//! - house price index loader (`hpi`)
//! - LDD completions loader (`ldd`)
//! - CSV exports of derived tables (`export`)

pub mod export;
pub mod hpi;
pub mod ingest;
pub mod ldd;

pub use export::*;
pub use hpi::*;
pub use ingest::RowError;
pub use ldd::*;
