//! `housing-stats` library crate.
//!
//! The binary (`housing`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the derivations (ripple, pivots, topcoding) are reusable from other tools
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod derive;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod plot;
pub mod report;
