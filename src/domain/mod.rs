//! Domain types used throughout the pipelines.
//!
//! This module defines:
//!
//! - house price observations and derived ripple rows (`PriceObservation`, `RippleRow`)
//! - completions records and their grouping keys (`CompletionRecord`, `Tenure`, `BedroomBucket`)
//! - run configuration (`RippleConfig`, `CompletionsConfig`, `AnimationConfig`)

pub mod types;

pub use types::*;
