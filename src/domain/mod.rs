//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the canonical loan taxonomy (`LoanCategory`, `TermLoan`)
//! - raw and normalized tradelines (`RawTradeline`, `Tradeline`)
//! - extraction/aggregation outputs (`FeatureVector`, `ExecutiveSummaryInputs`)

pub mod types;

pub use types::*;
