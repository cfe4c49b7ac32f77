//! `bureau-features` library crate.
//!
//! Deterministic feature extraction over a customer's credit-bureau
//! tradelines:
//!
//! - raw records are normalized into canonical loan categories (`ingest`)
//! - each category gets a feature vector, the portfolio gets a summary (`features`)
//! - structural invariants are re-checked after aggregation (`validate`)
//! - findings and the final report are assembled from computed values only (`report`)
//!
//! `pipeline::build_report` runs all of it for one customer.

pub mod config;
pub mod domain;
pub mod error;
pub mod features;
pub mod ingest;
pub mod pipeline;
pub mod report;
pub mod taxonomy;
pub mod validate;

pub use config::{DefectPolicy, EngineConfig};
pub use error::EngineError;
pub use pipeline::{ReportRequest, build_report, build_report_at, build_reports};
pub use report::{BureauReport, NarrationContext, Narrator};
pub use taxonomy::Taxonomy;
