//! Tradeline ingest.
//!
//! - field coercion (`parse`)
//! - record normalization + category partitioning (`normalize`)

pub mod normalize;
pub mod parse;

pub use normalize::*;
