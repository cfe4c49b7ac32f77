//! Feature computation.
//!
//! - per-category vectors (`extract`)
//! - portfolio roll-up (`aggregate`)

pub mod aggregate;
pub mod extract;

pub use aggregate::aggregate;
pub use extract::{extract_all, extract_features};
