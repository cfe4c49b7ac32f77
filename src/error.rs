use thiserror::Error;

/// Fatal, per-request failures.
///
/// Everything recoverable (bad fields, clamped amounts, broken structural
/// invariants) travels inside the report as `Anomaly` / `Diagnostic` values
/// instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("customer {customer_id}: no usable tradelines after normalization")]
    EmptyPortfolio { customer_id: String },

    #[error("customer {customer_id}: internal invariant defect: {detail}")]
    InvariantDefect { customer_id: String, detail: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid taxonomy table: {0}")]
    InvalidTaxonomy(#[from] serde_json::Error),
}

impl EngineError {
    /// Whether this error indicates a bug rather than bad input.
    pub fn is_defect(&self) -> bool {
        matches!(self, EngineError::InvariantDefect { .. })
    }
}
