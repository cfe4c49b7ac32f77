//! Report assembly and the narration boundary.
//!
//! A `BureauReport` is assembled from computed artifacts only: the summary
//! (whose `product_breakdown` doubles as the audit trail of per-category
//! vectors), deterministic findings, anomalies and diagnostics. Prose comes
//! from an optional [`Narrator`], which sees a [`NarrationContext`] and
//! nothing else. It cannot reach raw tradelines or unmasked identifiers.

pub mod findings;
pub mod format;

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::domain::{ExecutiveSummaryInputs, FeatureVector, LoanCategory};
use crate::ingest::Anomaly;
use crate::validate::Diagnostic;

pub use findings::{FindingArea, FindingSeverity, KeyFinding, extract_key_findings};
pub use format::{format_inr, mask_customer_id};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMeta {
    pub customer_id: String,
    pub generated_at: DateTime<Utc>,
    pub reference_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Complete,
    /// At least one validation diagnostic was raised.
    Degraded,
}

/// Everything computed for one customer.
#[derive(Debug, Clone, Serialize)]
pub struct BureauReport {
    meta: ReportMeta,
    status: ReportStatus,
    summary: ExecutiveSummaryInputs,
    key_findings: Vec<KeyFinding>,
    anomalies: Vec<Anomaly>,
    diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    narrative: Option<String>,
}

impl BureauReport {
    pub fn meta(&self) -> &ReportMeta {
        &self.meta
    }

    pub fn status(&self) -> ReportStatus {
        self.status
    }

    pub fn summary(&self) -> &ExecutiveSummaryInputs {
        &self.summary
    }

    /// Per-category vectors the summary was computed from.
    pub fn feature_vectors(&self) -> &BTreeMap<LoanCategory, FeatureVector> {
        &self.summary.product_breakdown
    }

    pub fn key_findings(&self) -> &[KeyFinding] {
        &self.key_findings
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn narrative(&self) -> Option<&str> {
        self.narrative.as_deref()
    }

    /// The restricted view handed to a narrator.
    pub fn narration_context(&self) -> NarrationContext<'_> {
        NarrationContext {
            customer: mask_customer_id(&self.meta.customer_id),
            reference_date: self.meta.reference_date,
            summary: &self.summary,
            key_findings: &self.key_findings,
        }
    }

    pub fn with_narrative(mut self, narrative: impl Into<String>) -> Self {
        self.narrative = Some(narrative.into());
        self
    }

    /// Attach narration if the narrator succeeds.
    ///
    /// A failing narrator is logged and leaves the report without a narrative;
    /// the computed content is unaffected.
    pub fn narrate<N: Narrator>(self, narrator: &N) -> Self {
        let result = narrator.narrate(&self.narration_context());
        match result {
            Ok(text) => self.with_narrative(text),
            Err(err) => {
                tracing::warn!(
                    customer = %mask_customer_id(&self.meta.customer_id),
                    error = %err,
                    "narration failed; report kept without narrative"
                );
                self
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Assemble a report. Status is `Degraded` iff any diagnostic is present.
pub fn assemble(
    meta: ReportMeta,
    summary: ExecutiveSummaryInputs,
    key_findings: Vec<KeyFinding>,
    anomalies: Vec<Anomaly>,
    diagnostics: Vec<Diagnostic>,
) -> BureauReport {
    let status = if diagnostics.is_empty() {
        ReportStatus::Complete
    } else {
        ReportStatus::Degraded
    };
    BureauReport {
        meta,
        status,
        summary,
        key_findings,
        anomalies,
        diagnostics,
        narrative: None,
    }
}

/// Read-only inputs for narration.
#[derive(Debug, Clone, Serialize)]
pub struct NarrationContext<'a> {
    /// Masked id, e.g. `###4898`.
    pub customer: String,
    pub reference_date: NaiveDate,
    pub summary: &'a ExecutiveSummaryInputs,
    pub key_findings: &'a [KeyFinding],
}

/// Turns computed results into prose (an LLM client, a template, ...).
///
/// Narrators only phrase what was computed; they never feed numbers back.
pub trait Narrator {
    type Error: std::fmt::Display;

    fn narrate(&self, ctx: &NarrationContext<'_>) -> Result<String, Self::Error>;
}
