//! End-to-end report construction for one customer, or many.
//!
//! normalize -> extract (parallel per category) -> aggregate -> validate
//! -> key findings -> assemble
//!
//! Every stage is a pure function of its inputs plus `EngineConfig`; only
//! `build_report` reads the wall clock, and only for `generated_at`.

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use crate::config::{DefectPolicy, EngineConfig};
use crate::domain::{ExecutiveSummaryInputs, RawTradeline};
use crate::error::EngineError;
use crate::features::{aggregate, extract_all};
use crate::ingest::{Anomaly, normalize};
use crate::report::{BureauReport, ReportMeta, assemble, extract_key_findings, mask_customer_id};
use crate::taxonomy::Taxonomy;
use crate::validate::{Diagnostic, Severity, has_defects, validate};

/// One customer's input to a batch run.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub customer_id: String,
    pub tradelines: Vec<RawTradeline>,
}

impl ReportRequest {
    pub fn new(customer_id: impl Into<String>, tradelines: Vec<RawTradeline>) -> Self {
        Self {
            customer_id: customer_id.into(),
            tradelines,
        }
    }
}

/// Build a report stamped with the current time.
pub fn build_report(
    customer_id: &str,
    tradelines: &[RawTradeline],
    taxonomy: &Taxonomy,
    config: &EngineConfig,
) -> Result<BureauReport, EngineError> {
    build_report_at(customer_id, tradelines, taxonomy, config, Utc::now())
}

/// Build a report with an explicit `generated_at` (reproducible output).
pub fn build_report_at(
    customer_id: &str,
    tradelines: &[RawTradeline],
    taxonomy: &Taxonomy,
    config: &EngineConfig,
    generated_at: DateTime<Utc>,
) -> Result<BureauReport, EngineError> {
    let masked = mask_customer_id(customer_id);
    let span = tracing::info_span!("bureau_report", customer = %masked);
    let _enter = span.enter();

    // 1) Normalize and partition by category.
    let normalized = normalize(tradelines, taxonomy, config);
    if normalized.is_empty() {
        tracing::warn!(records_read = normalized.records_read, "no usable tradelines");
        return Err(EngineError::EmptyPortfolio {
            customer_id: masked,
        });
    }
    if !normalized.anomalies.is_empty() {
        tracing::info!(anomalies = normalized.anomalies.len(), "input anomalies recorded");
    }

    // 2) Per-category vectors, then the portfolio roll-up.
    let vectors = extract_all(&normalized.partitions, config);
    let summary = aggregate(vectors);

    // 3) Validate, then findings and assembly.
    let meta = ReportMeta {
        customer_id: customer_id.to_string(),
        generated_at,
        reference_date: config.reference_date,
    };
    let report = finish(meta, summary, normalized.anomalies, config.defect_policy)?;

    tracing::info!(
        tradelines = report.summary().total_tradelines,
        categories = report.feature_vectors().len(),
        findings = report.key_findings().len(),
        status = ?report.status(),
        "report built"
    );
    Ok(report)
}

/// Build reports for many customers in parallel.
///
/// Results come back in request order; one customer's failure does not
/// affect the others.
pub fn build_reports(
    requests: &[ReportRequest],
    taxonomy: &Taxonomy,
    config: &EngineConfig,
) -> Vec<Result<BureauReport, EngineError>> {
    let generated_at = Utc::now();
    requests
        .par_iter()
        .map(|req| build_report_at(&req.customer_id, &req.tradelines, taxonomy, config, generated_at))
        .collect()
}

/// Validate an aggregated summary and assemble the report, applying the
/// defect policy.
fn finish(
    meta: ReportMeta,
    summary: ExecutiveSummaryInputs,
    anomalies: Vec<Anomaly>,
    policy: DefectPolicy,
) -> Result<BureauReport, EngineError> {
    let diagnostics = validate(&summary);
    log_diagnostics(&diagnostics);
    if has_defects(&diagnostics) && policy == DefectPolicy::Escalate {
        let detail = diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Defect)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(EngineError::InvariantDefect {
            customer_id: mask_customer_id(&meta.customer_id),
            detail,
        });
    }

    let key_findings = extract_key_findings(&summary);
    Ok(assemble(meta, summary, key_findings, anomalies, diagnostics))
}

fn log_diagnostics(diagnostics: &[Diagnostic]) {
    for d in diagnostics {
        match d.severity {
            Severity::Degraded => tracing::warn!(diagnostic = %d, "report degraded"),
            Severity::Defect => tracing::error!(diagnostic = %d, "invariant defect"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{FeatureVector, LoanCategory, ProductFeatures, TermLoan};
    use crate::report::ReportStatus;
    use crate::validate::Invariant;

    fn config() -> EngineConfig {
        EngineConfig::new(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap())
    }

    fn card(outstanding: &str, limit: &str) -> RawTradeline {
        RawTradeline {
            loan_type: "Credit Card".to_string(),
            outstanding_amount: Some(outstanding.to_string()),
            credit_limit: Some(limit.to_string()),
            status: Some("Active".to_string()),
            ..RawTradeline::default()
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = build_report("CUST0001", &[], &Taxonomy::default(), &config()).unwrap_err();
        assert!(matches!(err, EngineError::EmptyPortfolio { .. }));
        assert!(!err.is_defect());
    }

    #[test]
    fn reports_are_reproducible_at_fixed_time() {
        let records = vec![card("30000", "100000"), card("0", "50000")];
        let at = Utc::now();
        let a = build_report_at("CUST0001", &records, &Taxonomy::default(), &config(), at).unwrap();
        let b = build_report_at("CUST0001", &records, &Taxonomy::default(), &config(), at).unwrap();

        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
        let cc = &a.feature_vectors()[&LoanCategory::CreditCard];
        assert_eq!(cc.loan_count, 2);
        assert_eq!(cc.utilization_ratio(), Some(0.2));
    }

    /// A summary whose vector carries a negative total, which normalization
    /// can never produce.
    fn defective_summary() -> ExecutiveSummaryInputs {
        let pl = FeatureVector {
            product: ProductFeatures::Term { category: TermLoan::PersonalLoan },
            secured: false,
            loan_count: 1,
            total_sanctioned_amount: -10.0,
            total_outstanding_amount: 0.0,
            average_vintage_months: None,
            months_since_last_payment: None,
            live_count: 1,
            closed_count: 0,
            delinquency_flag: false,
            max_dpd: None,
            overdue_amount: 0.0,
            forced_event_flags: BTreeSet::new(),
            on_us_count: 0,
            off_us_count: 1,
        };
        aggregate(BTreeMap::from([(LoanCategory::PersonalLoan, pl)]))
    }

    fn meta() -> ReportMeta {
        ReportMeta {
            customer_id: "CUST0009".to_string(),
            generated_at: Utc::now(),
            reference_date: config().reference_date,
        }
    }

    #[test]
    fn escalate_policy_fails_on_defect() {
        let err = finish(meta(), defective_summary(), Vec::new(), DefectPolicy::Escalate).unwrap_err();

        assert!(err.is_defect());
        match err {
            EngineError::InvariantDefect { customer_id, detail } => {
                assert_eq!(customer_id, "###0009");
                assert!(detail.contains("total_sanctioned_amount=-10"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn degrade_policy_keeps_report_with_defect() {
        let report = finish(meta(), defective_summary(), Vec::new(), DefectPolicy::Degrade).unwrap();

        assert_eq!(report.status(), ReportStatus::Degraded);
        assert!(has_defects(report.diagnostics()));
        assert!(report
            .diagnostics()
            .iter()
            .any(|d| d.invariant == Invariant::AmountNonNegative));
    }

    #[test]
    fn batch_keeps_request_order_and_isolates_failures() {
        let requests = vec![
            ReportRequest::new("A0001", vec![card("10", "100")]),
            ReportRequest::new("B0002", Vec::new()),
            ReportRequest::new("C0003", vec![card("90", "100")]),
        ];
        let results = build_reports(&requests, &Taxonomy::default(), &config());

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().meta().customer_id, "A0001");
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().meta().customer_id, "C0003");
    }
}
