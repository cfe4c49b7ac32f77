use std::sync::Once;

use bureau_features::domain::{ForcedEvent, LoanCategory, RawTradeline};
use bureau_features::ingest::{AnomalyKind, Field};
use bureau_features::report::{FindingSeverity, ReportStatus};
use bureau_features::{
    DefectPolicy, EngineConfig, EngineError, NarrationContext, Narrator, ReportRequest, Taxonomy, build_report,
    build_report_at, build_reports,
};
use chrono::{NaiveDate, TimeZone, Utc};

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn config() -> EngineConfig {
    EngineConfig::new(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap())
}

fn record(loan_type: &str) -> RawTradeline {
    RawTradeline {
        loan_type: loan_type.to_string(),
        status: Some("Active".to_string()),
        ..RawTradeline::default()
    }
}

fn mixed_portfolio() -> Vec<RawTradeline> {
    vec![
        RawTradeline {
            tradeline_id: Some("T1".to_string()),
            sanctioned_amount: Some("100000".to_string()),
            outstanding_amount: Some("30000".to_string()),
            credit_limit: Some("100000".to_string()),
            opened_on: Some("2023-01-10".to_string()),
            last_payment_on: Some("2025-12-20".to_string()),
            dpd: Some("0".to_string()),
            ..record("Credit Card")
        },
        RawTradeline {
            tradeline_id: Some("T2".to_string()),
            sanctioned_amount: Some("2500000".to_string()),
            outstanding_amount: Some("1800000".to_string()),
            opened_on: Some("2021-06-01".to_string()),
            dpd_history: Some("000|000|035|000".to_string()),
            ..record("Housing Loan")
        },
        RawTradeline {
            tradeline_id: Some("T3".to_string()),
            sanctioned_amount: Some("300000".to_string()),
            outstanding_amount: Some("0".to_string()),
            status: Some("Closed".to_string()),
            sector: Some("KOTAK BANK".to_string()),
            ..record("Personal Loan")
        },
    ]
}

#[test]
fn empty_portfolio_is_an_error() {
    init_tracing();
    let err = build_report("CUST0001", &[], &Taxonomy::default(), &config()).unwrap_err();
    assert!(matches!(err, EngineError::EmptyPortfolio { .. }));

    // Records with nothing in them count as empty too.
    let blanks = vec![RawTradeline::default(), RawTradeline::default()];
    let err = build_report("CUST0001", &blanks, &Taxonomy::default(), &config()).unwrap_err();
    assert!(matches!(err, EngineError::EmptyPortfolio { .. }));
}

#[test]
fn unknown_label_lands_in_other() {
    init_tracing();
    let report = build_report("CUST0002", &[record("Crypto Margin Facility")], &Taxonomy::default(), &config())
        .unwrap();

    let vectors = report.feature_vectors();
    assert_eq!(vectors.len(), 1);
    assert_eq!(vectors[&LoanCategory::Other].loan_count, 1);
    assert!(
        report
            .anomalies()
            .iter()
            .any(|a| matches!(&a.kind, AnomalyKind::UnmappedLoanType { raw } if raw == "Crypto Margin Facility"))
    );
}

#[test]
fn negative_amount_is_clamped_and_recorded() {
    init_tracing();
    let rec = RawTradeline {
        sanctioned_amount: Some("-50".to_string()),
        ..record("Personal Loan")
    };
    let report = build_report("CUST0003", &[rec], &Taxonomy::default(), &config()).unwrap();

    assert_eq!(report.summary().total_exposure, 0.0);
    assert_eq!(report.status(), ReportStatus::Complete);
    assert!(report.anomalies().iter().any(|a| matches!(
        a.kind,
        AnomalyKind::NegativeAmountClamped { field: Field::SanctionedAmount, .. }
    )));
}

#[test]
fn mixed_portfolio_end_to_end() {
    init_tracing();
    let at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
    let report = build_report_at("9449274898", &mixed_portfolio(), &Taxonomy::default(), &config(), at).unwrap();
    let s = report.summary();

    assert_eq!(s.total_tradelines, 3);
    assert_eq!(s.live_tradelines, 2);
    assert_eq!(s.closed_tradelines, 1);
    assert_eq!(s.total_exposure, 2_900_000.0);
    assert_eq!(s.total_outstanding, 1_830_000.0);
    // Home loan is secured by default; card and personal loan are not.
    assert_eq!(s.unsecured_exposure, 30_000.0);
    assert_eq!(s.max_dpd, Some(35));
    assert!(s.has_delinquency);
    assert_eq!(s.weighted_utilization, Some(0.3));

    let cc = &report.feature_vectors()[&LoanCategory::CreditCard];
    assert_eq!(cc.utilization_ratio(), Some(0.3));
    assert_eq!(cc.months_since_last_payment, Some(0));

    let pl = &report.feature_vectors()[&LoanCategory::PersonalLoan];
    assert_eq!(pl.on_us_count, 1);
    assert_eq!(pl.closed_count, 1);

    let findings = report.key_findings();
    assert_eq!(findings[0].severity, FindingSeverity::ModerateRisk);
    assert!(findings.iter().any(|f| f.finding.contains("max DPD of 35")));
    assert_eq!(report.meta().generated_at, at);
}

#[test]
fn oversized_amounts_are_dropped_not_summed() {
    init_tracing();
    let huge = || RawTradeline {
        sanctioned_amount: Some("1e308".to_string()),
        outstanding_amount: Some("1e308".to_string()),
        ..record("Personal Loan")
    };
    let report = build_report("CUST0001", &[huge(), huge()], &Taxonomy::default(), &config()).unwrap();

    let s = report.summary();
    assert_eq!(s.total_exposure, 0.0);
    assert_eq!(s.total_outstanding, 0.0);
    assert_eq!(report.status(), ReportStatus::Complete);
    let out_of_range = report
        .anomalies()
        .iter()
        .filter(|a| matches!(a.kind, AnomalyKind::Unparseable { .. }))
        .count();
    assert_eq!(out_of_range, 4);
}

#[test]
fn forced_events_surface_as_high_risk() {
    init_tracing();
    let rec = RawTradeline {
        outstanding_amount: Some("40000".to_string()),
        forced_events: vec!["WOF".to_string()],
        ..record("Personal Loan")
    };
    let report = build_report("CUST0004", &[rec], &Taxonomy::default(), &config()).unwrap();

    let pl = &report.feature_vectors()[&LoanCategory::PersonalLoan];
    assert!(pl.forced_event_flags.contains(&ForcedEvent::WrittenOff));
    assert!(pl.delinquency_flag);
    assert_eq!(report.key_findings()[0].severity, FindingSeverity::HighRisk);
}

#[test]
fn taxonomy_override_is_honored() {
    init_tracing();
    let taxonomy = Taxonomy::default_with_overrides(r#"{"Crypto Margin Facility": "personal_loan"}"#).unwrap();
    let report = build_report("CUST0005", &[record("Crypto Margin Facility")], &taxonomy, &config()).unwrap();

    assert!(report.feature_vectors().contains_key(&LoanCategory::PersonalLoan));
    assert!(report.anomalies().is_empty());
}

struct Template;

impl Narrator for Template {
    type Error = std::convert::Infallible;

    fn narrate(&self, ctx: &NarrationContext<'_>) -> Result<String, Self::Error> {
        Ok(format!(
            "Customer {} holds {} tradelines with {} key findings.",
            ctx.customer,
            ctx.summary.total_tradelines,
            ctx.key_findings.len()
        ))
    }
}

#[test]
fn narration_uses_computed_values_only() {
    init_tracing();
    let report = build_report("9449274898", &mixed_portfolio(), &Taxonomy::default(), &config())
        .unwrap()
        .narrate(&Template);

    let text = report.narrative().unwrap();
    assert!(text.contains("###4898"));
    assert!(text.contains("3 tradelines"));
    assert!(!text.contains("9449274898"));
}

#[test]
fn batch_runs_are_independent() {
    init_tracing();
    let mut cfg = config();
    cfg.defect_policy = DefectPolicy::Degrade;
    let requests = vec![
        ReportRequest::new("A0001", mixed_portfolio()),
        ReportRequest::new("B0002", Vec::new()),
        ReportRequest::new("C0003", vec![record("Gold Loan")]),
    ];
    let results = build_reports(&requests, &Taxonomy::default(), &cfg);

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().summary().total_tradelines, 3);
    assert!(matches!(results[1], Err(EngineError::EmptyPortfolio { .. })));
    assert!(results[2].as_ref().unwrap().feature_vectors()[&LoanCategory::GoldLoan].secured);
}

#[test]
fn report_json_shape() {
    init_tracing();
    let report = build_report("CUST0006", &mixed_portfolio(), &Taxonomy::default(), &config()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(json["meta"]["reference_date"], "2026-01-15");
    assert_eq!(json["summary"]["product_breakdown"]["credit_card"]["product"], "credit_card");
    assert!(json["key_findings"].is_array());
}
