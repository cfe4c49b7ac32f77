//! Raw tradeline normalization.
//!
//! This module is responsible for turning a customer's heterogeneous bureau
//! records into clean `Tradeline`s grouped by canonical category.
//!
//! Design goals:
//! - **Nothing dropped silently**: every skipped record or coerced field
//!   leaves an `Anomaly`
//! - **Unknown stays unknown**: missing/unreadable values become `None`,
//!   never `0`
//! - **Deterministic behavior**: input order is preserved within each
//!   category partition
//! - **Separation of concerns**: no feature math here

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::domain::{ForcedEvent, LoanCategory, LoanStatus, RawTradeline, Relationship, Tradeline};
use crate::ingest::parse::{
    parse_amount, parse_date, parse_dpd, parse_flag, present, scan_dpd_history,
};
use crate::taxonomy::Taxonomy;

/// Normalized status keywords. Anything else defaults to `Live`.
const STATUS_TABLE: &[(&str, LoanStatus)] = &[
    ("live", LoanStatus::Live),
    ("active", LoanStatus::Live),
    ("open", LoanStatus::Live),
    ("current", LoanStatus::Live),
    ("restructured", LoanStatus::Live),
    ("closed", LoanStatus::Closed),
    ("inactive", LoanStatus::Closed),
    ("repaid", LoanStatus::Closed),
    ("paid off", LoanStatus::Closed),
    ("settled", LoanStatus::Closed),
    ("written off", LoanStatus::Closed),
    ("write off", LoanStatus::Closed),
    ("terminated", LoanStatus::Closed),
];

/// The raw field an anomaly refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Secured,
    SanctionedAmount,
    OutstandingAmount,
    CreditLimit,
    OverdueAmount,
    OpenedOn,
    LastPaymentOn,
    Dpd,
    DpdHistory,
    OnUs,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Present but unreadable; treated as unknown.
    Unparseable { field: Field, raw: String },
    /// Negative amount replaced by zero.
    NegativeAmountClamped { field: Field, value: f64 },
    /// Date after the reference date; kept, elapsed months clamp at 0.
    FutureDate { field: Field, date: NaiveDate },
    /// Missing or unrecognized status, counted as live.
    StatusDefaulted { raw: Option<String> },
    /// Label not in the taxonomy; resolved to `other`.
    UnmappedLoanType { raw: String },
    /// No information at all; record skipped.
    EmptyRecord,
}

/// A non-fatal data-quality finding for one input record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    /// Position of the record in the input sequence.
    pub index: usize,
    pub tradeline_id: Option<String>,
    #[serde(flatten)]
    pub kind: AnomalyKind,
}

/// Normalizer output: partitions + anomalies + counts.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub partitions: BTreeMap<LoanCategory, Vec<Tradeline>>,
    pub anomalies: Vec<Anomaly>,
    pub records_read: usize,
    pub records_used: usize,
}

impl Normalized {
    pub fn is_empty(&self) -> bool {
        self.records_used == 0
    }
}

/// Normalize one customer's raw tradelines and group them by category.
pub fn normalize(records: &[RawTradeline], taxonomy: &Taxonomy, config: &EngineConfig) -> Normalized {
    let mut partitions: BTreeMap<LoanCategory, Vec<Tradeline>> = BTreeMap::new();
    let mut anomalies = Vec::new();

    for (index, raw) in records.iter().enumerate() {
        let mut sink = AnomalySink {
            index,
            tradeline_id: raw.tradeline_id.clone(),
            out: &mut anomalies,
        };
        if let Some(tradeline) = normalize_record(index, raw, taxonomy, config, &mut sink) {
            partitions.entry(tradeline.category).or_default().push(tradeline);
        }
    }

    let records_used = partitions.values().map(Vec::len).sum();
    tracing::debug!(
        records_read = records.len(),
        records_used,
        categories = partitions.len(),
        anomalies = anomalies.len(),
        "normalized tradelines"
    );

    Normalized {
        partitions,
        anomalies,
        records_read: records.len(),
        records_used,
    }
}

struct AnomalySink<'a> {
    index: usize,
    tradeline_id: Option<String>,
    out: &'a mut Vec<Anomaly>,
}

impl AnomalySink<'_> {
    fn push(&mut self, kind: AnomalyKind) {
        tracing::debug!(index = self.index, anomaly = ?kind, "tradeline anomaly");
        self.out.push(Anomaly {
            index: self.index,
            tradeline_id: self.tradeline_id.clone(),
            kind,
        });
    }

    fn unparseable(&mut self, field: Field, raw: Option<&str>) {
        self.push(AnomalyKind::Unparseable {
            field,
            raw: raw.unwrap_or_default().trim().to_string(),
        });
    }
}

fn normalize_record(
    index: usize,
    raw: &RawTradeline,
    taxonomy: &Taxonomy,
    config: &EngineConfig,
    sink: &mut AnomalySink<'_>,
) -> Option<Tradeline> {
    if is_empty_record(raw) {
        sink.push(AnomalyKind::EmptyRecord);
        return None;
    }

    // 1) Category.
    let category = match taxonomy.lookup(&raw.loan_type) {
        Some(category) => category,
        None => {
            sink.push(AnomalyKind::UnmappedLoanType {
                raw: raw.loan_type.trim().to_string(),
            });
            LoanCategory::Other
        }
    };

    // 2) Secured: category default unless the record says otherwise.
    let secured = match parse_flag(raw.secured.as_deref()) {
        Ok(Some(flag)) => flag,
        Ok(None) => config.is_secured_by_default(category),
        Err(_) => {
            sink.unparseable(Field::Secured, raw.secured.as_deref());
            config.is_secured_by_default(category)
        }
    };

    // 3) Amounts.
    let sanctioned_amount = amount(raw.sanctioned_amount.as_deref(), Field::SanctionedAmount, sink);
    let outstanding_amount = amount(raw.outstanding_amount.as_deref(), Field::OutstandingAmount, sink);
    let credit_limit = amount(raw.credit_limit.as_deref(), Field::CreditLimit, sink);
    let overdue_amount = amount(raw.overdue_amount.as_deref(), Field::OverdueAmount, sink);

    // 4) Dates.
    let opened_on = date(raw.opened_on.as_deref(), Field::OpenedOn, config.reference_date, sink);
    let last_payment_on = date(raw.last_payment_on.as_deref(), Field::LastPaymentOn, config.reference_date, sink);

    // 5) Forced events: explicit labels, status wording, DPD history codes.
    let mut forced_events: BTreeSet<ForcedEvent> = raw
        .forced_events
        .iter()
        .filter_map(|label| ForcedEvent::parse(label))
        .collect();
    if let Some(event) = present(raw.status.as_deref()).and_then(ForcedEvent::parse) {
        if !matches!(event, ForcedEvent::Other(_)) {
            forced_events.insert(event);
        }
    }

    let history = scan_dpd_history(raw.dpd_history.as_deref());
    if !history.unreadable.is_empty() {
        sink.unparseable(Field::DpdHistory, Some(history.unreadable.join(" ").as_str()));
    }
    forced_events.extend(history.events);

    // 6) DPD: the worst of the current value and the history.
    let current_dpd = match parse_dpd(raw.dpd.as_deref()) {
        Ok(v) => v,
        Err(_) => {
            sink.unparseable(Field::Dpd, raw.dpd.as_deref());
            None
        }
    };
    let max_dpd = match (current_dpd, history.max_dpd) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };

    // 7) Status and relationship.
    let status = classify_status(raw.status.as_deref(), sink);
    let relationship = classify_relationship(raw, config, sink);

    Some(Tradeline {
        index,
        tradeline_id: raw.tradeline_id.clone(),
        category,
        secured,
        sanctioned_amount,
        outstanding_amount,
        credit_limit,
        overdue_amount,
        opened_on,
        last_payment_on,
        status,
        max_dpd,
        relationship,
        forced_events,
    })
}

fn is_empty_record(raw: &RawTradeline) -> bool {
    let fields = [
        &raw.secured,
        &raw.sanctioned_amount,
        &raw.outstanding_amount,
        &raw.credit_limit,
        &raw.overdue_amount,
        &raw.opened_on,
        &raw.last_payment_on,
        &raw.status,
        &raw.dpd,
        &raw.dpd_history,
        &raw.sector,
        &raw.on_us,
    ];
    present(Some(raw.loan_type.as_str())).is_none()
        && fields.iter().all(|f| present(f.as_deref()).is_none())
        && raw.forced_events.iter().all(|e| present(Some(e.as_str())).is_none())
}

fn amount(raw: Option<&str>, field: Field, sink: &mut AnomalySink<'_>) -> Option<f64> {
    match parse_amount(raw) {
        Ok(Some(v)) if v < 0.0 => {
            sink.push(AnomalyKind::NegativeAmountClamped { field, value: v });
            Some(0.0)
        }
        Ok(v) => v,
        Err(_) => {
            sink.unparseable(field, raw);
            None
        }
    }
}

fn date(raw: Option<&str>, field: Field, reference: NaiveDate, sink: &mut AnomalySink<'_>) -> Option<NaiveDate> {
    match parse_date(raw) {
        Ok(Some(d)) => {
            if d > reference {
                sink.push(AnomalyKind::FutureDate { field, date: d });
            }
            Some(d)
        }
        Ok(None) => None,
        Err(_) => {
            sink.unparseable(field, raw);
            None
        }
    }
}

fn classify_status(raw: Option<&str>, sink: &mut AnomalySink<'_>) -> LoanStatus {
    let Some(s) = present(raw) else {
        sink.push(AnomalyKind::StatusDefaulted { raw: None });
        return LoanStatus::Live;
    };

    let key: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    match STATUS_TABLE.iter().find(|(k, _)| *k == key) {
        Some(&(_, status)) => status,
        None => {
            sink.push(AnomalyKind::StatusDefaulted {
                raw: Some(s.to_string()),
            });
            LoanStatus::Live
        }
    }
}

fn classify_relationship(raw: &RawTradeline, config: &EngineConfig, sink: &mut AnomalySink<'_>) -> Relationship {
    match parse_flag(raw.on_us.as_deref()) {
        Ok(Some(true)) => return Relationship::OnUs,
        Ok(Some(false)) => return Relationship::OffUs,
        Ok(None) => {}
        Err(_) => sink.unparseable(Field::OnUs, raw.on_us.as_deref()),
    }

    match present(raw.sector.as_deref()) {
        Some(sector) if config.is_on_us_sector(sector) => Relationship::OnUs,
        _ => Relationship::OffUs,
    }
}
