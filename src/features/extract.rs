//! Per-category feature extraction.
//!
//! `extract_features` is a pure function of one category partition: same
//! records in, bit-identical vector out. Sums run in partition (input) order.
//!
//! Missing inputs never turn into zeros:
//! - totals only add *known* values
//! - optional features (vintage, recency, DPD, utilization) are `None` when
//!   no record contributes

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::domain::{
    FeatureVector, ForcedEvent, LoanCategory, LoanStatus, ProductFeatures, Relationship, Tradeline,
};

/// Compute one vector per category, in parallel, and join.
pub fn extract_all(
    partitions: &BTreeMap<LoanCategory, Vec<Tradeline>>,
    config: &EngineConfig,
) -> BTreeMap<LoanCategory, FeatureVector> {
    partitions
        .par_iter()
        .map(|(&category, records)| (category, extract_features(category, records, config)))
        .collect()
}

/// Build the feature vector for one category partition.
pub fn extract_features(category: LoanCategory, records: &[Tradeline], config: &EngineConfig) -> FeatureVector {
    let loan_count = records.len();
    let reference = config.reference_date;

    let secured = if records.is_empty() {
        config.is_secured_by_default(category)
    } else {
        records.iter().all(|r| r.secured)
    };

    let total_sanctioned_amount = sum_known(records.iter().map(|r| r.sanctioned_amount));
    let total_outstanding_amount = sum_known(records.iter().map(|r| r.outstanding_amount));
    let overdue_amount = sum_known(records.iter().map(|r| r.overdue_amount));

    let vintages: Vec<f64> = records
        .iter()
        .filter_map(|r| r.opened_on)
        .map(|d| f64::from(months_between(d, reference)))
        .collect();
    let average_vintage_months = mean(&vintages).map(round1);

    let months_since_last_payment = records
        .iter()
        .filter_map(|r| r.last_payment_on)
        .max()
        .map(|latest| months_between(latest, reference));

    let live_count = records.iter().filter(|r| r.status == LoanStatus::Live).count();
    let closed_count = records.iter().filter(|r| r.status == LoanStatus::Closed).count();

    let max_dpd = records.iter().filter_map(|r| r.max_dpd).max();
    let delinquency_flag = records.iter().any(|r| {
        r.max_dpd.is_some_and(|d| d > config.dpd_threshold)
            || r.forced_events.iter().any(ForcedEvent::is_delinquency_marker)
    });

    let forced_event_flags: BTreeSet<ForcedEvent> = records
        .iter()
        .flat_map(|r| r.forced_events.iter().cloned())
        .collect();

    let on_us_count = records
        .iter()
        .filter(|r| r.relationship == Relationship::OnUs)
        .count();
    let off_us_count = loan_count - on_us_count;

    let product = match category.term() {
        None => ProductFeatures::CreditCard {
            utilization_ratio: utilization_ratio(records),
        },
        Some(term) => ProductFeatures::Term { category: term },
    };

    FeatureVector {
        product,
        secured,
        loan_count,
        total_sanctioned_amount,
        total_outstanding_amount,
        average_vintage_months,
        months_since_last_payment,
        live_count,
        closed_count,
        delinquency_flag,
        max_dpd,
        overdue_amount,
        forced_event_flags,
        on_us_count,
        off_us_count,
    }
}

/// `Σ outstanding / Σ limit` over cards whose limit is known and positive
/// and whose outstanding is known.
fn utilization_ratio(records: &[Tradeline]) -> Option<f64> {
    let mut outstanding = 0.0;
    let mut limit = 0.0;
    let mut contributing = 0usize;

    for r in records {
        if let (Some(o), Some(l)) = (r.outstanding_amount, r.credit_limit) {
            if l > 0.0 {
                outstanding += o;
                limit += l;
                contributing += 1;
            }
        }
    }

    if contributing == 0 {
        return None;
    }
    Some(round4(outstanding / limit))
}

fn sum_known(values: impl Iterator<Item = Option<f64>>) -> f64 {
    values.flatten().sum()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Completed calendar months from `from` to `to`; 0 if `from` is later.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    let mut months = (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32);
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0) as u32
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
