//! Portfolio aggregation: category vectors → executive summary inputs.

use std::collections::BTreeMap;

use crate::domain::{ExecutiveSummaryInputs, FeatureVector, LoanCategory};

/// Roll per-category vectors into portfolio totals.
///
/// Only categories present in `vectors` appear in the breakdown.
pub fn aggregate(vectors: BTreeMap<LoanCategory, FeatureVector>) -> ExecutiveSummaryInputs {
    let mut total_tradelines = 0;
    let mut live_tradelines = 0;
    let mut closed_tradelines = 0;
    let mut total_exposure = 0.0;
    let mut total_outstanding = 0.0;
    let mut unsecured_exposure = 0.0;
    let mut has_delinquency = false;
    let mut max_dpd: Option<u32> = None;

    for vec in vectors.values() {
        total_tradelines += vec.loan_count;
        live_tradelines += vec.live_count;
        closed_tradelines += vec.closed_count;

        total_exposure += vec.total_sanctioned_amount;
        total_outstanding += vec.total_outstanding_amount;
        if !vec.secured {
            unsecured_exposure += vec.total_outstanding_amount;
        }

        has_delinquency |= vec.delinquency_flag;
        if let Some(dpd) = vec.max_dpd {
            max_dpd = Some(max_dpd.map_or(dpd, |m| m.max(dpd)));
        }
    }

    let weighted_utilization = weighted_utilization(&vectors);

    ExecutiveSummaryInputs {
        total_tradelines,
        live_tradelines,
        closed_tradelines,
        product_breakdown: vectors,
        total_exposure,
        total_outstanding,
        unsecured_exposure,
        has_delinquency,
        max_dpd,
        weighted_utilization,
    }
}

/// Outstanding-weighted mean of known credit-card utilization ratios.
///
/// Falls back to the plain mean when every contributing card vector has zero
/// outstanding (the weights would all be zero).
fn weighted_utilization(vectors: &BTreeMap<LoanCategory, FeatureVector>) -> Option<f64> {
    let known: Vec<(f64, f64)> = vectors
        .values()
        .filter_map(|v| v.utilization_ratio().map(|r| (r, v.total_outstanding_amount)))
        .collect();
    if known.is_empty() {
        return None;
    }

    let weight: f64 = known.iter().map(|(_, w)| w).sum();
    if weight > 0.0 {
        Some(known.iter().map(|(r, w)| r * w).sum::<f64>() / weight)
    } else {
        Some(known.iter().map(|(r, _)| r).sum::<f64>() / known.len() as f64)
    }
}
