//! Post-aggregation invariant checks.
//!
//! Validation never aborts: it returns diagnostics and lets the caller decide.
//! Two severities:
//! - `Degraded`: the report is still usable but carries the diagnostic
//! - `Defect`: something normalization guarantees was violated (e.g. a
//!   negative amount after clamping); this is a bug, logged at error level

use serde::Serialize;

use crate::domain::{ExecutiveSummaryInputs, FeatureVector, LoanCategory};

/// Tolerance for float comparisons between recomputed sums.
const EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Degraded,
    Defect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Invariant {
    StatusCountsMatchLoanCount,
    RelationshipCountsMatchLoanCount,
    CategoryKeyMatchesVector,
    UtilizationOnlyForCreditCard,
    PortfolioCountsMatchVectors,
    PortfolioDpdMatchesVectors,
    PortfolioDelinquencyMatchesVectors,
    UnsecuredWithinOutstanding,
    OptionalValueFinite,
    AmountNonNegative,
}

/// Where a diagnostic applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Category(LoanCategory),
    Portfolio,
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subject::Category(c) => write!(f, "{c}"),
            Subject::Portfolio => f.write_str("portfolio"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub invariant: Invariant,
    pub subject: Subject,
    pub severity: Severity,
    pub detail: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} [{}]: {}", self.invariant, self.subject, self.detail)
    }
}

/// Re-check every structural invariant of the summary and its vectors.
pub fn validate(summary: &ExecutiveSummaryInputs) -> Vec<Diagnostic> {
    let mut out = Vec::new();

    for (&key, vec) in &summary.product_breakdown {
        check_vector(key, vec, &mut out);
    }
    check_portfolio(summary, &mut out);

    out
}

pub fn has_defects(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity == Severity::Defect)
}

fn push(out: &mut Vec<Diagnostic>, invariant: Invariant, subject: Subject, severity: Severity, detail: String) {
    out.push(Diagnostic {
        invariant,
        subject,
        severity,
        detail,
    });
}

fn check_vector(key: LoanCategory, vec: &FeatureVector, out: &mut Vec<Diagnostic>) {
    let subject = Subject::Category(key);

    if vec.category() != key {
        push(
            out,
            Invariant::CategoryKeyMatchesVector,
            subject,
            Severity::Degraded,
            format!("vector for {} filed under {key}", vec.category()),
        );
    }

    if vec.live_count + vec.closed_count != vec.loan_count {
        push(
            out,
            Invariant::StatusCountsMatchLoanCount,
            subject,
            Severity::Degraded,
            format!(
                "live {} + closed {} != loan_count {}",
                vec.live_count, vec.closed_count, vec.loan_count
            ),
        );
    }

    if vec.on_us_count + vec.off_us_count != vec.loan_count {
        push(
            out,
            Invariant::RelationshipCountsMatchLoanCount,
            subject,
            Severity::Degraded,
            format!(
                "on_us {} + off_us {} != loan_count {}",
                vec.on_us_count, vec.off_us_count, vec.loan_count
            ),
        );
    }

    if let Some(ratio) = vec.utilization_ratio() {
        if key != LoanCategory::CreditCard {
            push(
                out,
                Invariant::UtilizationOnlyForCreditCard,
                subject,
                Severity::Degraded,
                format!("utilization_ratio={ratio} on a non credit-card category"),
            );
        }
        if !ratio.is_finite() || ratio < 0.0 {
            push(
                out,
                Invariant::OptionalValueFinite,
                subject,
                Severity::Degraded,
                format!("utilization_ratio={ratio}"),
            );
        }
    }

    if let Some(vintage) = vec.average_vintage_months {
        if !vintage.is_finite() || vintage < 0.0 {
            push(
                out,
                Invariant::OptionalValueFinite,
                subject,
                Severity::Degraded,
                format!("average_vintage_months={vintage}"),
            );
        }
    }

    for (name, value) in [
        ("total_sanctioned_amount", vec.total_sanctioned_amount),
        ("total_outstanding_amount", vec.total_outstanding_amount),
        ("overdue_amount", vec.overdue_amount),
    ] {
        check_amount(name, value, subject, out);
    }
}

fn check_portfolio(summary: &ExecutiveSummaryInputs, out: &mut Vec<Diagnostic>) {
    let vectors = summary.product_breakdown.values();

    let (loans, live, closed) = vectors.clone().fold((0, 0, 0), |(n, l, c), v| {
        (n + v.loan_count, l + v.live_count, c + v.closed_count)
    });
    for (name, expected, actual) in [
        ("total_tradelines", loans, summary.total_tradelines),
        ("live_tradelines", live, summary.live_tradelines),
        ("closed_tradelines", closed, summary.closed_tradelines),
    ] {
        if expected != actual {
            push(
                out,
                Invariant::PortfolioCountsMatchVectors,
                Subject::Portfolio,
                Severity::Degraded,
                format!("{name}={actual} but vectors sum to {expected}"),
            );
        }
    }

    let max_dpd = vectors.clone().filter_map(|v| v.max_dpd).max();
    if max_dpd != summary.max_dpd {
        push(
            out,
            Invariant::PortfolioDpdMatchesVectors,
            Subject::Portfolio,
            Severity::Degraded,
            format!("max_dpd={:?} but vectors give {max_dpd:?}", summary.max_dpd),
        );
    }

    let delinquent = vectors.clone().any(|v| v.delinquency_flag);
    if delinquent != summary.has_delinquency {
        push(
            out,
            Invariant::PortfolioDelinquencyMatchesVectors,
            Subject::Portfolio,
            Severity::Degraded,
            format!(
                "has_delinquency={} but vectors give {delinquent}",
                summary.has_delinquency
            ),
        );
    }

    if summary.unsecured_exposure > summary.total_outstanding + EPS {
        push(
            out,
            Invariant::UnsecuredWithinOutstanding,
            Subject::Portfolio,
            Severity::Degraded,
            format!(
                "unsecured_exposure={} > total_outstanding={}",
                summary.unsecured_exposure, summary.total_outstanding
            ),
        );
    }

    if let Some(u) = summary.weighted_utilization {
        if !u.is_finite() || u < 0.0 {
            push(
                out,
                Invariant::OptionalValueFinite,
                Subject::Portfolio,
                Severity::Degraded,
                format!("weighted_utilization={u}"),
            );
        }
    }

    for (name, value) in [
        ("total_exposure", summary.total_exposure),
        ("total_outstanding", summary.total_outstanding),
        ("unsecured_exposure", summary.unsecured_exposure),
    ] {
        check_amount(name, value, Subject::Portfolio, out);
    }
}

fn check_amount(name: &str, value: f64, subject: Subject, out: &mut Vec<Diagnostic>) {
    if !value.is_finite() || value < 0.0 {
        push(
            out,
            Invariant::AmountNonNegative,
            subject,
            Severity::Defect,
            format!("{name}={value}"),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::domain::{ProductFeatures, TermLoan};
    use crate::features::aggregate;

    fn vector(product: ProductFeatures) -> FeatureVector {
        FeatureVector {
            product,
            secured: false,
            loan_count: 3,
            total_sanctioned_amount: 900.0,
            total_outstanding_amount: 300.0,
            average_vintage_months: Some(12.0),
            months_since_last_payment: Some(1),
            live_count: 2,
            closed_count: 1,
            delinquency_flag: false,
            max_dpd: Some(0),
            overdue_amount: 0.0,
            forced_event_flags: BTreeSet::new(),
            on_us_count: 1,
            off_us_count: 2,
        }
    }

    fn pl() -> ProductFeatures {
        ProductFeatures::Term {
            category: TermLoan::PersonalLoan,
        }
    }

    #[test]
    fn consistent_summary_is_clean() {
        let summary = aggregate(BTreeMap::from([
            (LoanCategory::PersonalLoan, vector(pl())),
            (
                LoanCategory::CreditCard,
                vector(ProductFeatures::CreditCard {
                    utilization_ratio: Some(0.4),
                }),
            ),
        ]));
        assert!(validate(&summary).is_empty());
    }

    #[test]
    fn broken_counts_degrade() {
        let mut v = vector(pl());
        v.closed_count = 5;
        let mut summary = aggregate(BTreeMap::from([(LoanCategory::PersonalLoan, v)]));
        summary.total_tradelines = 99;

        let diags = validate(&summary);
        assert!(diags.iter().any(|d| d.invariant == Invariant::StatusCountsMatchLoanCount));
        assert!(diags.iter().any(|d| d.invariant == Invariant::PortfolioCountsMatchVectors));
        assert!(!has_defects(&diags));
    }

    #[test]
    fn misfiled_card_vector_is_caught() {
        let card = vector(ProductFeatures::CreditCard {
            utilization_ratio: Some(0.2),
        });
        let summary = aggregate(BTreeMap::from([(LoanCategory::GoldLoan, card)]));

        let kinds: Vec<Invariant> = validate(&summary).iter().map(|d| d.invariant).collect();
        assert!(kinds.contains(&Invariant::CategoryKeyMatchesVector));
        assert!(kinds.contains(&Invariant::UtilizationOnlyForCreditCard));
    }

    #[test]
    fn negative_amount_is_a_defect() {
        let mut v = vector(pl());
        v.overdue_amount = -1.0;
        let summary = aggregate(BTreeMap::from([(LoanCategory::PersonalLoan, v)]));

        let diags = validate(&summary);
        assert!(has_defects(&diags));
        assert_eq!(diags[0].subject, Subject::Category(LoanCategory::PersonalLoan));
    }
}
