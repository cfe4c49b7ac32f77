//! Deterministic key findings.
//!
//! Threshold checks over the executive summary and its category vectors.
//! No model is involved: the same summary always yields the same findings,
//! ordered from highest risk to positive.

use serde::Serialize;

use crate::domain::{ExecutiveSummaryInputs, FeatureVector, LoanCategory};
use crate::report::format::{format_inr, format_pct};

/// Ordered: sorting ascending puts the most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingSeverity {
    HighRisk,
    ModerateRisk,
    Concern,
    Neutral,
    Positive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingArea {
    Delinquency,
    Portfolio,
    Utilization,
    Outstanding,
    AdverseEvents,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyFinding {
    pub area: FindingArea,
    /// Which product the finding is about; `None` for portfolio-wide.
    pub category: Option<LoanCategory>,
    pub finding: String,
    pub inference: String,
    pub severity: FindingSeverity,
}

impl KeyFinding {
    fn new(
        area: FindingArea,
        category: Option<LoanCategory>,
        severity: FindingSeverity,
        finding: String,
        inference: impl Into<String>,
    ) -> Self {
        Self {
            area,
            category,
            finding,
            inference: inference.into(),
            severity,
        }
    }
}

/// Portfolio findings first, then per-category, then a stable sort by severity.
pub fn extract_key_findings(summary: &ExecutiveSummaryInputs) -> Vec<KeyFinding> {
    let mut findings = portfolio_findings(summary);
    for (&category, vec) in &summary.product_breakdown {
        findings.extend(category_findings(category, vec));
    }
    findings.sort_by_key(|f| f.severity);
    findings
}

fn portfolio_findings(s: &ExecutiveSummaryInputs) -> Vec<KeyFinding> {
    use FindingSeverity::*;
    let mut out = Vec::new();

    if s.has_delinquency {
        let (severity, inference) = match s.max_dpd {
            Some(d) if d > 90 => (
                HighRisk,
                "Severe delinquency indicates significant repayment stress; account may be classified as NPA",
            ),
            Some(d) if d > 30 => (
                ModerateRisk,
                "Significant past-due status suggests repayment difficulty; close monitoring required",
            ),
            _ => (
                Concern,
                "Early-stage past-due status; may reflect a temporary cash-flow mismatch",
            ),
        };
        let finding = match s.max_dpd {
            Some(d) if d > 0 => format!("Delinquency detected with max DPD of {d} days"),
            _ => "Delinquency markers reported by the bureau".to_string(),
        };
        out.push(KeyFinding::new(FindingArea::Delinquency, None, severity, finding, inference));
    } else {
        out.push(KeyFinding::new(
            FindingArea::Delinquency,
            None,
            Positive,
            "No delinquency detected across the portfolio".to_string(),
            "Clean delinquency record is a positive indicator of repayment discipline",
        ));
    }

    if s.total_outstanding > 0.0 {
        let share = s.unsecured_exposure / s.total_outstanding;
        let finding = format!(
            "Unsecured exposure is {} of outstanding (INR {} of INR {})",
            format_pct(share),
            format_inr(s.unsecured_exposure),
            format_inr(s.total_outstanding)
        );
        if share > 0.8 {
            out.push(KeyFinding::new(
                FindingArea::Portfolio,
                None,
                ModerateRisk,
                finding,
                "Heavily skewed towards unsecured lending; higher risk in the absence of collateral",
            ));
        } else if share > 0.5 {
            out.push(KeyFinding::new(
                FindingArea::Portfolio,
                None,
                Concern,
                finding,
                "Majority unsecured portfolio; monitor for over-leveraging on unsecured products",
            ));
        }
    }

    if s.total_exposure > 0.0 {
        let ratio = s.total_outstanding / s.total_exposure;
        if ratio > 0.8 {
            out.push(KeyFinding::new(
                FindingArea::Portfolio,
                None,
                Concern,
                format!("Outstanding balance is {} of total sanctioned exposure", format_pct(ratio)),
                "Most sanctioned amount still outstanding; limited repayment progress",
            ));
        }
    }

    let products = s.product_breakdown.len();
    if products >= 4 {
        let names: Vec<&str> = s.product_breakdown.keys().map(|c| c.display_name()).collect();
        out.push(KeyFinding::new(
            FindingArea::Portfolio,
            None,
            Neutral,
            format!("Portfolio spans {products} loan products ({})", names.join(", ")),
            "Diversified credit portfolio indicates established borrowing history",
        ));
    }

    out
}

fn category_findings(category: LoanCategory, v: &FeatureVector) -> Vec<KeyFinding> {
    use FindingSeverity::*;
    let mut out = Vec::new();
    let name = category.display_name();

    if let Some(util) = v.utilization_ratio() {
        let finding = format!("Credit card utilization at {}", format_pct(util));
        let graded = if util > 0.75 {
            Some((HighRisk, "Over-utilization of card limits signals high credit dependency"))
        } else if util > 0.5 {
            Some((ModerateRisk, "Elevated utilization; approaching the high-risk threshold"))
        } else if util <= 0.3 {
            Some((Positive, "Healthy utilization indicates disciplined card usage"))
        } else {
            None
        };
        if let Some((severity, inference)) = graded {
            out.push(KeyFinding::new(FindingArea::Utilization, Some(category), severity, finding, inference));
        }
    }

    if v.delinquency_flag {
        match v.max_dpd {
            Some(d) if d > 90 => out.push(KeyFinding::new(
                FindingArea::Delinquency,
                Some(category),
                HighRisk,
                format!("{name}: delinquent with max DPD of {d} days"),
                format!("Severe delinquency on {name}; may indicate deep financial distress"),
            )),
            Some(d) if d > 30 => out.push(KeyFinding::new(
                FindingArea::Delinquency,
                Some(category),
                ModerateRisk,
                format!("{name}: delinquent with max DPD of {d} days"),
                format!("Significant past-due on {name}; repayment discipline is compromised"),
            )),
            _ => {}
        }
    }

    if v.overdue_amount > 0.0 {
        out.push(KeyFinding::new(
            FindingArea::Outstanding,
            Some(category),
            Concern,
            format!("{name}: overdue amount of INR {}", format_inr(v.overdue_amount)),
            format!("Active overdue balance on {name} indicates an unresolved payment obligation"),
        ));
    }

    if !v.forced_event_flags.is_empty() {
        let codes: Vec<&str> = v.forced_event_flags.iter().map(|e| e.code()).collect();
        out.push(KeyFinding::new(
            FindingArea::AdverseEvents,
            Some(category),
            HighRisk,
            format!("{name}: forced events reported ({})", codes.join(", ")),
            format!("Adverse credit events on {name} are strong negative signals"),
        ));
    }

    out
}
