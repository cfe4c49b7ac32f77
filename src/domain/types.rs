//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - handed in by the data-access layer (`RawTradeline`)
//! - passed between pipeline stages in-memory
//! - shipped to the narration/rendering collaborators as JSON

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Canonical loan taxonomy. Closed set; anything unmapped is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanCategory {
    PersonalLoan,
    CreditCard,
    HomeLoan,
    AutoLoan,
    BusinessLoan,
    LapLasLad,
    GoldLoan,
    TwoWheelerLoan,
    ConsumerDurable,
    Other,
}

impl LoanCategory {
    pub const ALL: [LoanCategory; 10] = [
        LoanCategory::PersonalLoan,
        LoanCategory::CreditCard,
        LoanCategory::HomeLoan,
        LoanCategory::AutoLoan,
        LoanCategory::BusinessLoan,
        LoanCategory::LapLasLad,
        LoanCategory::GoldLoan,
        LoanCategory::TwoWheelerLoan,
        LoanCategory::ConsumerDurable,
        LoanCategory::Other,
    ];

    /// Stable snake_case key (matches the serde representation).
    pub fn as_str(self) -> &'static str {
        match self {
            LoanCategory::PersonalLoan => "personal_loan",
            LoanCategory::CreditCard => "credit_card",
            LoanCategory::HomeLoan => "home_loan",
            LoanCategory::AutoLoan => "auto_loan",
            LoanCategory::BusinessLoan => "business_loan",
            LoanCategory::LapLasLad => "lap_las_lad",
            LoanCategory::GoldLoan => "gold_loan",
            LoanCategory::TwoWheelerLoan => "two_wheeler_loan",
            LoanCategory::ConsumerDurable => "consumer_durable",
            LoanCategory::Other => "other",
        }
    }

    /// Human-readable label for findings and tables.
    pub fn display_name(self) -> &'static str {
        match self {
            LoanCategory::PersonalLoan => "Personal Loan",
            LoanCategory::CreditCard => "Credit Card",
            LoanCategory::HomeLoan => "Home Loan",
            LoanCategory::AutoLoan => "Auto Loan",
            LoanCategory::BusinessLoan => "Business Loan",
            LoanCategory::LapLasLad => "LAP/LAS/LAD",
            LoanCategory::GoldLoan => "Gold Loan",
            LoanCategory::TwoWheelerLoan => "Two-Wheeler Loan",
            LoanCategory::ConsumerDurable => "Consumer Durable",
            LoanCategory::Other => "Other",
        }
    }

    /// The term-loan view of this category; `None` for credit cards.
    pub fn term(self) -> Option<TermLoan> {
        match self {
            LoanCategory::PersonalLoan => Some(TermLoan::PersonalLoan),
            LoanCategory::CreditCard => None,
            LoanCategory::HomeLoan => Some(TermLoan::HomeLoan),
            LoanCategory::AutoLoan => Some(TermLoan::AutoLoan),
            LoanCategory::BusinessLoan => Some(TermLoan::BusinessLoan),
            LoanCategory::LapLasLad => Some(TermLoan::LapLasLad),
            LoanCategory::GoldLoan => Some(TermLoan::GoldLoan),
            LoanCategory::TwoWheelerLoan => Some(TermLoan::TwoWheelerLoan),
            LoanCategory::ConsumerDurable => Some(TermLoan::ConsumerDurable),
            LoanCategory::Other => Some(TermLoan::Other),
        }
    }
}

impl std::fmt::Display for LoanCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every category except `CreditCard`.
///
/// Keeping this as its own type is what makes a utilization ratio
/// unrepresentable outside the credit-card product (see `ProductFeatures`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermLoan {
    PersonalLoan,
    HomeLoan,
    AutoLoan,
    BusinessLoan,
    LapLasLad,
    GoldLoan,
    TwoWheelerLoan,
    ConsumerDurable,
    Other,
}

impl From<TermLoan> for LoanCategory {
    fn from(value: TermLoan) -> Self {
        match value {
            TermLoan::PersonalLoan => LoanCategory::PersonalLoan,
            TermLoan::HomeLoan => LoanCategory::HomeLoan,
            TermLoan::AutoLoan => LoanCategory::AutoLoan,
            TermLoan::BusinessLoan => LoanCategory::BusinessLoan,
            TermLoan::LapLasLad => LoanCategory::LapLasLad,
            TermLoan::GoldLoan => LoanCategory::GoldLoan,
            TermLoan::TwoWheelerLoan => LoanCategory::TwoWheelerLoan,
            TermLoan::ConsumerDurable => LoanCategory::ConsumerDurable,
            TermLoan::Other => LoanCategory::Other,
        }
    }
}

/// Normalized account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Live,
    Closed,
}

/// Whether the reporting institution is also the lender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    OnUs,
    OffUs,
}

/// Non-standard account events (restructuring, settlement, write-off) and
/// RBI asset-classification codes seen in bureau DPD histories.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForcedEvent {
    Restructured,
    Settled,
    WrittenOff,
    SpecialMention,
    Substandard,
    Doubtful,
    Loss,
    /// Unrecognized code, kept verbatim (upper-cased).
    Other(String),
}

impl ForcedEvent {
    /// Parse a bureau code (`SET`, `WOF`, ...) or a free-text label
    /// (`"Written Off"`, `"restructured"`). Returns `None` for blanks and for
    /// the standard/no-info markers `STD` and `XXX`.
    pub fn parse(raw: &str) -> Option<ForcedEvent> {
        let key: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();

        let event = match key.as_str() {
            "" | "STD" | "XXX" => return None,
            "RST" | "RES" | "RESTRUCTURED" | "RESTRUCTURE" => ForcedEvent::Restructured,
            "SET" | "STL" | "SETTLED" | "SETTLEMENT" => ForcedEvent::Settled,
            "WOF" | "WRF" | "WO" | "WRITTENOFF" | "WRITEOFF" => ForcedEvent::WrittenOff,
            "SMA" => ForcedEvent::SpecialMention,
            "SUB" | "SUBSTANDARD" => ForcedEvent::Substandard,
            "DBT" | "DOUBTFUL" => ForcedEvent::Doubtful,
            "LSS" | "LOSS" => ForcedEvent::Loss,
            _ => ForcedEvent::Other(key),
        };
        Some(event)
    }

    /// Canonical 3-letter bureau code.
    pub fn code(&self) -> &str {
        match self {
            ForcedEvent::Restructured => "RST",
            ForcedEvent::Settled => "SET",
            ForcedEvent::WrittenOff => "WOF",
            ForcedEvent::SpecialMention => "SMA",
            ForcedEvent::Substandard => "SUB",
            ForcedEvent::Doubtful => "DBT",
            ForcedEvent::Loss => "LSS",
            ForcedEvent::Other(code) => code,
        }
    }

    /// Events that imply past-due status regardless of the reported DPD.
    pub fn is_delinquency_marker(&self) -> bool {
        matches!(
            self,
            ForcedEvent::SpecialMention
                | ForcedEvent::Substandard
                | ForcedEvent::Doubtful
                | ForcedEvent::Loss
                | ForcedEvent::WrittenOff
        )
    }
}

/// A raw tradeline as delivered by the data-access layer.
///
/// Everything except the loan-type label is optional text; coercion happens
/// in `ingest`. This mirrors what bureau exports actually look like
/// (`"NULL"`, `"1,20,000"`, `"05/03/2021"`...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTradeline {
    pub tradeline_id: Option<String>,
    pub loan_type: String,
    pub secured: Option<String>,

    pub sanctioned_amount: Option<String>,
    pub outstanding_amount: Option<String>,
    /// Only meaningful for credit cards.
    pub credit_limit: Option<String>,
    pub overdue_amount: Option<String>,

    pub opened_on: Option<String>,
    pub last_payment_on: Option<String>,

    pub status: Option<String>,
    /// Current days-past-due.
    pub dpd: Option<String>,
    /// Monthly history: concatenated 3-char tokens, either DPD numbers
    /// (`"000"`, `"030"`) or status codes (`"STD"`, `"SMA"`, `"WOF"`).
    pub dpd_history: Option<String>,

    /// Lender sector, used to infer on-us when `on_us` is absent.
    pub sector: Option<String>,
    pub on_us: Option<String>,

    pub forced_events: Vec<String>,
}

/// A normalized tradeline.
///
/// Amounts are never negative; `None` means "unknown", never zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Tradeline {
    /// Position in the input sequence (for traceability).
    pub index: usize,
    pub tradeline_id: Option<String>,
    pub category: LoanCategory,
    pub secured: bool,

    pub sanctioned_amount: Option<f64>,
    pub outstanding_amount: Option<f64>,
    pub credit_limit: Option<f64>,
    pub overdue_amount: Option<f64>,

    pub opened_on: Option<NaiveDate>,
    pub last_payment_on: Option<NaiveDate>,

    pub status: LoanStatus,
    pub max_dpd: Option<u32>,
    pub relationship: Relationship,
    pub forced_events: BTreeSet<ForcedEvent>,
}

/// Category-specific part of a feature vector.
///
/// `TermLoan` has no credit-card variant and carries no ratio, so a
/// utilization figure cannot be attached to any other product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "product", rename_all = "snake_case")]
pub enum ProductFeatures {
    CreditCard { utilization_ratio: Option<f64> },
    Term { category: TermLoan },
}

/// Features for all tradelines of one canonical category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    #[serde(flatten)]
    pub product: ProductFeatures,
    pub secured: bool,

    pub loan_count: usize,
    pub total_sanctioned_amount: f64,
    pub total_outstanding_amount: f64,

    pub average_vintage_months: Option<f64>,
    pub months_since_last_payment: Option<u32>,

    pub live_count: usize,
    pub closed_count: usize,

    pub delinquency_flag: bool,
    pub max_dpd: Option<u32>,
    pub overdue_amount: f64,

    pub forced_event_flags: BTreeSet<ForcedEvent>,
    pub on_us_count: usize,
    pub off_us_count: usize,
}

impl FeatureVector {
    pub fn category(&self) -> LoanCategory {
        match self.product {
            ProductFeatures::CreditCard { .. } => LoanCategory::CreditCard,
            ProductFeatures::Term { category } => category.into(),
        }
    }

    pub fn utilization_ratio(&self) -> Option<f64> {
        match self.product {
            ProductFeatures::CreditCard { utilization_ratio } => utilization_ratio,
            ProductFeatures::Term { .. } => None,
        }
    }
}

/// Portfolio-level inputs for the executive summary.
///
/// `product_breakdown` holds only categories actually present; absent
/// categories are omitted, never zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummaryInputs {
    pub total_tradelines: usize,
    pub live_tradelines: usize,
    pub closed_tradelines: usize,

    pub product_breakdown: BTreeMap<LoanCategory, FeatureVector>,

    pub total_exposure: f64,
    pub total_outstanding: f64,
    pub unsecured_exposure: f64,

    pub has_delinquency: bool,
    pub max_dpd: Option<u32>,

    /// Outstanding-weighted mean of credit-card utilization.
    pub weighted_utilization: Option<f64>,
}
