//! Loan-type label → canonical category lookup.
//!
//! Resolution is a table lookup on a normalized key, never a chain of
//! conditionals: adding a synonym or re-pointing a label is a data change.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::LoanCategory;
use crate::error::EngineError;

/// Raw labels seen in bureau exports, plus common synonyms.
const DEFAULT_LABELS: &[(&str, LoanCategory)] = &[
    ("Personal Loan", LoanCategory::PersonalLoan),
    ("Short Term Personal Loan", LoanCategory::PersonalLoan),
    ("PL", LoanCategory::PersonalLoan),
    ("Credit Card", LoanCategory::CreditCard),
    ("Corporate Credit Card", LoanCategory::CreditCard),
    ("Secured Credit Card", LoanCategory::CreditCard),
    ("CC", LoanCategory::CreditCard),
    ("Home Loan", LoanCategory::HomeLoan),
    ("Housing Loan", LoanCategory::HomeLoan),
    ("HL", LoanCategory::HomeLoan),
    ("Auto Loan", LoanCategory::AutoLoan),
    ("Used Car Loan", LoanCategory::AutoLoan),
    ("Car Loan", LoanCategory::AutoLoan),
    ("Business Loan - General", LoanCategory::BusinessLoan),
    ("Business Loan - Priority Sector - Agriculture", LoanCategory::BusinessLoan),
    ("Business Loan", LoanCategory::BusinessLoan),
    ("GECL Loan Secured", LoanCategory::BusinessLoan),
    ("GECL Loan Unsecured", LoanCategory::BusinessLoan),
    ("Loan_against_securities", LoanCategory::LapLasLad),
    ("Loan Against Shares", LoanCategory::LapLasLad),
    ("Loan Against Property", LoanCategory::LapLasLad),
    ("Loan Against Deposits", LoanCategory::LapLasLad),
    ("Property Loan", LoanCategory::LapLasLad),
    ("LAP", LoanCategory::LapLasLad),
    ("LAS", LoanCategory::LapLasLad),
    ("LAD", LoanCategory::LapLasLad),
    ("Gold Loan", LoanCategory::GoldLoan),
    ("Priority Sector - Gold Loan", LoanCategory::GoldLoan),
    ("Two-wheeler Loan", LoanCategory::TwoWheelerLoan),
    ("TWL", LoanCategory::TwoWheelerLoan),
    ("Consumer Loan", LoanCategory::ConsumerDurable),
    ("Consumer Durable Loan", LoanCategory::ConsumerDurable),
    ("Other", LoanCategory::Other),
];

/// Label lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, LoanCategory>", into = "HashMap<String, LoanCategory>")]
pub struct Taxonomy {
    entries: HashMap<String, LoanCategory>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::from_entries(
            DEFAULT_LABELS
                .iter()
                .map(|&(label, category)| (label.to_string(), category)),
        )
    }
}

impl Taxonomy {
    /// Build a table from `(label, category)` pairs.
    ///
    /// Every category's canonical key (`"credit_card"`, ...) always resolves
    /// to itself; later pairs win over earlier ones for the same key.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, LoanCategory)>,
    {
        let mut map: HashMap<String, LoanCategory> = LoanCategory::ALL
            .iter()
            .map(|&c| (normalize_label(c.as_str()), c))
            .collect();
        for (label, category) in entries {
            let key = normalize_label(&label);
            if !key.is_empty() {
                map.insert(key, category);
            }
        }
        Self { entries: map }
    }

    /// Parse a JSON object of `label → category` supplied by configuration.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Default table extended with `overrides` (JSON object).
    pub fn default_with_overrides(json: &str) -> Result<Self, EngineError> {
        let extra: HashMap<String, LoanCategory> = serde_json::from_str(json)?;
        Ok(Self::default().extend(extra))
    }

    pub fn with_synonym(self, label: &str, category: LoanCategory) -> Self {
        self.extend([(label.to_string(), category)])
    }

    fn extend<I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (String, LoanCategory)>,
    {
        for (label, category) in entries {
            let key = normalize_label(&label);
            if !key.is_empty() {
                self.entries.insert(key, category);
            }
        }
        self
    }

    /// Resolve a free-form label. Total: unknown labels map to `Other`.
    pub fn resolve(&self, raw_label: &str) -> LoanCategory {
        self.lookup(raw_label).unwrap_or(LoanCategory::Other)
    }

    /// Like `resolve`, but tells unmapped labels apart from an explicit
    /// `Other` mapping.
    pub fn lookup(&self, raw_label: &str) -> Option<LoanCategory> {
        self.entries.get(&normalize_label(raw_label)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<HashMap<String, LoanCategory>> for Taxonomy {
    fn from(value: HashMap<String, LoanCategory>) -> Self {
        Self::from_entries(value)
    }
}

impl From<Taxonomy> for HashMap<String, LoanCategory> {
    fn from(value: Taxonomy) -> Self {
        value.entries
    }
}

/// Lowercase, treat punctuation as whitespace, collapse runs of whitespace.
fn normalize_label(raw: &str) -> String {
    let spaced: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}
