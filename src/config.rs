//! Engine configuration.
//!
//! The configuration collaborator owns these values; this crate only consumes
//! them. `EngineConfig` deserializes with serde (missing fields take the
//! defaults below) and can pick up overrides from the process environment.

use std::collections::BTreeSet;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::LoanCategory;
use crate::error::EngineError;

pub const ENV_REFERENCE_DATE: &str = "BUREAU_REFERENCE_DATE";
pub const ENV_DPD_THRESHOLD: &str = "BUREAU_DPD_THRESHOLD";
pub const ENV_ON_US_SECTORS: &str = "BUREAU_ON_US_SECTORS";
pub const ENV_DEFECT_POLICY: &str = "BUREAU_DEFECT_POLICY";

/// What to do when validation finds a broken construction-time invariant
/// (e.g. a negative total after normalization already clamped amounts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefectPolicy {
    /// Log at error level and fail the request with `InvariantDefect`.
    #[default]
    Escalate,
    /// Log at error level but still return the (degraded) report.
    Degrade,
}

impl DefectPolicy {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "escalate" => Some(DefectPolicy::Escalate),
            "degrade" => Some(DefectPolicy::Degrade),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// "Today" for vintage and months-since-payment. Explicit so that runs are
    /// reproducible.
    pub reference_date: NaiveDate,

    /// A DPD strictly above this marks the category delinquent.
    #[serde(default)]
    pub dpd_threshold: u32,

    /// Categories treated as secured unless a record says otherwise.
    #[serde(default = "default_secured_categories")]
    pub secured_categories: BTreeSet<LoanCategory>,

    /// Lender sectors that count as on-us when a record has no explicit flag.
    #[serde(default = "default_on_us_sectors")]
    pub on_us_sectors: Vec<String>,

    #[serde(default)]
    pub defect_policy: DefectPolicy,
}

fn default_secured_categories() -> BTreeSet<LoanCategory> {
    [
        LoanCategory::HomeLoan,
        LoanCategory::AutoLoan,
        LoanCategory::LapLasLad,
        LoanCategory::GoldLoan,
        LoanCategory::TwoWheelerLoan,
    ]
    .into_iter()
    .collect()
}

fn default_on_us_sectors() -> Vec<String> {
    vec!["KOTAK BANK".to_string(), "KOTAK PRIME".to_string()]
}

impl EngineConfig {
    pub fn new(reference_date: NaiveDate) -> Self {
        Self {
            reference_date,
            dpd_threshold: 0,
            secured_categories: default_secured_categories(),
            on_us_sectors: default_on_us_sectors(),
            defect_policy: DefectPolicy::default(),
        }
    }

    /// Build from the environment (`.env` is loaded if present).
    ///
    /// Without `BUREAU_REFERENCE_DATE` the local calendar date is used.
    pub fn from_env() -> Result<Self, EngineError> {
        dotenvy::dotenv().ok();
        Self::new(Local::now().date_naive()).with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup (the environment in production).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_REFERENCE_DATE) {
            self.reference_date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
                EngineError::InvalidConfig(format!("{ENV_REFERENCE_DATE}='{raw}' is not YYYY-MM-DD: {e}"))
            })?;
        }
        if let Some(raw) = lookup(ENV_DPD_THRESHOLD) {
            self.dpd_threshold = raw.trim().parse().map_err(|e| {
                EngineError::InvalidConfig(format!("{ENV_DPD_THRESHOLD}='{raw}' is not a day count: {e}"))
            })?;
        }
        if let Some(raw) = lookup(ENV_ON_US_SECTORS) {
            self.on_us_sectors = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(raw) = lookup(ENV_DEFECT_POLICY) {
            self.defect_policy = DefectPolicy::parse(&raw).ok_or_else(|| {
                EngineError::InvalidConfig(format!(
                    "{ENV_DEFECT_POLICY}='{raw}' (expected `escalate` or `degrade`)"
                ))
            })?;
        }
        Ok(self)
    }

    pub fn is_secured_by_default(&self, category: LoanCategory) -> bool {
        self.secured_categories.contains(&category)
    }

    pub fn is_on_us_sector(&self, sector: &str) -> bool {
        let sector = sector.trim();
        self.on_us_sectors
            .iter()
            .any(|s| s.trim().eq_ignore_ascii_case(sector))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_REFERENCE_DATE, "2025-06-30"),
            (ENV_DPD_THRESHOLD, "30"),
            (ENV_ON_US_SECTORS, "Acme Bank, Acme Finance ,"),
            (ENV_DEFECT_POLICY, "Degrade"),
        ]);
        let config = EngineConfig::new(date(2020, 1, 1))
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.reference_date, date(2025, 6, 30));
        assert_eq!(config.dpd_threshold, 30);
        assert_eq!(config.on_us_sectors, vec!["Acme Bank", "Acme Finance"]);
        assert_eq!(config.defect_policy, DefectPolicy::Degrade);
        assert!(config.is_on_us_sector(" acme bank"));
    }

    #[test]
    fn bad_override_is_rejected() {
        let err = EngineConfig::new(date(2020, 1, 1))
            .with_overrides(|k| (k == ENV_DPD_THRESHOLD).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"reference_date":"2025-01-31"}"#).unwrap();
        assert_eq!(config, EngineConfig::new(date(2025, 1, 31)));
        assert!(config.is_secured_by_default(LoanCategory::GoldLoan));
        assert!(!config.is_secured_by_default(LoanCategory::CreditCard));
    }
}
