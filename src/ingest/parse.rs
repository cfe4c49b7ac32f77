//! Field coercion for raw tradeline text.
//!
//! Every parser distinguishes three outcomes: the field is absent
//! (`Ok(None)`), parsed (`Ok(Some(_))`), or present but unreadable (`Err`).
//! Callers turn `Err` into an anomaly and treat the field as unknown.

use chrono::NaiveDate;

use crate::domain::ForcedEvent;

/// Tokens that bureau exports use for "no value".
const NULL_TOKENS: [&str; 6] = ["", "null", "na", "n/a", "none", "-"];

/// Largest magnitude accepted for a single amount (INR). Anything above is
/// treated as a corrupt value; it also keeps every portfolio sum finite.
pub const MAX_AMOUNT: f64 = 1e15;

/// Currency markers stripped before parsing amounts.
const CURRENCY_MARKERS: [&str; 4] = ["inr", "rs.", "rs", "₹"];

pub fn is_null(raw: &str) -> bool {
    let s = raw.trim();
    NULL_TOKENS.iter().any(|t| s.eq_ignore_ascii_case(t))
}

/// Trimmed, non-null text or `None`.
pub fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !is_null(s))
}

/// Parse a monetary amount. Sign is preserved; clamping is the caller's job.
pub fn parse_amount(raw: Option<&str>) -> Result<Option<f64>, String> {
    let Some(s) = present(raw) else { return Ok(None) };

    let mut body = s.to_string();
    for marker in CURRENCY_MARKERS {
        let matches = body
            .get(..marker.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(marker));
        if matches {
            body = body[marker.len()..].to_string();
            break;
        }
    }
    let cleaned: String = body.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();

    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() && v.abs() <= MAX_AMOUNT => Ok(Some(v)),
        Ok(v) if v.is_finite() => Err(format!("amount out of range: '{s}'")),
        _ => Err(format!("not a finite amount: '{s}'")),
    }
}

/// Parse a bureau date.
///
/// Exports mix ISO and day-first layouts, so a small fixed set of formats is
/// tried in order; the result is deterministic for any given input.
pub fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, String> {
    let Some(s) = present(raw) else { return Ok(None) };

    const FMTS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%d-%b-%Y"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(Some(d));
        }
    }
    // Timestamps: keep the date part.
    if let Some((date_part, _)) = s.split_once([' ', 'T']) {
        if let Ok(d) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
            return Ok(Some(d));
        }
    }
    Err(format!("unrecognized date: '{s}'"))
}

/// Parse a yes/no style flag.
pub fn parse_flag(raw: Option<&str>) -> Result<Option<bool>, String> {
    let Some(s) = present(raw) else { return Ok(None) };
    match s.to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "t" | "1" => Ok(Some(true)),
        "n" | "no" | "false" | "f" | "0" => Ok(Some(false)),
        _ => Err(format!("not a yes/no flag: '{s}'")),
    }
}

/// Parse a days-past-due count. Fractional values round to the nearest day.
pub fn parse_dpd(raw: Option<&str>) -> Result<Option<u32>, String> {
    let Some(s) = present(raw) else { return Ok(None) };
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v <= u32::MAX as f64 => Ok(Some(v.round() as u32)),
        _ => Err(format!("not a day count: '{s}'")),
    }
}

/// What a DPD-history string tells us.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DpdHistory {
    pub max_dpd: Option<u32>,
    pub events: Vec<ForcedEvent>,
    /// Tokens that were neither numbers nor alphabetic codes.
    pub unreadable: Vec<String>,
}

/// Scan a monthly DPD history.
///
/// Histories arrive either delimited (`"000|030|SMA"`) or as fixed-width
/// 3-character tokens run together (`"000030SMA"`).
pub fn scan_dpd_history(raw: Option<&str>) -> DpdHistory {
    let mut out = DpdHistory::default();
    let Some(s) = present(raw) else { return out };

    let delimited = s.contains(['|', ',', ' ', ';']);
    let tokens: Vec<String> = if delimited {
        s.split(['|', ',', ' ', ';'])
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        let chars: Vec<char> = s.chars().collect();
        chars.chunks(3).map(|c| c.iter().collect()).collect()
    };

    for token in tokens {
        if token.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(v) = token.parse::<u32>() {
                out.max_dpd = Some(out.max_dpd.map_or(v, |m| m.max(v)));
                continue;
            }
        }
        if token.chars().all(|c| c.is_ascii_alphabetic()) {
            if let Some(event) = ForcedEvent::parse(&token) {
                out.events.push(event);
            }
            continue;
        }
        out.unreadable.push(token);
    }
    out
}
