//! Small formatting helpers shared by findings and logging.

/// Format an amount with Indian digit grouping, rounded to whole rupees
/// (`1234567.4` → `"12,34,567"`).
pub fn format_inr(amount: f64) -> String {
    if !amount.is_finite() {
        return "-".to_string();
    }
    let rounded = amount.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let grouped = if digits.len() <= 3 {
        digits
    } else {
        let (head, last3) = digits.split_at(digits.len() - 3);
        let mut parts: Vec<&str> = Vec::new();
        let mut rest = head;
        while rest.len() > 2 {
            let (h, t) = rest.split_at(rest.len() - 2);
            parts.push(t);
            rest = h;
        }
        if !rest.is_empty() {
            parts.push(rest);
        }
        parts.reverse();
        format!("{},{last3}", parts.join(","))
    };

    if negative { format!("-{grouped}") } else { grouped }
}

/// Mask a customer id down to its last four characters (`"###4898"`).
pub fn mask_customer_id(customer_id: &str) -> String {
    let chars: Vec<char> = customer_id.trim().chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("###{tail}")
}

/// Ratio → whole percent for display (`0.734` → `"73%"`).
pub fn format_pct(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}
