//! Display formatting and numeric input coercion shared by every tool.

/// Parses a form field, falling back to `default` when the text is empty,
/// unparsable, not finite, or zero.
pub fn value_or(input: &str, default: f64) -> f64 {
    match input.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v != 0.0 => v,
        _ => default,
    }
}

/// Whole-dollar USD, e.g. `$1,516,960` or `-$42`.
pub fn currency(value: f64) -> String {
    let rounded = value.round();
    if rounded == 0.0 || !rounded.is_finite() {
        return "$0".to_string();
    }
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}${}", group_thousands(rounded.abs() as u64))
}

/// Compact axis label: `$1.2M`, `$18K`, `$950`.
pub fn currency_short(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("${:.1}M", value / 1_000_000.0)
    } else if value >= 1000.0 {
        format!("${:.0}K", value / 1000.0)
    } else {
        format!("${value:.0}")
    }
}

/// `3y 4m`, or `0 months` when nothing was saved.
pub fn months_span(months: usize) -> String {
    if months == 0 {
        "0 months".to_string()
    } else {
        format!("{}y {}m", months / 12, months % 12)
    }
}

pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
