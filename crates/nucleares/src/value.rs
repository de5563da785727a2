//! Value classification and metric naming.

use crate::types::ParsedValue;

/// Prefix shared by every exported variable gauge
pub const METRIC_PREFIX: &str = "nucleares_";

/// Classify a raw response body.
///
/// Booleans are matched case-insensitively. The first comma is treated as
/// the decimal separator. Non-finite numbers (`inf`, `NaN`) stay strings.
pub fn parse_value(raw: &str) -> ParsedValue {
    let value = raw.trim();

    if value.eq_ignore_ascii_case("true") {
        return ParsedValue::Boolean(true);
    }
    if value.eq_ignore_ascii_case("false") {
        return ParsedValue::Boolean(false);
    }

    let normalised = value.replacen(',', ".", 1);
    match normalised.parse::<f64>() {
        Ok(number) if number.is_finite() => ParsedValue::Number(number),
        _ => ParsedValue::String(value.to_string()),
    }
}

/// Map an arbitrary variable name onto `[a-z0-9_]`.
///
/// Runs of other characters collapse into one underscore; leading and
/// trailing underscores are stripped.
pub fn sanitize_metric_name(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    let mut in_run = false;

    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            sanitized.push(c);
            in_run = false;
        } else if !in_run {
            sanitized.push('_');
            in_run = true;
        }
    }

    sanitized.trim_matches('_').to_string()
}

/// Exported metric name for a raw variable name
pub fn metric_name(name: &str) -> String {
    format!("{}{}", METRIC_PREFIX, sanitize_metric_name(name))
}
