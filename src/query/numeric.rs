//! Numeric extraction from free-text measurement strings such as "98 mg/dL".

use serde_json::Value;

/// Parse the text before the first space as a float.
///
/// Mirrors a SQL `SPLIT_PART(v, ' ', 1)` cast: a leading space yields an empty
/// token and therefore `None`.
pub fn numeric_prefix(text: &str) -> Option<f64> {
    text.split(' ').next().and_then(parse_finite)
}

/// Parse the first whitespace-delimited token as a float.
pub fn leading_number(text: &str) -> Option<f64> {
    text.split_whitespace().next().and_then(parse_finite)
}

/// Numeric reading of a payload value: numbers as-is, strings by leading token.
pub fn value_as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => leading_number(s),
        _ => None,
    }
}

fn parse_finite(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}
