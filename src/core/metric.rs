//! Prometheus text rendering of metric lines.
//!
//! Every line is `nagios_<name>{<labels>} <value>`. Names have `-` replaced
//! by `_`; label values are written verbatim.

use std::fmt;

use serde_json::{Number, Value};

/// Prefix shared by every exported metric.
pub const METRIC_PREFIX: &str = "nagios_";

/// Ordered label pairs. Order is preserved in the rendered line.
pub type Labels = Vec<(String, String)>;

/// A single exported sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricLine {
    pub name: String,
    pub labels: Labels,
    pub value: String,
}

impl MetricLine {
    pub fn new(name: impl Into<String>, labels: Labels, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels,
            value: value.into(),
        }
    }

    pub fn render(&self) -> String {
        format_metric(&self.name, &self.labels, &self.value)
    }
}

impl fmt::Display for MetricLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Formats labels as `{k1="v1", k2="v2"}`, or nothing when empty.
pub fn format_labels(labels: &[(String, String)]) -> String {
    if labels.is_empty() {
        return String::new();
    }

    let fields: Vec<String> = labels
        .iter()
        .map(|(key, value)| format!("{}=\"{}\"", key, value))
        .collect();

    format!("{{{}}}", fields.join(", "))
}

pub fn format_metric(name: &str, labels: &[(String, String)], value: &str) -> String {
    format!(
        "{}{}{} {}",
        METRIC_PREFIX,
        name.replace('-', "_"),
        format_labels(labels),
        value
    )
}

/// Renders a float the way Nagios tooling prints it: shortest round-trip
/// digits, always with a fractional part (`2457600.0`), switching to
/// exponent notation below `1e-4` and from `1e16` (`5e-06`, `1e+16`).
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return (if value > 0.0 { "inf" } else { "-inf" }).to_string();
    }
    if value == 0.0 {
        return (if value.is_sign_negative() { "-0.0" } else { "0.0" }).to_string();
    }

    // `{:e}` yields the shortest round-trip digits, e.g. "-2.5165824e9".
    let scientific = format!("{:e}", value.abs());
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let sign = if value < 0.0 { "-" } else { "" };

    if !(-4..16).contains(&exponent) {
        let mantissa = if digits.len() > 1 {
            format!("{}.{}", &digits[..1], &digits[1..])
        } else {
            digits
        };
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}{}e{}{:02}", sign, mantissa, exp_sign, exponent.abs());
    }

    if exponent < 0 {
        let zeros = "0".repeat((-exponent - 1) as usize);
        return format!("{}0.{}{}", sign, zeros, digits);
    }

    let int_len = exponent as usize + 1;
    if digits.len() <= int_len {
        format!("{}{}{}.0", sign, digits, "0".repeat(int_len - digits.len()))
    } else {
        format!("{}{}.{}", sign, &digits[..int_len], &digits[int_len..])
    }
}

/// Renders a JSON number keeping integers as integers.
pub fn format_number(number: &Number) -> String {
    if let Some(value) = number.as_i64() {
        value.to_string()
    } else if let Some(value) = number.as_u64() {
        value.to_string()
    } else {
        format_float(number.as_f64().unwrap_or(f64::NAN))
    }
}

/// Renders a livestatus scalar as a sample value.
///
/// Strings pass through untouched, booleans become `1`/`0` and `null`
/// becomes `NaN`. Nested values are written as compact JSON.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Number(number) => format_number(number),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => (if *flag { "1" } else { "0" }).to_string(),
        Value::Null => "NaN".to_string(),
        other => other.to_string(),
    }
}
