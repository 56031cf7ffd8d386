//! Parsing of Nagios plugin performance data.
//!
//! Performance data is a whitespace separated list of
//! `key=value[;warn;crit;min;max]` tokens, for example:
//!
//! ```text
//! /=2400MB;48356;54400;0;60445 /var=1200MB;48356;54400;0;60445
//! ```
//!
//! The same `key=v0;v1;...` grammar is used by the `data_names` hints which
//! give names to value positions per check command, e.g.
//! `check_disk=used;free;;;total`.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::metric::{Labels, MetricLine};

/// Leading numeric run followed by an optional unit suffix, e.g. `2400MB`, `2.3%`.
static UNIT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9.]+)([^0-9.]+)?").expect("unit pattern is valid"));

/// Field name used when no hint exists for a command.
const DEFAULT_FIELD_NAME: &str = "value";

/// Parsed `key -> positional values`, in first-seen key order.
pub type PerfFields = Vec<(String, Vec<String>)>;

/// Splits `key=v0;v1;...` tokens into keys and their positional values.
///
/// Tokens without `=` are ignored. A repeated key replaces the values of its
/// first occurrence.
pub fn split_fields<'a, I>(tokens: I) -> PerfFields
where
    I: IntoIterator<Item = &'a str>,
{
    let mut fields: PerfFields = Vec::new();

    for token in tokens {
        let Some((key, values)) = token.split_once('=') else {
            debug!("Skipping performance data token without '=': {:?}", token);
            continue;
        };

        let values: Vec<String> = values.split(';').map(str::to_string).collect();
        match fields.iter_mut().find(|(existing, _)| existing.as_str() == key) {
            Some((_, slot)) => *slot = values,
            None => fields.push((key.to_string(), values)),
        }
    }

    fields
}

/// Returns the `(value, unit)` split of a raw performance value.
///
/// When the value does not start with a number the whole string is the
/// value and the unit is empty (`v0.3.4` stays `v0.3.4`).
pub fn extract_value_and_unit(raw: &str) -> (&str, &str) {
    match UNIT_REGEX.captures(raw) {
        Some(caps) => {
            let value = caps.get(1).map_or(raw, |m| m.as_str());
            let unit = caps.get(2).map_or("", |m| m.as_str());
            (value, unit)
        }
        None => (raw, ""),
    }
}

/// Scale factor converting `unit` to its base unit (bytes, seconds, ratio).
pub fn unit_scale(unit: &str) -> Option<f64> {
    match unit {
        "GB" => Some(1024.0 * 1024.0 * 1024.0),
        "MB" => Some(1024.0 * 1024.0),
        "KB" => Some(1024.0),
        "ms" => Some(0.001),
        "usec" => Some(0.000001),
        "%" => Some(0.01),
        _ => None,
    }
}

/// Converts `value` expressed in `unit` to the base unit.
///
/// Unknown units leave the value untouched. A value that is not a number
/// despite a known unit is returned with its unit appended, so nothing is
/// lost.
pub fn convert_to_base_unit(value: &str, unit: &str) -> String {
    if unit.is_empty() {
        return value.to_string();
    }

    let Some(scale) = unit_scale(unit) else {
        debug!("Unknown performance data unit {:?}, keeping {:?}", unit, value);
        return value.to_string();
    };

    match value.parse::<f64>() {
        Ok(number) => super::metric::format_float(number * scale),
        Err(_) => format!("{}{}", value, unit),
    }
}

/// Field names per canonical check command, from the `data_names` hints.
///
/// Built once from configuration and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldNames {
    names: HashMap<String, Vec<String>>,
}

impl FieldNames {
    pub fn from_hints<S: AsRef<str>>(hints: &[S]) -> Self {
        let names = split_fields(hints.iter().map(|hint| hint.as_ref()))
            .into_iter()
            .collect();
        Self { names }
    }

    /// Names for each value position of `command`; `["value"]` by default.
    pub fn for_command(&self, command: &str) -> Vec<&str> {
        match self.names.get(command) {
            Some(names) => names.iter().map(String::as_str).collect(),
            None => vec![DEFAULT_FIELD_NAME],
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Builds `<command>_perf_data_<field>` metrics from raw performance data.
///
/// Every key becomes a `key` label in front of `labels`. The unit is read
/// from the first value of a key only, since plugins annotate it once. An
/// empty field name skips its position, so `used;free;;;total` exports
/// positions 0, 1 and 4.
pub fn build_perf_metrics(
    command: &str,
    labels: &[(String, String)],
    raw_perf_data: &str,
    field_names: &FieldNames,
) -> Vec<MetricLine> {
    let names = field_names.for_command(command);
    let mut metrics = Vec::new();

    for (key, raw_values) in split_fields(raw_perf_data.split_whitespace()) {
        let mut metric_labels: Labels = Vec::with_capacity(labels.len() + 1);
        metric_labels.push(("key".to_string(), key.clone()));
        metric_labels.extend(labels.iter().cloned());

        let (_, unit) = raw_values
            .first()
            .map(|first| extract_value_and_unit(first))
            .unwrap_or_default();

        for (position, field_name) in names.iter().enumerate() {
            if field_name.is_empty() {
                continue;
            }

            let Some(raw) = raw_values.get(position) else {
                debug!(
                    "No value at position {} for {} key {:?}",
                    position, command, key
                );
                continue;
            };

            let (value, _) = extract_value_and_unit(raw);
            metrics.push(MetricLine::new(
                format!("{}_perf_data_{}", command, field_name),
                metric_labels.clone(),
                convert_to_base_unit(value, unit),
            ));
        }
    }

    metrics
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    fn base_labels() -> Labels {
        vec![
            ("hostname".to_string(), "localhost".to_string()),
            ("service".to_string(), "Disk Space".to_string()),
        ]
    }

    #[test]
    fn test_split_fields_perf_data() {
        let fields = split_fields(["/=2400MB;48356;54400;0;60445"]);
        assert_eq!(
            fields,
            vec![(
                "/".to_string(),
                vec!["2400MB", "48356", "54400", "0", "60445"]
                    .into_iter()
                    .map(String::from)
                    .collect::<Vec<String>>()
            )]
        );
    }

    #[test]
    fn test_split_fields_keeps_order_and_replaces_duplicates() {
        let fields = split_fields("b=1 a=2 b=3 junk".split_whitespace());
        let keys: Vec<_> = fields.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(fields[0].1, vec!["3".to_string()]);
    }

    #[test]
    fn test_extract_value_and_unit() {
        assert_eq!(extract_value_and_unit("2400MB"), ("2400", "MB"));
        assert_eq!(extract_value_and_unit("30%"), ("30", "%"));
        assert_eq!(extract_value_and_unit("3.4"), ("3.4", ""));
        assert_eq!(extract_value_and_unit("v0.3.4"), ("v0.3.4", ""));
        assert_eq!(extract_value_and_unit("0.011084s"), ("0.011084", "s"));
        assert_eq!(extract_value_and_unit(""), ("", ""));
    }

    #[test]
    fn test_convert_to_base_unit_known_units() {
        assert_eq!(convert_to_base_unit("2400", "KB"), "2457600.0");
        assert_eq!(convert_to_base_unit("2400", "MB"), "2516582400.0");
        assert_eq!(convert_to_base_unit("2", "GB"), "2147483648.0");
        assert_eq!(convert_to_base_unit("250", "ms"), "0.25");
        assert_eq!(convert_to_base_unit("100", "%"), "1.0");
    }

    #[test]
    #[traced_test]
    fn test_convert_to_base_unit_unknown_unit() {
        assert_eq!(convert_to_base_unit("2400", "hz"), "2400");
        assert!(logs_contain("Unknown performance data unit"));
    }

    #[test]
    fn test_convert_to_base_unit_without_unit() {
        assert_eq!(convert_to_base_unit("0.560", ""), "0.560");
    }

    #[test]
    fn test_convert_to_base_unit_keeps_unparseable_value() {
        assert_eq!(convert_to_base_unit("1.2.3", "MB"), "1.2.3MB");
    }

    #[test]
    fn test_field_names_default_to_value() {
        let names = FieldNames::from_hints(&["check_disk=used;free;;;total"]);
        assert_eq!(
            names.for_command("check_disk"),
            vec!["used", "free", "", "", "total"]
        );
        assert_eq!(names.for_command("check_load"), vec!["value"]);
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_build_perf_metrics_with_field_names() {
        let names = FieldNames::from_hints(&["check_disk=used;free;;;total"]);
        let metrics = build_perf_metrics(
            "check_disk",
            &base_labels(),
            "/=2400MB;48356;54400;0;60445",
            &names,
        );

        let rendered: Vec<String> = metrics.iter().map(MetricLine::render).collect();
        assert_eq!(
            rendered,
            vec![
                r#"nagios_check_disk_perf_data_used{key="/", hostname="localhost", service="Disk Space"} 2516582400.0"#,
                r#"nagios_check_disk_perf_data_free{key="/", hostname="localhost", service="Disk Space"} 50704941056.0"#,
                r#"nagios_check_disk_perf_data_total{key="/", hostname="localhost", service="Disk Space"} 63381176320.0"#,
            ]
        );
    }

    #[test]
    fn test_build_perf_metrics_default_field() {
        let metrics = build_perf_metrics(
            "check_load",
            &base_labels(),
            "load1=0.560;5.000;10.000;0; load5=0.470;4.000;6.000;0;",
            &FieldNames::default(),
        );

        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].name, "check_load_perf_data_value");
        assert_eq!(metrics[0].labels[0], ("key".to_string(), "load1".to_string()));
        assert_eq!(metrics[0].value, "0.560");
        assert_eq!(metrics[1].value, "0.470");
    }

    #[test]
    fn test_build_perf_metrics_skips_missing_positions() {
        let names = FieldNames::from_hints(&["check_users=current;warn;crit;min;max"]);
        let metrics = build_perf_metrics("check_users", &[], "users=3;20", &names);

        let values: Vec<(&str, &str)> = metrics
            .iter()
            .map(|m| (m.name.as_str(), m.value.as_str()))
            .collect();
        assert_eq!(
            values,
            vec![
                ("check_users_perf_data_current", "3"),
                ("check_users_perf_data_warn", "20"),
            ]
        );
    }

    #[test]
    fn test_build_perf_metrics_does_not_share_labels_between_keys() {
        let metrics = build_perf_metrics(
            "check_disk",
            &base_labels(),
            "/=1MB /var=2MB",
            &FieldNames::default(),
        );

        assert_eq!(metrics[0].labels[0].1, "/");
        assert_eq!(metrics[1].labels[0].1, "/var");
        assert_eq!(metrics[1].labels.len(), 3);
    }
}
