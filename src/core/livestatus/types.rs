use serde::Deserialize;
use serde_json::{Number, Value};

use super::error::{LivestatusError, LivestatusResult};

/// Columns requested from the `services` table, in row order.
///
/// Names follow the Nagios configuration names; a few are defined by the
/// livestatus module itself.
pub const SERVICE_COLUMNS: [&str; 10] = [
    "host_name",
    "service_description",
    "state",
    "latency",
    "perf_data",
    "process_performance_data",
    "check_command",
    "acknowledged",
    "execution_time",
    "is_flapping",
];

/// One row of the `services` table.
///
/// Numeric columns keep the JSON number as livestatus sent it, so an integer
/// `0` renders as `0` and a float `0.078` as `0.078`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceRecord {
    pub host_name: String,
    pub service_description: String,
    pub state: Number,
    pub latency: Number,
    pub perf_data: String,
    pub process_performance_data: Number,
    pub check_command: String,
    pub acknowledged: Number,
    pub execution_time: Number,
    pub is_flapping: Number,
}

impl ServiceRecord {
    /// Binds a positional row (ordered as [`SERVICE_COLUMNS`]) to named fields.
    pub fn from_row(row: Vec<Value>) -> LivestatusResult<Self> {
        if row.len() != SERVICE_COLUMNS.len() {
            return Err(LivestatusError::Malformed(format!(
                "service row has {} columns, expected {}",
                row.len(),
                SERVICE_COLUMNS.len()
            )));
        }

        serde_json::from_value(Value::Array(row))
            .map_err(|e| LivestatusError::Malformed(format!("invalid service row: {}", e)))
    }
}

/// Global counters from the `status` table, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
    fields: Vec<(String, Value)>,
}

impl StatusSnapshot {
    /// Builds the snapshot from the two-row `[names][values]` response.
    pub fn from_rows(rows: Vec<Vec<Value>>) -> LivestatusResult<Self> {
        let mut rows = rows.into_iter();
        let (Some(names), Some(values)) = (rows.next(), rows.next()) else {
            return Err(LivestatusError::Malformed(
                "status response needs a header row and a value row".into(),
            ));
        };

        if names.len() != values.len() {
            return Err(LivestatusError::Malformed(format!(
                "status response has {} names but {} values",
                names.len(),
                values.len()
            )));
        }

        let fields = names
            .into_iter()
            .zip(values)
            .map(|(name, value)| match name {
                Value::String(name) => Ok((name, value)),
                other => Err(LivestatusError::Malformed(format!(
                    "status column name is not a string: {}",
                    other
                ))),
            })
            .collect::<LivestatusResult<Vec<_>>>()?;

        Ok(StatusSnapshot { fields })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
