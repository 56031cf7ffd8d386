//! Configuration of what the exporter collects from livestatus.
//!
//! These settings define the input contract of the collector: where the
//! socket lives, how long to wait on it, which service metrics to export and
//! how performance data is named.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::core::livestatus::MAX_SOCKET_WAIT;

/// Livestatus collection settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ExporterConfig {
    /// Absolute path to the livestatus Unix socket.
    #[validate(length(min = 1, message = "Livestatus socket path must not be empty"))]
    pub socket_path: String,

    /// Bound (in seconds) on connecting to and reading from the socket.
    #[validate(range(
        min = 1,
        max = 300,
        message = "Socket timeout must be between 1 and 300 seconds"
    ))]
    pub socket_timeout: u64,

    /// Only export service metrics whose line contains one of these
    /// substrings. Takes precedence over `all_metrics`.
    #[validate(custom(function = "validate_whitelist"))]
    pub whitelist: Vec<String>,

    /// Export every service metric when no whitelist is configured.
    pub all_metrics: bool,

    /// Generate metrics from service performance data.
    pub perf_data: bool,

    /// Names for performance data positions, as
    /// `<check_command>=<name0>[;<name1>]...`, e.g. `check_disk=used;free;;;total`.
    #[validate(custom(function = "validate_data_names"))]
    pub data_names: Vec<String>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            socket_path: "/var/lib/nagios3/rw/livestatus".to_string(),
            socket_timeout: MAX_SOCKET_WAIT.as_secs(),
            whitelist: Vec::new(),
            all_metrics: false,
            perf_data: false,
            data_names: Vec::new(),
        }
    }
}

fn validate_whitelist(patterns: &[String]) -> Result<(), ValidationError> {
    if patterns.iter().any(|p| p.is_empty()) {
        let mut err = ValidationError::new("empty_whitelist_pattern");
        err.message = Some("Whitelist patterns must not be empty".into());
        return Err(err);
    }
    Ok(())
}

fn validate_data_names(names: &[String]) -> Result<(), ValidationError> {
    match names.iter().find(|hint| !hint.contains('=')) {
        Some(hint) => {
            let mut err = ValidationError::new("invalid_data_names");
            err.message = Some(
                format!(
                    "Invalid data names {:?}, expected <check_command>=<name0>[;<name1>]...",
                    hint
                )
                .into(),
            );
            Err(err)
        }
        None => Ok(()),
    }
}
