//! Collection cycle: livestatus socket in, metric lines out.
//!
//! One `collect` call opens at most two fresh connections (status, then
//! services), turns the answers into metric lines and closes with the
//! `nagios_exporter_success` sentinel. Livestatus failures never escape the
//! cycle; they end it early and flip the sentinel to `0`.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use tracing::{debug, error, info, instrument};

use super::{
    command::canonical_command,
    livestatus::{self, LivestatusResult, Rows, ServiceRecord, Session, StatusSnapshot},
    metric::{format_metric, format_number, format_value, Labels, MetricLine},
    perfdata::{build_perf_metrics, FieldNames},
};
use crate::config::exporter::ExporterConfig;

const STATUS_QUERY: &str = "GET status";

/// Which service-derived lines end up in the output.
///
/// Status and sentinel lines are never subject to selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// No service metrics; the services table is not queried.
    None,
    /// Lines containing at least one of the patterns as a literal substring.
    Whitelist(Vec<String>),
    /// Every service line.
    All,
}

impl SelectionPolicy {
    /// A non-empty whitelist wins over `all_metrics`.
    pub fn from_config(config: &ExporterConfig) -> Self {
        let mut patterns: Vec<String> = Vec::with_capacity(config.whitelist.len());
        for pattern in &config.whitelist {
            if !patterns.contains(pattern) {
                patterns.push(pattern.clone());
            }
        }

        if !patterns.is_empty() {
            SelectionPolicy::Whitelist(patterns)
        } else if config.all_metrics {
            SelectionPolicy::All
        } else {
            SelectionPolicy::None
        }
    }

    pub fn wants_services(&self) -> bool {
        !matches!(self, SelectionPolicy::None)
    }

    /// Filters service lines, keeping their order. Each line is kept at most
    /// once regardless of how many patterns it matches.
    pub fn select(&self, lines: Vec<String>) -> Vec<String> {
        match self {
            SelectionPolicy::None => Vec::new(),
            SelectionPolicy::All => lines,
            SelectionPolicy::Whitelist(patterns) => lines
                .into_iter()
                .filter(|line| patterns.iter().any(|p| line.contains(p.as_str())))
                .collect(),
        }
    }
}

/// Read-only inputs of a collection cycle.
#[derive(Debug, Clone)]
pub struct CollectionSettings {
    pub socket_path: PathBuf,
    pub socket_timeout: Duration,
    pub selection: SelectionPolicy,
    pub perf_data: bool,
    pub field_names: FieldNames,
}

impl From<&ExporterConfig> for CollectionSettings {
    fn from(config: &ExporterConfig) -> Self {
        Self {
            socket_path: PathBuf::from(&config.socket_path),
            socket_timeout: Duration::from_secs(config.socket_timeout),
            selection: SelectionPolicy::from_config(config),
            perf_data: config.perf_data,
            field_names: FieldNames::from_hints(&config.data_names),
        }
    }
}

/// Runs collection cycles against one livestatus socket.
///
/// Cheap to clone; concurrent cycles share only the read-only settings.
#[derive(Debug, Clone)]
pub struct Collector {
    settings: Arc<CollectionSettings>,
}

impl Collector {
    pub fn new(settings: CollectionSettings) -> Self {
        info!(
            "Collector ready: socket={} selection={:?} perf_data={} field_names={}",
            settings.socket_path.display(),
            settings.selection,
            settings.perf_data,
            settings.field_names.len()
        );
        Self {
            settings: Arc::new(settings),
        }
    }

    pub fn from_config(config: &ExporterConfig) -> Self {
        Self::new(CollectionSettings::from(config))
    }

    pub fn settings(&self) -> &CollectionSettings {
        &self.settings
    }

    /// Runs one collection cycle and returns the metric lines, without
    /// trailing newlines. The last line is always `nagios_exporter_success`.
    #[instrument(skip(self), fields(socket = %self.settings.socket_path.display()))]
    pub async fn collect(&self) -> Vec<String> {
        let mut lines = Vec::new();

        let succeeded = match self.collect_into(&mut lines).await {
            Ok(()) => true,
            Err(e) => {
                error!("Livestatus collection failed ({}): {}", e.kind(), e);
                false
            }
        };

        lines.push(format_metric(
            "exporter_success",
            &[],
            if succeeded { "1" } else { "0" },
        ));
        debug!("Collected {} lines", lines.len());
        lines
    }

    /// Runs one collection cycle and returns the response body.
    pub async fn render(&self) -> String {
        let mut body = self.collect().await.join("\n");
        body.push('\n');
        body
    }

    async fn collect_into(&self, lines: &mut Vec<String>) -> LivestatusResult<()> {
        let path = self.settings.socket_path.as_path();

        if !socket_exists(path).await {
            error!("Livestatus socket does not exist: {}", path.display());
            lines.push(format!("# livestatus socket does not exist! {}", path.display()));
            lines.push(format_metric("livestatus_available", &[], "0"));
            return Ok(());
        }
        lines.push(format_metric("livestatus_available", &[], "1"));

        let status = StatusSnapshot::from_rows(self.query(STATUS_QUERY).await?)?;
        lines.extend(
            status
                .iter()
                .map(|(name, value)| format_metric(name, &[], &format_value(value))),
        );

        if !self.settings.selection.wants_services() {
            return Ok(());
        }

        let query = format!(
            "GET services\nColumns: {}",
            livestatus::SERVICE_COLUMNS.join(" ")
        );
        let records = self
            .query(&query)
            .await?
            .into_iter()
            .map(ServiceRecord::from_row)
            .collect::<LivestatusResult<Vec<_>>>()?;
        debug!("Received {} service records", records.len());

        let service_lines: Vec<String> = records
            .iter()
            .flat_map(|record| self.service_metrics(record))
            .map(|metric| metric.render())
            .collect();
        lines.extend(self.settings.selection.select(service_lines));

        Ok(())
    }

    async fn query(&self, query: &str) -> LivestatusResult<Rows> {
        let wait = self.settings.socket_timeout;
        let stream = livestatus::connect(&self.settings.socket_path, wait).await?;
        Session::new(stream, wait).query(query).await
    }

    fn service_metrics(&self, record: &ServiceRecord) -> Vec<MetricLine> {
        let command = canonical_command(&record.check_command);
        let labels: Labels = vec![
            ("hostname".to_string(), record.host_name.clone()),
            ("service".to_string(), record.service_description.clone()),
        ];

        let mut metrics: Vec<MetricLine> = [
            ("exec_time", &record.execution_time),
            ("latency", &record.latency),
            ("state", &record.state),
            ("flapping", &record.is_flapping),
            ("acknowledged", &record.acknowledged),
        ]
        .into_iter()
        .map(|(suffix, value)| {
            MetricLine::new(
                format!("{}_{}", command, suffix),
                labels.clone(),
                format_number(value),
            )
        })
        .collect();

        if self.settings.perf_data && !record.perf_data.trim().is_empty() {
            metrics.extend(build_perf_metrics(
                command,
                &labels,
                &record.perf_data,
                &self.settings.field_names,
            ));
        }

        metrics
    }
}

async fn socket_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Runs one collection cycle for `config` and returns the response body.
pub async fn render(config: &ExporterConfig) -> String {
    Collector::from_config(config).render().await
}
