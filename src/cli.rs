//! Command line flags. Flags override values from the configuration file.

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;

#[derive(Parser, Debug, Default)]
#[command(
    name = "nagios-exporter",
    about = "Exports Nagios service status from livestatus for Prometheus",
    version
)]
pub struct Args {
    /// Path to a TOML configuration file.
    #[arg(long, short = 'c', env = "NAGIOS_EXPORTER_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Absolute path to the livestatus Unix socket.
    #[arg(long, value_name = "SOCKET")]
    pub path: Option<String>,

    /// Port the HTTP server listens on.
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Only export service metrics containing this pattern. Repeatable.
    #[arg(long, value_name = "PATTERN")]
    pub whitelist: Vec<String>,

    /// Export every service metric instead of a whitelist.
    #[arg(long, alias = "all_metrics")]
    pub all_metrics: bool,

    /// Write the metrics to stdout once and exit.
    #[arg(long, alias = "dump_metrics")]
    pub dump_metrics: bool,

    /// Generate metrics from performance data.
    #[arg(long, alias = "perf_data")]
    pub perf_data: bool,

    /// Name performance data positions, e.g. `check_disk=used;free;;;total`.
    /// Repeatable.
    #[arg(long, alias = "data_names", value_name = "COMMAND=NAME0[;NAME1]...")]
    pub data_names: Vec<String>,
}

impl Args {
    /// Applies the flags on top of `config`.
    ///
    /// A metrics dump without a whitelist lists every service metric.
    pub fn apply(&self, config: &mut Config) {
        let exporter = &mut config.exporter;

        if let Some(path) = &self.path {
            exporter.socket_path = path.clone();
        }
        if !self.whitelist.is_empty() {
            exporter.whitelist = self.whitelist.clone();
        }
        if self.all_metrics {
            exporter.all_metrics = true;
        }
        if self.perf_data {
            exporter.perf_data = true;
        }
        if !self.data_names.is_empty() {
            exporter.data_names = self.data_names.clone();
        }
        if self.dump_metrics && exporter.whitelist.is_empty() {
            exporter.all_metrics = true;
        }

        if let Some(port) = self.port {
            config.server.set_port(port);
        }
    }
}
