//! nagios-exporter: Nagios service status for Prometheus
//!
//! This crate queries the Nagios livestatus Unix socket and renders the
//! daemon status and per-service check results as Prometheus text metrics.
//! Metrics are served over HTTP on every scrape, or dumped once to stdout.
//!
//! ## Modules
//!
//! * `config`: Configuration structures, loading, validation, and defaults.
//!   Supports TOML configuration files with validation via the `validator` crate.
//!
//! * `core`: Core runtime components:
//!   - Livestatus client (connection, wire codec, typed rows)
//!   - Performance data parsing and unit conversion
//!   - Metric line rendering
//!   - The collection cycle and metric selection
//!
//! * `logger`: Centralized logging initialization using `tracing`.
//!   Supports console output in multiple formats (compact, pretty, JSON)
//!   and optional systemd journald integration.
//!
//! * `server`: `axum` HTTP endpoint answering scrapes.
//!
//! * `cli`: Command line flags layered over the configuration file.

pub mod cli;
pub mod config;
pub mod core;
pub mod logger;
pub mod server;
