//! Logging initialization.
//!
//! The `LoggerManager` validates the logging configuration and installs the
//! global `tracing` subscriber with a console layer and an optional systemd
//! journald layer. Console output goes to stderr, so a one-shot metrics dump
//! on stdout is never interleaved with log lines.

use std::io;

use thiserror::Error;
use tracing::instrument;
use tracing_subscriber::{fmt, fmt::format::FmtSpan, prelude::*, EnvFilter, Layer, Registry};
use validator::{Validate, ValidationErrors};

use crate::{
    config::logger::{ConsoleConfig, JournaldConfig, LogFormat, LoggerConfig},
    print_info, print_warn,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Errors that can occur during logger configuration or initialization.
#[derive(Error, Debug)]
pub enum LoggerError {
    /// Validation errors from the logger configuration struct.
    #[error("Logger configuration validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    /// IO error, typically while opening the journald socket.
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// A global subscriber is already installed.
    #[error("Logger initialization error: {0}")]
    InitializationError(String),

    /// No output layers were successfully configured.
    #[error("No logging layers were configured or successfully initialized")]
    NoLayersConfigured,

    /// Journald was requested but could not be reached while console output
    /// is also on.
    #[error(
        "Failed to initialize journald logger while console logging is enabled. Please check your configuration."
    )]
    JournaldFailedWithConsoleEnabled,
}

/// Manages logging configuration and global subscriber initialization.
pub struct LoggerManager {
    config: LoggerConfig,
}

impl LoggerManager {
    /// Creates a new `LoggerManager` and validates the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns `LoggerError::ValidationError` if configuration validation fails.
    pub fn new(config: LoggerConfig) -> Result<Self, LoggerError> {
        config.validate()?;

        Ok(LoggerManager { config })
    }

    /// Builds the configured layers without installing them.
    ///
    /// # Errors
    ///
    /// Returns `NoLayersConfigured` when every output is disabled, and
    /// `JournaldFailedWithConsoleEnabled` when journald cannot be opened.
    pub fn layers(&self) -> Result<Vec<BoxedLayer>, LoggerError> {
        let mut layers = Vec::new();

        if let Some(console) = self.config.console.as_ref().filter(|c| c.enabled) {
            layers.push(console_layer(console, self.filter()));
        }

        if let Some(journald) = self.config.journald.as_ref().filter(|j| j.enabled) {
            match journald_layer(journald, self.filter()) {
                Ok(layer) => {
                    layers.push(layer);
                    print_info!(
                        "Systemd journald logger initialized with identifier: {}",
                        journald.identifier
                    );
                }
                Err(e) => {
                    print_warn!("Failed to initialize systemd journald logger: {}", e);
                    if !layers.is_empty() {
                        return Err(LoggerError::JournaldFailedWithConsoleEnabled);
                    }
                }
            }
        }

        if layers.is_empty() {
            print_warn!("No logging layers were initialized. Please check your configuration.");
            return Err(LoggerError::NoLayersConfigured);
        }

        Ok(layers)
    }

    /// Installs the global `tracing` subscriber. Call once at startup.
    ///
    /// # Errors
    ///
    /// Propagates `layers()` errors, and `InitializationError` if another
    /// subscriber was installed first.
    #[instrument(skip(self))]
    pub fn init(&mut self) -> Result<(), LoggerError> {
        let layers = self.layers()?;
        tracing_subscriber::registry()
            .with(layers)
            .try_init()
            .map_err(|e| LoggerError::InitializationError(e.to_string()))
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.config.level))
    }
}

fn console_layer(config: &ConsoleConfig, filter: EnvFilter) -> BoxedLayer {
    let base = fmt::layer()
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_span_events(if config.show_spans {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .with_ansi(config.ansi_colors)
        .with_writer(io::stderr);

    match config.format {
        LogFormat::Json => base.json().with_filter(filter).boxed(),
        LogFormat::Pretty => base.pretty().with_filter(filter).boxed(),
        LogFormat::Compact => base.compact().with_filter(filter).boxed(),
    }
}

fn journald_layer(config: &JournaldConfig, filter: EnvFilter) -> Result<BoxedLayer, LoggerError> {
    let layer = tracing_journald::layer()?.with_syslog_identifier(config.identifier.clone());
    Ok(layer.with_filter(filter).boxed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_level() {
        let config = LoggerConfig {
            level: "chatty".into(),
            ..Default::default()
        };
        assert!(matches!(
            LoggerManager::new(config),
            Err(LoggerError::ValidationError(_))
        ));
    }

    #[test]
    fn test_console_layer_is_built_by_default() {
        let manager = LoggerManager::new(LoggerConfig::default()).unwrap();
        assert_eq!(manager.layers().unwrap().len(), 1);
    }

    #[test]
    fn test_every_format_builds_a_layer() {
        for format in [LogFormat::Compact, LogFormat::Pretty, LogFormat::Json] {
            let config = LoggerConfig {
                console: Some(ConsoleConfig {
                    format,
                    ..Default::default()
                }),
                ..Default::default()
            };
            let manager = LoggerManager::new(config).unwrap();
            assert_eq!(manager.layers().unwrap().len(), 1);
        }
    }

    #[test]
    fn test_no_outputs_is_an_error() {
        let config = LoggerConfig {
            console: Some(ConsoleConfig {
                enabled: false,
                ..Default::default()
            }),
            journald: None,
            ..Default::default()
        };
        let manager = LoggerManager::new(config).unwrap();
        assert!(matches!(
            manager.layers(),
            Err(LoggerError::NoLayersConfigured)
        ));
    }
}
