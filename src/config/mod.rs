//! Application configuration loading, validation, and management.
//!
//! The top-level `Config` aggregates logging, livestatus collection and HTTP
//! server settings. It is read from a TOML file when one is found, falls back
//! to built-in defaults otherwise, and is immutable once the process starts
//! serving.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use validator::Validate;

pub mod exporter;
pub mod logger;
pub mod server;

use self::{exporter::ExporterConfig, logger::LoggerConfig, server::ServerConfig};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "NAGIOS_EXPORTER_CONFIG";

/// Configuration file used when nothing else is specified.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/nagios-exporter/config.toml";

/// Writes a timestamped line to stderr before the tracing subscriber exists.
#[doc(hidden)]
pub fn early_print(level: &str, args: fmt::Arguments<'_>) {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    let level = match level {
        "ERROR" => console::style(level).red(),
        "WARN" => console::style(level).yellow(),
        _ => console::style(level).green(),
    };
    eprintln!("{}  {} {}", console::style(timestamp).dim(), level, args);
}

/// Simple macros for printing timestamped messages before the tracing subscriber
/// is initialized. These are used during early configuration loading.
#[macro_export]
macro_rules! print_info {
    ($($arg:tt)*) => {
        $crate::config::early_print("INFO", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! print_warn {
    ($($arg:tt)*) => {
        $crate::config::early_print("WARN", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        $crate::config::early_print("ERROR", format_args!($($arg)*))
    };
}

/// Errors that can occur during configuration loading, parsing or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Generic configuration-related error with a descriptive message.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error while accessing configuration files.
    #[error("IO error while reading configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// Failure to parse the TOML configuration file.
    #[error("Parse error while reading configuration: {0}")]
    ParseError(String),

    /// Validation failure after successful parsing.
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Top-level application configuration.
#[derive(Serialize, Deserialize, Debug, Validate, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Logging subsystem configuration.
    #[validate(nested)]
    pub logger: LoggerConfig,

    /// Livestatus collection configuration.
    #[validate(nested)]
    pub exporter: ExporterConfig,

    /// HTTP endpoint configuration.
    #[validate(nested)]
    pub server: ServerConfig,
}

impl Config {
    /// Locates and loads the configuration.
    ///
    /// Priority:
    /// 1. `explicit` path (the `--config` flag)
    /// 2. `NAGIOS_EXPORTER_CONFIG` environment variable
    /// 3. `/etc/nagios-exporter/config.toml` if it exists
    /// 4. built-in defaults
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a selected file cannot be read, parsed, or
    /// validated.
    pub fn new(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match Self::get_config_path(explicit) {
            Some(path) => Self::load(&path),
            None => {
                print_info!("No configuration file found, using defaults");
                Ok(Config::default())
            }
        }
    }

    fn get_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(config_path);
            print_info!("Using config from {}: {}", CONFIG_ENV, path.display());
            return Some(path);
        }

        let fallback = Path::new(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            print_info!("Using default config path: {}", fallback.display());
            return Some(fallback.to_path_buf());
        }

        None
    }

    /// Loads and validates configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Propagates IO, parsing, and validation errors as `ConfigError`.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        print_info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::Config(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }

        let config_str = fs::read_to_string(path)?;
        let config = Self::parse(&config_str)?;

        print_info!("Successfully loaded config from: {}", path.display());
        Ok(config)
    }

    /// Parses and validates a TOML document.
    pub fn parse(text: &str) -> Result<Config, ConfigError> {
        let config: Config =
            toml::from_str(text).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    /// Runs validation, mapping failures into `ConfigError`.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
