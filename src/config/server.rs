use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// HTTP endpoint serving the metrics.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, `host:port`.
    #[validate(custom(function = "validate_listen"))]
    pub listen: String,

    /// Route answering scrapes. Must start with `/`.
    #[validate(custom(function = "validate_metrics_path"))]
    pub metrics_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:5000".to_string(),
            metrics_path: "/metrics".to_string(),
        }
    }
}

impl ServerConfig {
    /// Replaces the port of the listen address, keeping its host.
    pub fn set_port(&mut self, port: u16) {
        let mut addr: SocketAddr = self
            .listen
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], port)));
        addr.set_port(port);
        self.listen = addr.to_string();
    }
}

fn validate_listen(listen: &str) -> Result<(), ValidationError> {
    listen.parse::<SocketAddr>().map(|_| ()).map_err(|_| {
        let mut err = ValidationError::new("invalid_listen_address");
        err.message = Some(format!("Invalid listen address: {}", listen).into());
        err
    })
}

fn validate_metrics_path(path: &str) -> Result<(), ValidationError> {
    if path.starts_with('/') {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_metrics_path");
        err.message = Some(format!("Metrics path must start with '/': {}", path).into());
        Err(err)
    }
}
