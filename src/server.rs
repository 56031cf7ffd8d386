//! HTTP endpoint answering Prometheus scrapes.
//!
//! Every scrape runs its own collection cycle. The response is always
//! `200 OK`; livestatus problems show up in the sentinel metrics instead.

use std::{future::Future, io, net::SocketAddr};

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::{config::server::ServerConfig, core::Collector};

const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid listen address {0}: {1}")]
    InvalidAddress(String, std::net::AddrParseError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("HTTP server error: {0}")]
    Serve(#[from] io::Error),
}

/// Builds the router: the metrics route plus an index page.
pub fn router(collector: Collector, metrics_path: &str) -> Router {
    let index = format!(
        "Nagios livestatus exporter\nMetrics are served at {}\n",
        metrics_path
    );

    let mut app = Router::new().route(metrics_path, get(handle_metrics));
    if metrics_path != "/" {
        app = app.route(
            "/",
            get(move || {
                let index = index.clone();
                async move { ([(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], index) }
            }),
        );
    }
    app.with_state(collector)
}

async fn handle_metrics(State(collector): State<Collector>) -> impl IntoResponse {
    debug!("Scrape received");
    let body = collector.render().await;
    ([(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], body)
}

/// Serves scrapes on `config.listen` until `shutdown` resolves.
///
/// # Errors
///
/// Returns `ServerError` if the address is invalid, cannot be bound, or the
/// server fails while running.
pub async fn serve<F>(config: &ServerConfig, collector: Collector, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = config
        .listen
        .parse()
        .map_err(|e| ServerError::InvalidAddress(config.listen.clone(), e))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    info!(
        "Serving metrics on http://{}{}",
        listener.local_addr().unwrap_or(addr),
        config.metrics_path
    );

    axum::serve(listener, router(collector, &config.metrics_path))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::config::exporter::ExporterConfig;

    fn missing_socket_collector(dir: &tempfile::TempDir) -> Collector {
        Collector::from_config(&ExporterConfig {
            socket_path: dir.path().join("absent").display().to_string(),
            ..Default::default()
        })
    }

    async fn get_path(app: Router, uri: &str) -> (StatusCode, String, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_metrics_route_is_ok_without_livestatus() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(missing_socket_collector(&dir), "/metrics");

        let (status, content_type, body) = get_path(app, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, TEXT_CONTENT_TYPE);
        assert!(body.contains("nagios_livestatus_available 0\n"));
        assert!(body.ends_with("nagios_exporter_success 1\n"));
    }

    #[tokio::test]
    async fn test_custom_metrics_path() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(missing_socket_collector(&dir), "/nagios");

        let (status, _, _) = get_path(app.clone(), "/nagios").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) = get_path(app, "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_index_points_to_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(missing_socket_collector(&dir), "/metrics");

        let (status, _, body) = get_path(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/metrics"));
    }

    #[tokio::test]
    async fn test_serve_rejects_bad_address() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            listen: "nowhere".into(),
            ..Default::default()
        };

        let result = serve(&config, missing_socket_collector(&dir), async {}).await;
        assert!(matches!(result, Err(ServerError::InvalidAddress(..))));
    }
}
