use std::net::SocketAddr;

use anyhow::Context;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{HttpLoggingConfig, HttpLoggingLayer};

#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
    pub logging_config: HttpLoggingConfig,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9090,
            logging_config: HttpLoggingConfig::default(),
        }
    }
}

/// Serve `router` until the token is cancelled, then drain in-flight requests
pub async fn run_http_server(
    config: HttpServerConfig,
    router: Router,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid server address {}:{}", config.host, config.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(address = %addr, "HTTP server listening");

    let app = router.layer(HttpLoggingLayer::new(config.logging_config));

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancellation_token.cancelled().await;
            debug!("HTTP server shutdown signal received");
        })
        .await
        .context("HTTP server failed")?;

    debug!("HTTP server stopped");
    Ok(())
}
