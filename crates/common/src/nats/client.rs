use crate::nats::traits::{JetStreamAdmin, StreamCreation, StreamDeletion};
use anyhow::{Context, Result};
use async_nats::jetstream::{
    self,
    context::{CreateStreamErrorKind, DeleteStreamErrorKind},
    ErrorCode,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub struct NatsClient {
    client: async_nats::Client,
    jetstream: jetstream::Context,
}

impl NatsClient {
    pub async fn connect(url: &str, timeout: std::time::Duration) -> Result<Self> {
        info!(url = %url, timeout_ms = timeout.as_millis(), "Connecting to NATS");

        let client = async_nats::ConnectOptions::new()
            .name("service-io")
            .connection_timeout(timeout)
            .connect(url)
            .await
            .context("Failed to connect to NATS")?;

        let jetstream = jetstream::new(client.clone());

        info!("Successfully connected to NATS");
        Ok(Self { client, jetstream })
    }

    /// Create a JetStreamAdmin trait object from this client
    pub fn create_stream_admin(&self) -> Arc<dyn JetStreamAdmin> {
        Arc::new(NatsJetStreamAdmin::new(self.jetstream.clone()))
    }

    /// Flush pending requests; the connection closes when dropped
    pub async fn close(self) {
        info!("Closing NATS connection");
        if let Err(e) = self.client.flush().await {
            debug!(error = %e, "NATS flush failed during close");
        }
    }
}

/// Concrete implementation of JetStreamAdmin using async-nats
pub struct NatsJetStreamAdmin {
    context: jetstream::Context,
}

impl NatsJetStreamAdmin {
    pub fn new(context: jetstream::Context) -> Self {
        Self { context }
    }
}

#[async_trait]
impl JetStreamAdmin for NatsJetStreamAdmin {
    #[instrument(skip(self, config), fields(stream = %config.name))]
    async fn create_stream(&self, config: jetstream::stream::Config) -> Result<StreamCreation> {
        match self.context.create_stream(config).await {
            Ok(_) => Ok(StreamCreation::Created),
            Err(err) => match err.kind() {
                CreateStreamErrorKind::JetStream(js_err)
                    if js_err.error_code() == ErrorCode::STREAM_NAME_EXIST =>
                {
                    Ok(StreamCreation::AlreadyExists)
                }
                _ => Err(anyhow::Error::new(err).context("Failed to create stream")),
            },
        }
    }

    #[instrument(skip(self))]
    async fn delete_stream(&self, stream_name: &str) -> Result<StreamDeletion> {
        match self.context.delete_stream(stream_name).await {
            Ok(_) => Ok(StreamDeletion::Deleted),
            Err(err) => match err.kind() {
                DeleteStreamErrorKind::JetStream(js_err)
                    if js_err.error_code() == ErrorCode::STREAM_NOT_FOUND =>
                {
                    Ok(StreamDeletion::NotFound)
                }
                _ => Err(anyhow::Error::new(err).context("Failed to delete stream")),
            },
        }
    }
}
