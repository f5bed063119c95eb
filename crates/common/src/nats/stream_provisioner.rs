use crate::domain::{DomainError, DomainResult, StreamProvisioner};
use crate::nats::traits::{JetStreamAdmin, StreamCreation, StreamDeletion};
use async_nats::jetstream::stream::{Config as StreamConfig, StorageType};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// One file-backed, single-replica stream per device, bound to that device's subject
pub struct NatsStreamProvisioner {
    admin: Arc<dyn JetStreamAdmin>,
}

impl NatsStreamProvisioner {
    pub fn new(admin: Arc<dyn JetStreamAdmin>) -> Self {
        Self { admin }
    }

    fn stream_config(subject: &str, stream_name: &str) -> StreamConfig {
        StreamConfig {
            name: stream_name.to_string(),
            subjects: vec![subject.to_string()],
            description: Some(format!("Device telemetry for {}", subject)),
            storage: StorageType::File,
            num_replicas: 1,
            ..Default::default()
        }
    }
}

#[async_trait]
impl StreamProvisioner for NatsStreamProvisioner {
    #[instrument(skip(self), fields(subject = %subject, stream = %stream_name))]
    async fn ensure_stream(&self, subject: &str, stream_name: &str) -> DomainResult<()> {
        let outcome = self
            .admin
            .create_stream(Self::stream_config(subject, stream_name))
            .await
            .map_err(DomainError::StreamError)?;

        match outcome {
            StreamCreation::Created => info!("created device stream"),
            StreamCreation::AlreadyExists => debug!("device stream already exists"),
        }
        Ok(())
    }

    #[instrument(skip(self), fields(stream = %stream_name))]
    async fn delete_stream(&self, stream_name: &str) -> DomainResult<()> {
        let outcome = self
            .admin
            .delete_stream(stream_name)
            .await
            .map_err(DomainError::StreamError)?;

        match outcome {
            StreamDeletion::Deleted => info!("deleted device stream"),
            StreamDeletion::NotFound => debug!("device stream did not exist"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nats::traits::MockJetStreamAdmin;

    #[tokio::test]
    async fn test_ensure_stream_binds_single_subject() {
        let mut admin = MockJetStreamAdmin::new();
        admin
            .expect_create_stream()
            .withf(|config: &StreamConfig| {
                config.name == "DEV_ABC"
                    && config.subjects == vec!["devices.ABC.telemetry".to_string()]
                    && config.storage == StorageType::File
                    && config.num_replicas == 1
            })
            .times(1)
            .returning(|_| Ok(StreamCreation::Created));

        let provisioner = NatsStreamProvisioner::new(Arc::new(admin));
        let result = provisioner
            .ensure_stream("devices.ABC.telemetry", "DEV_ABC")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_ensure_stream_accepts_existing_stream() {
        let mut admin = MockJetStreamAdmin::new();
        admin
            .expect_create_stream()
            .times(1)
            .returning(|_| Ok(StreamCreation::AlreadyExists));

        let provisioner = NatsStreamProvisioner::new(Arc::new(admin));
        assert!(provisioner
            .ensure_stream("devices.ABC.telemetry", "DEV_ABC")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_ensure_stream_surfaces_other_failures() {
        let mut admin = MockJetStreamAdmin::new();
        admin
            .expect_create_stream()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("jetstream unavailable")));

        let provisioner = NatsStreamProvisioner::new(Arc::new(admin));
        let result = provisioner
            .ensure_stream("devices.ABC.telemetry", "DEV_ABC")
            .await;
        assert!(matches!(result, Err(DomainError::StreamError(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_stream_is_success() {
        let mut admin = MockJetStreamAdmin::new();
        admin
            .expect_delete_stream()
            .withf(|name: &str| name == "DEV_GONE")
            .times(1)
            .returning(|_| Ok(StreamDeletion::NotFound));

        let provisioner = NatsStreamProvisioner::new(Arc::new(admin));
        assert!(provisioner.delete_stream("DEV_GONE").await.is_ok());
    }
}
