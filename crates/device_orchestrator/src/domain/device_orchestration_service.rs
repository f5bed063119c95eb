use crate::domain::{
    generate_password, BestEffort, DeviceNames, DeviceOrchestrationServiceConfig,
    IdentifierGenerator, RandomIdentifierGenerator, RoutingConfigGenerator,
};
use common::domain::{
    AdapterLaunch, ContainerRuntime, CreateDeviceRepoInput, Device, DeviceCredentials,
    DeviceRepository, DeviceStatus, DomainError, DomainResult, StreamProvisioner,
    UpdateDeviceRepoInput,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Outcome counts of a boot-time reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// Adapters started again and recorded with their new container id
    pub restarted: usize,
    /// Adapters that failed to start and were marked stopped
    pub stopped: usize,
    /// Devices whose new state could not be written back
    pub persistence_failures: usize,
}

/// Sequences the stream, container and registry record of every device
pub struct DeviceOrchestrationService {
    device_repository: Arc<dyn DeviceRepository>,
    stream_provisioner: Arc<dyn StreamProvisioner>,
    container_runtime: Arc<dyn ContainerRuntime>,
    identifier_generator: Arc<dyn IdentifierGenerator>,
    routing: RoutingConfigGenerator,
    config: DeviceOrchestrationServiceConfig,
    best_effort: BestEffort,
}

impl DeviceOrchestrationService {
    pub fn new(
        device_repository: Arc<dyn DeviceRepository>,
        stream_provisioner: Arc<dyn StreamProvisioner>,
        container_runtime: Arc<dyn ContainerRuntime>,
        routing: RoutingConfigGenerator,
        config: DeviceOrchestrationServiceConfig,
    ) -> Self {
        Self {
            device_repository,
            stream_provisioner,
            container_runtime,
            identifier_generator: Arc::new(RandomIdentifierGenerator),
            routing,
            config,
            best_effort: BestEffort::new(),
        }
    }

    pub fn with_identifier_generator(mut self, generator: Arc<dyn IdentifierGenerator>) -> Self {
        self.identifier_generator = generator;
        self
    }

    /// Cleanup steps that failed since startup
    pub fn best_effort_failures(&self) -> u64 {
        self.best_effort.failure_count()
    }

    /// Provision a new device of `device_type`: stream, record, then container.
    #[instrument(skip(self), fields(device_type = %device_type))]
    pub async fn add_device(&self, device_type: &str) -> DomainResult<Device> {
        let image = self
            .config
            .image_for(device_type)
            .ok_or_else(|| DomainError::UnsupportedDeviceType(device_type.to_string()))?
            .to_string();

        let mut last_candidate = String::new();
        for attempt in 1..=self.config.max_identifier_attempts {
            let device_id = self.identifier_generator.generate_id();

            match self.try_provision(&device_id, device_type, &image).await? {
                Some(device) => {
                    info!(device_id = %device.device_id, image = %device.image, "device provisioned");
                    return Ok(device);
                }
                None => {
                    warn!(device_id = %device_id, attempt, "identifier already taken, retrying");
                    last_candidate = device_id;
                }
            }
        }

        Err(DomainError::persistence(
            last_candidate.clone(),
            DomainError::DeviceAlreadyExists(last_candidate),
        ))
    }

    /// One provisioning attempt. `Ok(None)` means the identifier was taken.
    async fn try_provision(
        &self,
        device_id: &str,
        device_type: &str,
        image: &str,
    ) -> DomainResult<Option<Device>> {
        let existing = self
            .device_repository
            .get_device(device_id)
            .await
            .map_err(|e| DomainError::persistence(device_id, e))?;
        if existing.is_some() {
            return Ok(None);
        }

        let names = DeviceNames::for_device(device_id);
        let route = self
            .routing
            .generate(&names.container_name, device_id, &self.config.adapter_port)
            .map_err(|e| DomainError::provisioning(device_id, e))?;

        let credentials =
            self.config
                .requires_credentials(device_type)
                .then(|| DeviceCredentials {
                    mqtt_user: device_id.to_string(),
                    mqtt_password: generate_password(),
                });

        self.stream_provisioner
            .ensure_stream(&names.messaging_subject, &names.stream_name)
            .await
            .map_err(|e| DomainError::provisioning(device_id, e))?;

        let created = self
            .device_repository
            .create_device(CreateDeviceRepoInput {
                device_id: device_id.to_string(),
                device_type: device_type.to_string(),
                image: image.to_string(),
                messaging_subject: names.messaging_subject.clone(),
                container_name: names.container_name.clone(),
                container_url: route.public_url.clone(),
                status: DeviceStatus::Running,
                credentials,
            })
            .await;

        let device = match created {
            Ok(device) => device,
            // The stream now belongs to whoever holds the identifier
            Err(DomainError::DeviceAlreadyExists(_)) => return Ok(None),
            Err(e) => {
                self.best_effort
                    .run(
                        "delete_stream",
                        device_id,
                        self.stream_provisioner.delete_stream(&names.stream_name),
                    )
                    .await;
                return Err(DomainError::persistence(device_id, e));
            }
        };

        let launch = self.adapter_launch(&device, route.labels);
        let container_id = match self.container_runtime.run_adapter(launch).await {
            Ok(container_id) => container_id,
            Err(e) => {
                error!(device_id = %device_id, error = %e, "adapter failed to start, rolling back");
                self.best_effort
                    .run(
                        "delete_stream",
                        device_id,
                        self.stream_provisioner.delete_stream(&names.stream_name),
                    )
                    .await;
                self.best_effort
                    .run(
                        "delete_device",
                        device_id,
                        self.device_repository.delete_device(device_id),
                    )
                    .await;
                return Err(DomainError::provisioning(device_id, e));
            }
        };

        let update = UpdateDeviceRepoInput {
            device_id: device_id.to_string(),
            container_id: container_id.clone(),
            status: DeviceStatus::Running,
        };
        match self.device_repository.update_device(update).await {
            Ok(updated) => Ok(Some(updated)),
            Err(e) => {
                // The adapter is live; the next reconciliation refreshes the id
                warn!(device_id = %device_id, error = %e, "failed to record container id");
                Ok(Some(Device {
                    container_id,
                    ..device
                }))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn list_devices(&self) -> DomainResult<Vec<Device>> {
        self.device_repository.list_devices().await
    }

    /// Stop the adapter and mark the device stopped. The record is kept.
    #[instrument(skip(self), fields(device_id = %device_id))]
    pub async fn remove_device(&self, device_id: &str) -> DomainResult<()> {
        let device = self
            .device_repository
            .get_device(device_id)
            .await?
            .ok_or_else(|| DomainError::DeviceNotFound(device_id.to_string()))?;

        self.best_effort
            .run(
                "stop_and_remove_container",
                device_id,
                self.container_runtime
                    .stop_and_remove_container(&device.container_name),
            )
            .await;

        self.device_repository
            .update_device(UpdateDeviceRepoInput {
                device_id: device_id.to_string(),
                container_id: String::new(),
                status: DeviceStatus::Stopped,
            })
            .await
            .map_err(|e| DomainError::persistence(device_id, e))?;

        info!("device stopped");
        Ok(())
    }

    /// Start a fresh adapter for every device recorded as running.
    ///
    /// Streams are not re-created. Per-device failures are isolated; only the
    /// initial listing error propagates.
    #[instrument(skip(self, cancellation_token))]
    pub async fn restart_running_devices(
        &self,
        cancellation_token: &CancellationToken,
    ) -> DomainResult<ReconciliationReport> {
        let devices = self
            .device_repository
            .list_devices_by_status(DeviceStatus::Running)
            .await?;
        info!("reconciling {} running devices", devices.len());

        let mut report = ReconciliationReport::default();
        for device in devices {
            if cancellation_token.is_cancelled() {
                info!("reconciliation cancelled");
                break;
            }

            let (container_id, status) = match self.start_adapter(&device).await {
                Ok(container_id) => (container_id, DeviceStatus::Running),
                Err(e) => {
                    error!(device_id = %device.device_id, error = %e, "failed to restart adapter");
                    (String::new(), DeviceStatus::Stopped)
                }
            };

            let update = UpdateDeviceRepoInput {
                device_id: device.device_id.clone(),
                container_id,
                status,
            };
            match self.device_repository.update_device(update).await {
                Ok(_) if status == DeviceStatus::Running => report.restarted += 1,
                Ok(_) => report.stopped += 1,
                Err(e) => {
                    error!(device_id = %device.device_id, error = %e, "failed to persist reconciled state");
                    report.persistence_failures += 1;
                }
            }
        }

        info!(
            restarted = report.restarted,
            stopped = report.stopped,
            persistence_failures = report.persistence_failures,
            "reconciliation complete"
        );
        Ok(report)
    }

    /// Stop every running adapter on shutdown, leaving the records running
    /// so the next boot restarts them.
    #[instrument(skip(self, cancellation_token))]
    pub async fn cleanup_adapters(&self, cancellation_token: &CancellationToken) -> DomainResult<()> {
        let devices = self.device_repository.list_devices().await?;
        let running: Vec<Device> = devices.into_iter().filter(Device::is_running).collect();
        info!("stopping {} adapters", running.len());

        for device in running {
            if cancellation_token.is_cancelled() {
                warn!("adapter cleanup cancelled");
                break;
            }
            self.best_effort
                .run(
                    "stop_and_remove_container",
                    &device.device_id,
                    self.container_runtime
                        .stop_and_remove_container(&device.container_name),
                )
                .await;
        }

        debug!("adapter cleanup complete");
        Ok(())
    }

    async fn start_adapter(&self, device: &Device) -> DomainResult<String> {
        let route = self.routing.generate(
            &device.container_name,
            &device.device_id,
            &self.config.adapter_port,
        )?;
        let launch = self.adapter_launch(device, route.labels);
        self.container_runtime.run_adapter(launch).await
    }

    fn adapter_launch(&self, device: &Device, labels: BTreeMap<String, String>) -> AdapterLaunch {
        let mut env = BTreeMap::from([
            ("NATS_URL".to_string(), self.config.nats_url.clone()),
            ("SUBJECT".to_string(), device.messaging_subject.clone()),
            ("DEVICE_ID".to_string(), device.device_id.clone()),
            ("ENABLE_JETSTREAM".to_string(), "true".to_string()),
        ]);
        if let Some(credentials) = &device.credentials {
            env.insert("MQTT_USER".to_string(), credentials.mqtt_user.clone());
            env.insert(
                "MQTT_PASSWORD".to_string(),
                credentials.mqtt_password.clone(),
            );
        }

        AdapterLaunch {
            device_id: device.device_id.clone(),
            container_name: device.container_name.clone(),
            image: device.image.clone(),
            env,
            labels,
        }
    }
}
