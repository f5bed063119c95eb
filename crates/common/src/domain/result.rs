use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Unsupported device type: {0}")]
    UnsupportedDeviceType(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device already exists: {0}")]
    DeviceAlreadyExists(String),

    #[error("Invalid device status: {0}")]
    InvalidDeviceStatus(String),

    #[error("Invalid routing input: {0}")]
    InvalidRoutingInput(String),

    #[error("Provisioning failed for device {device_id}: {source}")]
    ProvisioningFailed {
        device_id: String,
        #[source]
        source: Box<DomainError>,
    },

    #[error("Persistence failed for device {device_id}: {source}")]
    PersistenceFailed {
        device_id: String,
        #[source]
        source: Box<DomainError>,
    },

    #[error("Stream error: {0}")]
    StreamError(#[source] anyhow::Error),

    #[error("Container runtime error: {0}")]
    ContainerRuntimeError(#[source] anyhow::Error),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}

impl DomainError {
    pub fn provisioning(device_id: impl Into<String>, source: DomainError) -> Self {
        DomainError::ProvisioningFailed {
            device_id: device_id.into(),
            source: Box::new(source),
        }
    }

    pub fn persistence(device_id: impl Into<String>, source: DomainError) -> Self {
        DomainError::PersistenceFailed {
            device_id: device_id.into(),
            source: Box::new(source),
        }
    }
}
