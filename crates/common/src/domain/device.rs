use crate::domain::result::{DomainError, DomainResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Desired (last known) state of a device adapter.
///
/// This reflects registry intent, not necessarily what the container
/// runtime reports right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Running,
    Stopped,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Running => "running",
            DeviceStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(DeviceStatus::Running),
            "stopped" => Ok(DeviceStatus::Stopped),
            other => Err(DomainError::InvalidDeviceStatus(other.to_string())),
        }
    }
}

/// Protocol credentials handed to an adapter, only for device types that need them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCredentials {
    pub mqtt_user: String,
    pub mqtt_password: String,
}

/// Device entity: one registry record, one stream, and (while running) one adapter container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub device_id: String,
    pub device_type: String,
    pub image: String,
    pub messaging_subject: String,
    pub container_name: String,
    /// Empty when no container is running
    pub container_id: String,
    pub container_url: String,
    pub status: DeviceStatus,
    pub credentials: Option<DeviceCredentials>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Device {
    pub fn is_running(&self) -> bool {
        self.status == DeviceStatus::Running
    }
}

/// Repository input for persisting a new device; the id is already generated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDeviceRepoInput {
    pub device_id: String,
    pub device_type: String,
    pub image: String,
    pub messaging_subject: String,
    pub container_name: String,
    pub container_url: String,
    pub status: DeviceStatus,
    pub credentials: Option<DeviceCredentials>,
}

/// Repository input for updating the mutable part of a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDeviceRepoInput {
    pub device_id: String,
    pub container_id: String,
    pub status: DeviceStatus,
}

/// Repository trait for device registry operations.
///
/// `get_device` reports absence as `Ok(None)`; `update_device` and
/// `delete_device` report it as `DomainError::DeviceNotFound`. A duplicate
/// primary key on `create_device` is `DomainError::DeviceAlreadyExists`.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Persist a new device record
    async fn create_device(&self, input: CreateDeviceRepoInput) -> DomainResult<Device>;

    /// Get a device by id
    async fn get_device(&self, device_id: &str) -> DomainResult<Option<Device>>;

    /// List every device, newest first
    async fn list_devices(&self) -> DomainResult<Vec<Device>>;

    /// List devices with the given status
    async fn list_devices_by_status(&self, status: DeviceStatus) -> DomainResult<Vec<Device>>;

    /// Update container id and status
    async fn update_device(&self, input: UpdateDeviceRepoInput) -> DomainResult<Device>;

    /// Hard delete a device record
    async fn delete_device(&self, device_id: &str) -> DomainResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        assert_eq!("running".parse::<DeviceStatus>().unwrap(), DeviceStatus::Running);
        assert_eq!("stopped".parse::<DeviceStatus>().unwrap(), DeviceStatus::Stopped);
        assert_eq!(DeviceStatus::Running.to_string(), "running");
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let result = "paused".parse::<DeviceStatus>();
        assert!(matches!(result, Err(DomainError::InvalidDeviceStatus(s)) if s == "paused"));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&DeviceStatus::Stopped).unwrap();
        assert_eq!(json, "\"stopped\"");
    }
}
