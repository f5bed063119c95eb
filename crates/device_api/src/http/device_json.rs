use chrono::{DateTime, Utc};
use common::domain::{Device, DeviceStatus};
use serde::{Deserialize, Serialize};

/// POST /devices body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeviceRequest {
    #[serde(rename = "type")]
    pub device_type: String,
}

/// Wire form of a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceJson {
    pub id: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub image: String,
    pub nats_subject: String,
    pub container_id: String,
    pub container_name: String,
    pub container_url: String,
    pub status: DeviceStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt_password: Option<String>,
}

impl From<Device> for DeviceJson {
    fn from(device: Device) -> Self {
        let (mqtt_user, mqtt_password) = match device.credentials {
            Some(c) => (Some(c.mqtt_user), Some(c.mqtt_password)),
            None => (None, None),
        };
        Self {
            id: device.device_id,
            device_type: device.device_type,
            image: device.image,
            nats_subject: device.messaging_subject,
            container_id: device.container_id,
            container_name: device.container_name,
            container_url: device.container_url,
            status: device.status,
            created_at: device.created_at,
            mqtt_user,
            mqtt_password,
        }
    }
}
