use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceOrchestrationServiceConfig {
    /// Device type to adapter image, e.g. "mqtt" -> "adapter-mqtt:latest"
    pub adapter_images: BTreeMap<String, String>,

    /// Broker URL handed to adapters as NATS_URL
    pub nats_url: String,

    /// Port the adapter listens on inside its container
    pub adapter_port: String,

    /// Device types that get generated MQTT credentials (default: ["mqtt"])
    pub credential_device_types: Vec<String>,

    /// Fresh identifiers tried before AddDevice gives up (default: 5)
    pub max_identifier_attempts: u32,
}

impl Default for DeviceOrchestrationServiceConfig {
    fn default() -> Self {
        Self {
            adapter_images: BTreeMap::from([(
                "random".to_string(),
                "rand-adapter:latest".to_string(),
            )]),
            nats_url: "nats://localhost:4222".to_string(),
            adapter_port: "1883".to_string(),
            credential_device_types: vec!["mqtt".to_string()],
            max_identifier_attempts: 5,
        }
    }
}

impl DeviceOrchestrationServiceConfig {
    pub fn image_for(&self, device_type: &str) -> Option<&str> {
        self.adapter_images.get(device_type).map(String::as_str)
    }

    pub fn requires_credentials(&self, device_type: &str) -> bool {
        self.credential_device_types
            .iter()
            .any(|t| t == device_type)
    }
}
