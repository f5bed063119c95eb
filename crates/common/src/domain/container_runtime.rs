use crate::domain::result::DomainResult;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Everything the runtime needs to launch one adapter container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterLaunch {
    pub device_id: String,
    pub container_name: String,
    pub image: String,
    /// Environment variables as `KEY -> value`
    pub env: BTreeMap<String, String>,
    /// Container labels, typically reverse-proxy routing configuration
    pub labels: BTreeMap<String, String>,
}

impl AdapterLaunch {
    /// Environment in the `KEY=value` form container engines expect
    pub fn env_pairs(&self) -> Vec<String> {
        self.env
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect()
    }
}

/// Runs and removes the single named adapter container of a device.
///
/// `run_adapter` replaces any container already holding the same name.
/// `stop_and_remove_container` accepts a container name or id and treats an
/// absent container as success.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create and start the adapter, returning the runtime-assigned container id
    async fn run_adapter(&self, launch: AdapterLaunch) -> DomainResult<String>;

    /// Stop and force-remove a container by name or id
    async fn stop_and_remove_container(&self, identifier: &str) -> DomainResult<()>;
}
