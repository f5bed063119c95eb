use bollard::auth::DockerCredentials;
use serde::{Deserialize, Serialize};

/// Private image registry credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryAuthConfig {
    /// Registry host, e.g. "registry.digitalocean.com"
    pub server_address: String,
    /// Falls back to the token when empty (token-as-user registries)
    pub username: String,
    pub token: String,
}

impl RegistryAuthConfig {
    /// Credentials for image pulls, or None when no token is configured
    pub fn credentials(&self) -> Option<DockerCredentials> {
        if self.token.is_empty() {
            return None;
        }

        let username = if self.username.is_empty() {
            self.token.clone()
        } else {
            self.username.clone()
        };

        Some(DockerCredentials {
            username: Some(username),
            password: Some(self.token.clone()),
            serveraddress: (!self.server_address.is_empty()).then(|| self.server_address.clone()),
            ..Default::default()
        })
    }
}

/// Configuration for the Docker-backed container runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerRuntimeConfig {
    /// Network the reverse proxy watches; adapters always join it
    pub proxy_network: String,
    /// Container to inspect for the orchestrator's own networks.
    /// None means use the HOSTNAME environment variable.
    pub self_container: Option<String>,
    /// Grace period before a stopped container is killed
    pub stop_timeout_secs: i64,
    pub registry: RegistryAuthConfig,
}

impl Default for DockerRuntimeConfig {
    fn default() -> Self {
        Self {
            proxy_network: "service-io_default".to_string(),
            self_container: None,
            stop_timeout_secs: 10,
            registry: RegistryAuthConfig::default(),
        }
    }
}
