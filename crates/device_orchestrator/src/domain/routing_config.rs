use common::domain::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

const LOCAL_DOMAIN: &str = "localhost";
const SECURE_PORT: u16 = 8883;
const LOCAL_PORT: u16 = 1883;
const SECURE_ROUTER_PRIORITY: &str = "100";

/// Reverse-proxy settings adapters are published under
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// "localhost" selects local mode, anything else routed TLS mode
    pub base_domain: String,
    /// Docker network the proxy reaches adapters on
    pub network: String,
    pub entry_point: String,
    pub insecure_entry_point: String,
    pub cert_resolver: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_domain: LOCAL_DOMAIN.to_string(),
            network: "service-io_default".to_string(),
            entry_point: "websecure".to_string(),
            insecure_entry_point: "mqtt".to_string(),
            cert_resolver: "myresolver".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingMode {
    /// Per-device SNI host with TLS terminated at the proxy
    Secure,
    /// Single plaintext catch-all router for development
    Local,
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingMode::Secure => write!(f, "secure"),
            RoutingMode::Local => write!(f, "local"),
        }
    }
}

/// Container labels plus the URL devices connect to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterRoute {
    pub labels: BTreeMap<String, String>,
    pub public_url: String,
}

/// Derives Traefik TCP routing labels for adapter containers
#[derive(Debug, Clone)]
pub struct RoutingConfigGenerator {
    config: RoutingConfig,
}

impl RoutingConfigGenerator {
    pub fn new(config: RoutingConfig) -> Self {
        Self { config }
    }

    pub fn mode(&self) -> RoutingMode {
        if self.config.base_domain == LOCAL_DOMAIN {
            RoutingMode::Local
        } else {
            RoutingMode::Secure
        }
    }

    pub fn generate(
        &self,
        container_name: &str,
        device_id: &str,
        container_port: &str,
    ) -> DomainResult<AdapterRoute> {
        for (field, value) in [
            ("container name", container_name),
            ("device id", device_id),
            ("container port", container_port),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::InvalidRoutingInput(format!(
                    "{} must not be empty",
                    field
                )));
            }
        }

        let router = format!("traefik.tcp.routers.{}", container_name);
        let mut labels = BTreeMap::from([
            ("traefik.enable".to_string(), "true".to_string()),
            (format!("{}.service", router), container_name.to_string()),
            (
                format!(
                    "traefik.tcp.services.{}.loadbalancer.server.port",
                    container_name
                ),
                container_port.to_string(),
            ),
            (
                "traefik.docker.network".to_string(),
                self.config.network.clone(),
            ),
        ]);

        let mode = self.mode();
        let public_url = match mode {
            RoutingMode::Secure => {
                let domain = &self.config.base_domain;
                let host = format!("{}.{}", device_id, domain);
                labels.extend([
                    (format!("{}.rule", router), format!("HostSNI(`{}`)", host)),
                    (
                        format!("{}.entrypoints", router),
                        self.config.entry_point.clone(),
                    ),
                    (format!("{}.tls", router), "true".to_string()),
                    (
                        format!("{}.tls.certresolver", router),
                        self.config.cert_resolver.clone(),
                    ),
                    (
                        format!("{}.tls.domains[0].main", router),
                        format!("*.{}", domain),
                    ),
                    (format!("{}.tls.domains[0].sans", router), domain.clone()),
                    (
                        format!("{}.priority", router),
                        SECURE_ROUTER_PRIORITY.to_string(),
                    ),
                ]);
                format!("mqtts://{}:{}", host, SECURE_PORT)
            }
            RoutingMode::Local => {
                labels.extend([
                    (format!("{}.rule", router), "HostSNI(`*`)".to_string()),
                    (
                        format!("{}.entrypoints", router),
                        self.config.insecure_entry_point.clone(),
                    ),
                ]);
                format!("mqtt://{}:{}", LOCAL_DOMAIN, LOCAL_PORT)
            }
        };

        debug!(mode = %mode, device_id = %device_id, "generated routing labels");

        Ok(AdapterRoute { labels, public_url })
    }
}
