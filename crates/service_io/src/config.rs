use anyhow::Context;
use common::docker::{DockerRuntimeConfig, RegistryAuthConfig};
use common::postgres::PostgresConfig;
use common::telemetry::{TelemetryConfig, DEFAULT_OTLP_ENDPOINT, DEFAULT_SERVICE_NAME};
use config::{Config, ConfigError, Environment};
use device_orchestrator::domain::{DeviceOrchestrationServiceConfig, RoutingConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // NATS configuration
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Timeout for connecting to NATS and the other backends at boot
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    // PostgreSQL configuration
    #[serde(default = "default_postgres_host")]
    pub postgres_host: String,

    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,

    #[serde(default = "default_postgres_database")]
    pub postgres_database: String,

    #[serde(default = "default_postgres_username")]
    pub postgres_username: String,

    #[serde(default = "default_postgres_password")]
    pub postgres_password: String,

    #[serde(default = "default_postgres_max_pool_size")]
    pub postgres_max_pool_size: usize,

    #[serde(default = "default_postgres_migrations_dir")]
    pub postgres_migrations_dir: String,

    #[serde(default = "default_postgres_goose_binary_path")]
    pub postgres_goose_binary_path: String,

    // HTTP server configuration
    #[serde(default = "default_http_host")]
    pub http_host: String,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Comma-separated path prefixes left out of the access log
    #[serde(default = "default_http_ignored_paths")]
    pub http_ignored_paths: String,

    // Adapter configuration
    /// JSON object mapping device type to adapter image
    #[serde(default = "default_adapter_map_json")]
    pub adapter_map_json: String,

    #[serde(default = "default_adapter_port")]
    pub adapter_port: String,

    /// Comma-separated device types that receive MQTT credentials
    #[serde(default = "default_credential_device_types")]
    pub credential_device_types: String,

    #[serde(default = "default_max_identifier_attempts")]
    pub max_identifier_attempts: u32,

    /// Seconds allowed for stopping adapters at shutdown
    #[serde(default = "default_adapter_cleanup_timeout_secs")]
    pub adapter_cleanup_timeout_secs: u64,

    // Image registry
    #[serde(default)]
    pub registry_server: String,

    #[serde(default)]
    pub registry_username: String,

    #[serde(default)]
    pub registry_token: String,

    // Traefik routing
    #[serde(default = "default_traefik_network")]
    pub traefik_network: String,

    #[serde(default = "default_traefik_entry_point")]
    pub traefik_entry_point: String,

    #[serde(default = "default_traefik_insecure_entry_point")]
    pub traefik_insecure_entry_point: String,

    #[serde(default = "default_traefik_cert_resolver")]
    pub traefik_cert_resolver: String,

    /// "localhost" publishes adapters without TLS
    #[serde(default = "default_base_domain")]
    pub base_domain: String,

    // Telemetry
    #[serde(default)]
    pub otel_enabled: bool,

    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_startup_timeout_secs() -> u64 {
    30
}

fn default_postgres_host() -> String {
    "localhost".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_postgres_database() -> String {
    "service_io".to_string()
}

fn default_postgres_username() -> String {
    "service_io".to_string()
}

fn default_postgres_password() -> String {
    "service_io".to_string()
}

fn default_postgres_max_pool_size() -> usize {
    5
}

fn default_postgres_migrations_dir() -> String {
    "/home/service-io/migrations/postgres".to_string()
}

fn default_postgres_goose_binary_path() -> String {
    "goose".to_string()
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    9090
}

fn default_http_ignored_paths() -> String {
    "/health".to_string()
}

fn default_adapter_map_json() -> String {
    r#"{"random":"rand-adapter:latest"}"#.to_string()
}

fn default_adapter_port() -> String {
    "1883".to_string()
}

fn default_credential_device_types() -> String {
    "mqtt".to_string()
}

fn default_max_identifier_attempts() -> u32 {
    5
}

fn default_adapter_cleanup_timeout_secs() -> u64 {
    30
}

fn default_traefik_network() -> String {
    "service-io_default".to_string()
}

fn default_traefik_entry_point() -> String {
    "websecure".to_string()
}

fn default_traefik_insecure_entry_point() -> String {
    "mqtt".to_string()
}

fn default_traefik_cert_resolver() -> String {
    "myresolver".to_string()
}

fn default_base_domain() -> String {
    "localhost".to_string()
}

fn default_otel_endpoint() -> String {
    DEFAULT_OTLP_ENDPOINT.to_string()
}

fn default_otel_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

fn split_comma_separated(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("SERVICE_IO"))
            .build()?
            .try_deserialize()
    }

    /// Parsed device type to image map; an empty or malformed map is fatal
    pub fn adapter_images(&self) -> anyhow::Result<BTreeMap<String, String>> {
        let images: BTreeMap<String, String> = serde_json::from_str(&self.adapter_map_json)
            .context("adapter_map_json must be a JSON object of device type to image")?;
        if images.is_empty() {
            anyhow::bail!("adapter_map_json must map at least one device type");
        }
        Ok(images)
    }

    pub fn orchestration_config(&self) -> anyhow::Result<DeviceOrchestrationServiceConfig> {
        Ok(DeviceOrchestrationServiceConfig {
            adapter_images: self.adapter_images()?,
            nats_url: self.nats_url.clone(),
            adapter_port: self.adapter_port.clone(),
            credential_device_types: split_comma_separated(&self.credential_device_types),
            max_identifier_attempts: self.max_identifier_attempts.max(1),
        })
    }

    pub fn routing_config(&self) -> RoutingConfig {
        RoutingConfig {
            base_domain: self.base_domain.clone(),
            network: self.traefik_network.clone(),
            entry_point: self.traefik_entry_point.clone(),
            insecure_entry_point: self.traefik_insecure_entry_point.clone(),
            cert_resolver: self.traefik_cert_resolver.clone(),
        }
    }

    pub fn docker_config(&self) -> DockerRuntimeConfig {
        DockerRuntimeConfig {
            proxy_network: self.traefik_network.clone(),
            registry: RegistryAuthConfig {
                server_address: self.registry_server.clone(),
                username: self.registry_username.clone(),
                token: self.registry_token.clone(),
            },
            ..Default::default()
        }
    }

    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: self.otel_service_name.clone(),
            otel_endpoint: self.otel_endpoint.clone(),
            otel_enabled: self.otel_enabled,
            log_level: self.log_level.clone(),
        }
    }

    pub fn postgres_config(&self) -> PostgresConfig {
        PostgresConfig {
            host: self.postgres_host.clone(),
            port: self.postgres_port,
            database: self.postgres_database.clone(),
            username: self.postgres_username.clone(),
            password: self.postgres_password.clone(),
            max_pool_size: self.postgres_max_pool_size,
            migrations_dir: self.postgres_migrations_dir.clone(),
            goose_binary_path: self.postgres_goose_binary_path.clone(),
        }
    }
}
