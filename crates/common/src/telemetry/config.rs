use opentelemetry_sdk::{logs::LoggerProvider, trace::TracerProvider as SdkTracerProvider};

pub const DEFAULT_SERVICE_NAME: &str = "service-io";
pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

/// Log output and optional OTLP export for the service-io process
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Reported as the OTel `service.name` resource and tracer name
    pub service_name: String,
    pub otel_endpoint: String,
    pub otel_enabled: bool,
    /// EnvFilter directive used when RUST_LOG is unset
    pub log_level: String,
}

impl TelemetryConfig {
    /// Collector to export to; None keeps output on stdout only
    pub fn otlp_endpoint(&self) -> Option<&str> {
        (self.otel_enabled && !self.otel_endpoint.is_empty()).then_some(self.otel_endpoint.as_str())
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            otel_endpoint: DEFAULT_OTLP_ENDPOINT.to_string(),
            otel_enabled: false,
            log_level: "info".to_string(),
        }
    }
}

/// OTLP pipelines to flush before exit
pub struct TelemetryProviders {
    pub tracer_provider: SdkTracerProvider,
    pub logger_provider: LoggerProvider,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_requires_flag_and_endpoint() {
        let mut config = TelemetryConfig::default();
        assert_eq!(config.otlp_endpoint(), None);

        config.otel_enabled = true;
        assert_eq!(config.otlp_endpoint(), Some(DEFAULT_OTLP_ENDPOINT));

        config.otel_endpoint.clear();
        assert_eq!(config.otlp_endpoint(), None);
    }
}
