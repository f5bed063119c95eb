mod config;

use common::docker::DockerContainerRuntime;
use common::http::{HttpLoggingConfig, HttpServerConfig};
use common::nats::{NatsClient, NatsStreamProvisioner};
use common::postgres::{PostgresClient, PostgresDeviceRepository};
use common::telemetry::{init_telemetry, shutdown_telemetry, TelemetryProviders};
use config::ServiceConfig;
use device_api::DeviceApi;
use device_orchestrator::device_orchestrator::{DeviceOrchestrator, DeviceOrchestratorConfig};
use device_orchestrator::domain::{DeviceOrchestrationService, RoutingConfigGenerator};
use goose::MigrationRunner;
use service_io_runner::Runner;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let orchestration_config = match config.orchestration_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Invalid adapter configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let telemetry_providers: Option<TelemetryProviders> = match init_telemetry(&config.telemetry_config()) {
        Ok(providers) => providers,
        Err(e) => {
            eprintln!("Failed to initialize telemetry: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        otel_enabled = config.otel_enabled,
        base_domain = %config.base_domain,
        device_types = ?orchestration_config.adapter_images.keys().collect::<Vec<_>>(),
        "Starting service-io"
    );
    debug!("Configuration: {:?}", config);

    let dependencies = match initialize_dependencies(&config).await {
        Ok(deps) => deps,
        Err(e) => {
            error!("Failed to initialize dependencies: {:#}", e);
            std::process::exit(1);
        }
    };

    let orchestration_service = Arc::new(DeviceOrchestrationService::new(
        dependencies.device_repository,
        Arc::new(NatsStreamProvisioner::new(
            dependencies.nats_client.create_stream_admin(),
        )),
        dependencies.container_runtime,
        RoutingConfigGenerator::new(config.routing_config()),
        orchestration_config,
    ));

    let startup_token = CancellationToken::new();
    let device_orchestrator = match DeviceOrchestrator::new(
        Arc::clone(&orchestration_service),
        &startup_token,
        DeviceOrchestratorConfig {
            cleanup_timeout: Duration::from_secs(config.adapter_cleanup_timeout_secs),
        },
    )
    .await
    {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!("Failed to reconcile devices: {:#}", e);
            std::process::exit(1);
        }
    };

    let device_api = DeviceApi::new(
        device_orchestrator.service(),
        HttpServerConfig {
            host: config.http_host.clone(),
            port: config.http_port,
            logging_config: HttpLoggingConfig::from_comma_separated(&config.http_ignored_paths),
        },
    );

    let nats_client = dependencies.nats_client;
    // Adapter cleanup must finish before the process exits
    let closer_timeout = Duration::from_secs(config.adapter_cleanup_timeout_secs + 10);

    Runner::new()
        .with_named_process("device_api", device_api.into_runner_process())
        .with_named_process(
            "device_orchestrator",
            device_orchestrator.into_runner_process(),
        )
        .with_closer(move || async move {
            info!("Running cleanup tasks...");
            if let Ok(client) = Arc::try_unwrap(nats_client) {
                client.close().await;
            }
            shutdown_telemetry(telemetry_providers);
            info!("Cleanup complete");
            Ok(())
        })
        .with_closer_timeout(closer_timeout)
        .run()
        .await;
}

struct Dependencies {
    device_repository: Arc<PostgresDeviceRepository>,
    nats_client: Arc<NatsClient>,
    container_runtime: Arc<DockerContainerRuntime>,
}

async fn initialize_dependencies(config: &ServiceConfig) -> anyhow::Result<Dependencies> {
    info!("Initializing PostgreSQL...");
    let postgres_config = config.postgres_config();
    let migrations = MigrationRunner::new(
        postgres_config.goose_binary_path.clone(),
        postgres_config.migrations_dir.clone(),
        "postgres".to_string(),
        postgres_config.goose_dsn(),
    );
    migrations.run_migrations().await?;
    debug!("migration status:\n{}", migrations.migration_status().await?);

    let postgres_client = PostgresClient::from_config(&postgres_config)?;
    postgres_client.ping().await?;

    info!("Initializing NATS...");
    let nats_client = Arc::new(
        NatsClient::connect(
            &config.nats_url,
            Duration::from_secs(config.startup_timeout_secs),
        )
        .await?,
    );

    info!("Initializing Docker...");
    let container_runtime = Arc::new(DockerContainerRuntime::connect(config.docker_config()).await?);

    Ok(Dependencies {
        device_repository: Arc::new(PostgresDeviceRepository::new(postgres_client)),
        nats_client,
        container_runtime,
    })
}
