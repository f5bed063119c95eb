use crate::domain::DeviceOrchestrationService;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct DeviceOrchestratorConfig {
    /// Upper bound on stopping adapters once shutdown begins
    pub cleanup_timeout: Duration,
}

impl Default for DeviceOrchestratorConfig {
    fn default() -> Self {
        Self {
            cleanup_timeout: Duration::from_secs(30),
        }
    }
}

/// Owns the adapter lifecycle across process boot and shutdown
pub struct DeviceOrchestrator {
    service: Arc<DeviceOrchestrationService>,
    config: DeviceOrchestratorConfig,
}

impl DeviceOrchestrator {
    /// Reconcile registry state with the container runtime before serving
    pub async fn new(
        service: Arc<DeviceOrchestrationService>,
        startup_token: &CancellationToken,
        config: DeviceOrchestratorConfig,
    ) -> anyhow::Result<Self> {
        debug!("initializing device orchestrator");

        let report = service.restart_running_devices(startup_token).await?;
        info!(
            restarted = report.restarted,
            stopped = report.stopped,
            "device orchestrator started"
        );

        Ok(Self { service, config })
    }

    pub fn service(&self) -> Arc<DeviceOrchestrationService> {
        Arc::clone(&self.service)
    }

    /// Idles until shutdown, then stops every running adapter
    #[allow(clippy::type_complexity)]
    pub fn into_runner_process(
        self,
    ) -> Box<
        dyn FnOnce(CancellationToken) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>
            + Send,
    > {
        let service = self.service;
        let cleanup_timeout = self.config.cleanup_timeout;

        Box::new(move |ctx| {
            Box::pin(async move {
                ctx.cancelled().await;
                info!("shutdown requested, stopping adapters");

                // The runner token is already cancelled; cleanup gets its own deadline
                let deadline = CancellationToken::new();
                let timer = tokio::spawn({
                    let deadline = deadline.clone();
                    async move {
                        tokio::time::sleep(cleanup_timeout).await;
                        deadline.cancel();
                    }
                });

                let result = service.cleanup_adapters(&deadline).await;
                timer.abort();
                result.map_err(Into::into)
            })
        })
    }
}
