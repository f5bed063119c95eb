use crate::http::{device_api_router, DeviceApiState};
use common::http::{run_http_server, HttpServerConfig};
use device_orchestrator::domain::DeviceOrchestrationService;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct DeviceApi {
    state: DeviceApiState,
    config: HttpServerConfig,
}

impl DeviceApi {
    pub fn new(orchestrator: Arc<DeviceOrchestrationService>, config: HttpServerConfig) -> Self {
        debug!("initializing device API module");
        Self {
            state: DeviceApiState { orchestrator },
            config,
        }
    }

    pub fn into_runner_process(
        self,
    ) -> impl FnOnce(
        CancellationToken,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
    > {
        move |ctx| {
            Box::pin(async move {
                run_http_server(self.config, device_api_router(self.state), ctx).await
            })
        }
    }
}
