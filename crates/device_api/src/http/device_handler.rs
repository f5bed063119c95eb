use crate::http::{CreateDeviceRequest, DeviceJson};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use common::http::ApiError;
use device_orchestrator::domain::DeviceOrchestrationService;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Shared state for device routes
#[derive(Clone)]
pub struct DeviceApiState {
    pub orchestrator: Arc<DeviceOrchestrationService>,
}

#[instrument(name = "CreateDevice", skip(state, body))]
pub async fn create_device(
    State(state): State<DeviceApiState>,
    body: Result<Json<CreateDeviceRequest>, JsonRejection>,
) -> Result<Json<DeviceJson>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    if request.device_type.trim().is_empty() {
        return Err(ApiError::bad_request("device type must not be empty"));
    }

    let device = state.orchestrator.add_device(&request.device_type).await?;
    debug!(device_id = %device.device_id, "device created");

    Ok(Json(device.into()))
}

#[instrument(name = "ListDevices", skip(state))]
pub async fn list_devices(
    State(state): State<DeviceApiState>,
) -> Result<Json<Vec<DeviceJson>>, ApiError> {
    let devices = state.orchestrator.list_devices().await?;
    Ok(Json(devices.into_iter().map(DeviceJson::from).collect()))
}

#[instrument(name = "DeleteDevice", skip_all, fields(device_id = %device_id))]
pub async fn delete_device(
    State(state): State<DeviceApiState>,
    Path(device_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.remove_device(&device_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn health() -> &'static str {
    "ok"
}
