use crate::http::{create_device, delete_device, health, list_devices, DeviceApiState};
use axum::routing::{delete, get};
use axum::Router;

pub fn device_api_router(state: DeviceApiState) -> Router {
    Router::new()
        .route("/devices", get(list_devices).post(create_device))
        .route("/devices/{id}", delete(delete_device))
        .route("/health", get(health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::DeviceJson;
    use axum::body::Body;
    use common::domain::{
        CreateDeviceRepoInput, Device, DeviceStatus, DomainError, MockContainerRuntime,
        MockDeviceRepository, MockStreamProvisioner,
    };
    use device_orchestrator::domain::{
        DeviceOrchestrationService, DeviceOrchestrationServiceConfig, RoutingConfig,
        RoutingConfigGenerator,
    };
    use axum::http::{Request, StatusCode};
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn stored(input: CreateDeviceRepoInput) -> Device {
        let now = chrono::Utc::now();
        Device {
            device_id: input.device_id,
            device_type: input.device_type,
            image: input.image,
            messaging_subject: input.messaging_subject,
            container_name: input.container_name,
            container_id: String::new(),
            container_url: input.container_url,
            status: input.status,
            credentials: input.credentials,
            created_at: now,
            updated_at: now,
        }
    }

    fn app(
        repo: MockDeviceRepository,
        streams: MockStreamProvisioner,
        runtime: MockContainerRuntime,
    ) -> Router {
        let orchestrator = DeviceOrchestrationService::new(
            Arc::new(repo),
            Arc::new(streams),
            Arc::new(runtime),
            RoutingConfigGenerator::new(RoutingConfig::default()),
            DeviceOrchestrationServiceConfig {
                adapter_images: BTreeMap::from([(
                    "mqtt".to_string(),
                    "adapter-mqtt:latest".to_string(),
                )]),
                ..Default::default()
            },
        );
        device_api_router(DeviceApiState {
            orchestrator: Arc::new(orchestrator),
        })
    }

    fn empty_app() -> Router {
        app(
            MockDeviceRepository::new(),
            MockStreamProvisioner::new(),
            MockContainerRuntime::new(),
        )
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body")
            .to_vec()
    }

    fn post_devices(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/devices")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn test_health() {
        let response = empty_app()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"ok");
    }

    #[tokio::test]
    async fn test_create_device_returns_device_json() {
        let mut repo = MockDeviceRepository::new();
        repo.expect_get_device().returning(|_| Ok(None));
        repo.expect_create_device().returning(|input| Ok(stored(input)));
        repo.expect_update_device().returning(|input| {
            let names = device_orchestrator::domain::DeviceNames::for_device(&input.device_id);
            let mut device = stored(CreateDeviceRepoInput {
                device_id: input.device_id.clone(),
                device_type: "mqtt".to_string(),
                image: "adapter-mqtt:latest".to_string(),
                messaging_subject: names.messaging_subject,
                container_name: names.container_name,
                container_url: "mqtt://localhost:1883".to_string(),
                status: input.status,
                credentials: None,
            });
            device.container_id = input.container_id;
            Ok(device)
        });
        let mut streams = MockStreamProvisioner::new();
        streams.expect_ensure_stream().returning(|_, _| Ok(()));
        let mut runtime = MockContainerRuntime::new();
        runtime
            .expect_run_adapter()
            .returning(|_| Ok("container-1".to_string()));

        let response = app(repo, streams, runtime)
            .oneshot(post_devices(r#"{"type":"mqtt"}"#))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let device: DeviceJson = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(device.device_type, "mqtt");
        assert_eq!(device.image, "adapter-mqtt:latest");
        assert_eq!(device.status, DeviceStatus::Running);
        assert_eq!(device.container_id, "container-1");
        assert_eq!(device.nats_subject, format!("devices.{}.telemetry", device.id));
    }

    #[tokio::test]
    async fn test_create_unsupported_type_is_bad_request() {
        let response = empty_app()
            .oneshot(post_devices(r#"{"type":"toaster"}"#))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(body.contains("toaster"));
    }

    #[tokio::test]
    async fn test_create_with_malformed_body_is_bad_request() {
        for body in ["not json", r#"{"kind":"mqtt"}"#, r#"{"type":""}"#] {
            let response = empty_app()
                .oneshot(post_devices(body))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        }
    }

    #[tokio::test]
    async fn test_provisioning_failure_is_internal_error() {
        let mut repo = MockDeviceRepository::new();
        repo.expect_get_device().returning(|_| Ok(None));
        let mut streams = MockStreamProvisioner::new();
        streams
            .expect_ensure_stream()
            .returning(|_, _| Err(DomainError::StreamError(anyhow::anyhow!("nats down"))));

        let response = app(repo, streams, MockContainerRuntime::new())
            .oneshot(post_devices(r#"{"type":"mqtt"}"#))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(body.contains("nats down"));
    }

    #[tokio::test]
    async fn test_list_devices_empty() {
        let mut repo = MockDeviceRepository::new();
        repo.expect_list_devices().returning(|| Ok(vec![]));

        let response = app(repo, MockStreamProvisioner::new(), MockContainerRuntime::new())
            .oneshot(Request::get("/devices").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"[]");
    }

    #[tokio::test]
    async fn test_delete_unknown_device_is_not_found() {
        let mut repo = MockDeviceRepository::new();
        repo.expect_get_device().returning(|_| Ok(None));

        let response = app(repo, MockStreamProvisioner::new(), MockContainerRuntime::new())
            .oneshot(
                Request::delete("/devices/NOPE")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_device_is_no_content() {
        let mut repo = MockDeviceRepository::new();
        repo.expect_get_device().returning(|id| {
            let names = device_orchestrator::domain::DeviceNames::for_device(id);
            Ok(Some(stored(CreateDeviceRepoInput {
                device_id: id.to_string(),
                device_type: "mqtt".to_string(),
                image: "adapter-mqtt:latest".to_string(),
                messaging_subject: names.messaging_subject,
                container_name: names.container_name,
                container_url: "mqtt://localhost:1883".to_string(),
                status: DeviceStatus::Running,
                credentials: None,
            })))
        });
        repo.expect_update_device()
            .withf(|input| input.status == DeviceStatus::Stopped)
            .returning(|input| {
                let names = device_orchestrator::domain::DeviceNames::for_device(&input.device_id);
                Ok(stored(CreateDeviceRepoInput {
                    device_id: input.device_id.clone(),
                    device_type: "mqtt".to_string(),
                    image: "adapter-mqtt:latest".to_string(),
                    messaging_subject: names.messaging_subject,
                    container_name: names.container_name,
                    container_url: "mqtt://localhost:1883".to_string(),
                    status: DeviceStatus::Stopped,
                    credentials: None,
                }))
            });
        let mut runtime = MockContainerRuntime::new();
        runtime
            .expect_stop_and_remove_container()
            .returning(|_| Ok(()));

        let response = app(repo, MockStreamProvisioner::new(), runtime)
            .oneshot(
                Request::delete("/devices/ABC")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
