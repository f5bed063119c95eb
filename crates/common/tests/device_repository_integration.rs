#![cfg(feature = "integration-tests")]

use common::domain::{
    CreateDeviceRepoInput, DeviceCredentials, DeviceRepository, DeviceStatus, DomainError,
    UpdateDeviceRepoInput,
};
use common::postgres::{PostgresClient, PostgresDeviceRepository};
use goose::MigrationRunner;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;

async fn setup_test_db() -> (ContainerAsync<Postgres>, PostgresDeviceRepository) {
    let postgres = Postgres::default().start().await.unwrap();
    let host = postgres.get_host().await.unwrap();
    let port = postgres.get_host_port_ipv4(5432).await.unwrap();

    let migrations_dir = format!(
        "{}/../service_io/migrations/postgres",
        env!("CARGO_MANIFEST_DIR")
    );
    let dsn = format!(
        "postgres://postgres:postgres@{}:{}/postgres?sslmode=disable",
        host, port
    );
    let goose_path = which::which("goose").expect("goose binary not found");

    MigrationRunner::new(
        goose_path.to_string_lossy().to_string(),
        migrations_dir,
        "postgres".to_string(),
        dsn,
    )
    .run_migrations()
    .await
    .expect("Migrations failed");

    let client = PostgresClient::new(
        &host.to_string(),
        port,
        "postgres",
        "postgres",
        "postgres",
        5,
    )
    .expect("Failed to create client");

    (postgres, PostgresDeviceRepository::new(client))
}

fn input(device_id: &str, credentials: Option<DeviceCredentials>) -> CreateDeviceRepoInput {
    CreateDeviceRepoInput {
        device_id: device_id.to_string(),
        device_type: "mqtt".to_string(),
        image: "adapter-mqtt:latest".to_string(),
        messaging_subject: format!("devices.{}.telemetry", device_id),
        container_name: format!("adapter-{}", device_id),
        container_url: "mqtt://localhost:1883".to_string(),
        status: DeviceStatus::Running,
        credentials,
    }
}

#[tokio::test]
async fn test_create_and_get_device() {
    let (_container, repo) = setup_test_db().await;

    let credentials = DeviceCredentials {
        mqtt_user: "DEV1".to_string(),
        mqtt_password: "s3cretpassword00".to_string(),
    };
    let created = repo
        .create_device(input("DEV1", Some(credentials.clone())))
        .await
        .unwrap();
    assert_eq!(created.container_id, "");

    let fetched = repo.get_device("DEV1").await.unwrap().unwrap();
    assert_eq!(fetched.device_id, "DEV1");
    assert_eq!(fetched.messaging_subject, "devices.DEV1.telemetry");
    assert_eq!(fetched.status, DeviceStatus::Running);
    assert_eq!(fetched.credentials, Some(credentials));
}

#[tokio::test]
async fn test_get_missing_device_returns_none() {
    let (_container, repo) = setup_test_db().await;
    assert!(repo.get_device("NOPE").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_id_is_already_exists() {
    let (_container, repo) = setup_test_db().await;

    repo.create_device(input("DUP", None)).await.unwrap();
    let result = repo.create_device(input("DUP", None)).await;

    assert!(matches!(result, Err(DomainError::DeviceAlreadyExists(id)) if id == "DUP"));
}

#[tokio::test]
async fn test_update_and_list_by_status() {
    let (_container, repo) = setup_test_db().await;

    repo.create_device(input("A", None)).await.unwrap();
    repo.create_device(input("B", None)).await.unwrap();

    let updated = repo
        .update_device(UpdateDeviceRepoInput {
            device_id: "A".to_string(),
            container_id: "abc123".to_string(),
            status: DeviceStatus::Running,
        })
        .await
        .unwrap();
    assert_eq!(updated.container_id, "abc123");

    repo.update_device(UpdateDeviceRepoInput {
        device_id: "B".to_string(),
        container_id: String::new(),
        status: DeviceStatus::Stopped,
    })
    .await
    .unwrap();

    let running = repo
        .list_devices_by_status(DeviceStatus::Running)
        .await
        .unwrap();
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].device_id, "A");

    let all = repo.list_devices().await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_update_missing_device_is_not_found() {
    let (_container, repo) = setup_test_db().await;

    let result = repo
        .update_device(UpdateDeviceRepoInput {
            device_id: "GHOST".to_string(),
            container_id: String::new(),
            status: DeviceStatus::Stopped,
        })
        .await;

    assert!(matches!(result, Err(DomainError::DeviceNotFound(_))));
}

#[tokio::test]
async fn test_delete_device() {
    let (_container, repo) = setup_test_db().await;

    repo.create_device(input("GONE", None)).await.unwrap();
    repo.delete_device("GONE").await.unwrap();

    assert!(repo.get_device("GONE").await.unwrap().is_none());
    assert!(matches!(
        repo.delete_device("GONE").await,
        Err(DomainError::DeviceNotFound(_))
    ));
}
