use crate::domain::{
    CreateDeviceRepoInput, Device, DeviceCredentials, DeviceRepository, DeviceStatus,
    DomainError, DomainResult, UpdateDeviceRepoInput,
};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use tracing::{debug, instrument};

const DEVICE_COLUMNS: &str = "device_id, device_type, image, messaging_subject, container_name, \
     container_id, container_url, status, mqtt_user, mqtt_password, created_at, updated_at";

/// PostgreSQL unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Device row for PostgreSQL storage with timestamp metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRow {
    pub device_id: String,
    pub device_type: String,
    pub image: String,
    pub messaging_subject: String,
    pub container_name: String,
    pub container_id: String,
    pub container_url: String,
    pub status: String,
    pub mqtt_user: Option<String>,
    pub mqtt_password: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Row> for DeviceRow {
    fn from(row: &Row) -> Self {
        DeviceRow {
            device_id: row.get(0),
            device_type: row.get(1),
            image: row.get(2),
            messaging_subject: row.get(3),
            container_name: row.get(4),
            container_id: row.get(5),
            container_url: row.get(6),
            status: row.get(7),
            mqtt_user: row.get(8),
            mqtt_password: row.get(9),
            created_at: row.get(10),
            updated_at: row.get(11),
        }
    }
}

/// Convert database DeviceRow to domain Device
impl TryFrom<DeviceRow> for Device {
    type Error = DomainError;

    fn try_from(row: DeviceRow) -> Result<Self, Self::Error> {
        let credentials = match (row.mqtt_user, row.mqtt_password) {
            (Some(mqtt_user), Some(mqtt_password)) => Some(DeviceCredentials {
                mqtt_user,
                mqtt_password,
            }),
            _ => None,
        };

        Ok(Device {
            status: row.status.parse::<DeviceStatus>()?,
            device_id: row.device_id,
            device_type: row.device_type,
            image: row.image,
            messaging_subject: row.messaging_subject,
            container_name: row.container_name,
            container_id: row.container_id,
            container_url: row.container_url,
            credentials,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn rows_to_devices(rows: &[Row]) -> DomainResult<Vec<Device>> {
    rows.iter()
        .map(|row| Device::try_from(DeviceRow::from(row)))
        .collect()
}

/// PostgreSQL implementation of DeviceRepository trait
#[derive(Clone)]
pub struct PostgresDeviceRepository {
    client: PostgresClient,
}

impl PostgresDeviceRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeviceRepository for PostgresDeviceRepository {
    #[instrument(skip(self, input), fields(device_id = %input.device_id, device_type = %input.device_type))]
    async fn create_device(&self, input: CreateDeviceRepoInput) -> DomainResult<Device> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let now = Utc::now();
        let (mqtt_user, mqtt_password) = match &input.credentials {
            Some(creds) => (Some(&creds.mqtt_user), Some(&creds.mqtt_password)),
            None => (None, None),
        };
        let status = input.status.as_str();

        let result = conn
            .execute(
                "INSERT INTO devices (device_id, device_type, image, messaging_subject, container_name,
                                      container_id, container_url, status, mqtt_user, mqtt_password,
                                      created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, '', $6, $7, $8, $9, $10, $11)",
                &[
                    &input.device_id,
                    &input.device_type,
                    &input.image,
                    &input.messaging_subject,
                    &input.container_name,
                    &input.container_url,
                    &status,
                    &mqtt_user,
                    &mqtt_password,
                    &now,
                    &now,
                ],
            )
            .await;

        if let Err(e) = result {
            if let Some(db_err) = e.as_db_error() {
                if db_err.code().code() == UNIQUE_VIOLATION {
                    return Err(DomainError::DeviceAlreadyExists(input.device_id));
                }
            }
            return Err(DomainError::RepositoryError(e.into()));
        }

        debug!("registered device: {}", input.device_id);

        Ok(Device {
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
        })
    }

    #[instrument(skip(self), fields(device_id = %device_id))]
    async fn get_device(&self, device_id: &str) -> DomainResult<Option<Device>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                &format!("SELECT {} FROM devices WHERE device_id = $1", DEVICE_COLUMNS),
                &[&device_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        row.map(|row| Device::try_from(DeviceRow::from(&row)))
            .transpose()
    }

    #[instrument(skip(self))]
    async fn list_devices(&self) -> DomainResult<Vec<Device>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                &format!(
                    "SELECT {} FROM devices ORDER BY created_at DESC",
                    DEVICE_COLUMNS
                ),
                &[],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("found {} devices", rows.len());
        rows_to_devices(&rows)
    }

    #[instrument(skip(self), fields(status = %status))]
    async fn list_devices_by_status(&self, status: DeviceStatus) -> DomainResult<Vec<Device>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                &format!(
                    "SELECT {} FROM devices WHERE status = $1 ORDER BY created_at ASC",
                    DEVICE_COLUMNS
                ),
                &[&status.as_str()],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("found {} devices with status {}", rows.len(), status);
        rows_to_devices(&rows)
    }

    #[instrument(skip(self, input), fields(device_id = %input.device_id, status = %input.status))]
    async fn update_device(&self, input: UpdateDeviceRepoInput) -> DomainResult<Device> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let now = Utc::now();
        let status = input.status.as_str();

        let row = conn
            .query_opt(
                &format!(
                    "UPDATE devices SET container_id = $2, status = $3, updated_at = $4
                     WHERE device_id = $1
                     RETURNING {}",
                    DEVICE_COLUMNS
                ),
                &[&input.device_id, &input.container_id, &status, &now],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        match row {
            Some(row) => Device::try_from(DeviceRow::from(&row)),
            None => Err(DomainError::DeviceNotFound(input.device_id)),
        }
    }

    #[instrument(skip(self), fields(device_id = %device_id))]
    async fn delete_device(&self, device_id: &str) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let deleted = conn
            .execute("DELETE FROM devices WHERE device_id = $1", &[&device_id])
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        if deleted == 0 {
            return Err(DomainError::DeviceNotFound(device_id.to_string()));
        }

        debug!("deleted device: {}", device_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, user: Option<&str>, password: Option<&str>) -> DeviceRow {
        let now = Utc::now();
        DeviceRow {
            device_id: "ABC".to_string(),
            device_type: "mqtt".to_string(),
            image: "adapter-mqtt:latest".to_string(),
            messaging_subject: "devices.ABC.telemetry".to_string(),
            container_name: "adapter-ABC".to_string(),
            container_id: "c1".to_string(),
            container_url: "mqtt://localhost:1883".to_string(),
            status: status.to_string(),
            mqtt_user: user.map(str::to_string),
            mqtt_password: password.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_row_with_credentials_converts() {
        let device = Device::try_from(row("running", Some("ABC"), Some("secret"))).unwrap();
        assert_eq!(device.status, DeviceStatus::Running);
        assert_eq!(
            device.credentials,
            Some(DeviceCredentials {
                mqtt_user: "ABC".to_string(),
                mqtt_password: "secret".to_string(),
            })
        );
    }

    #[test]
    fn test_partial_credentials_are_dropped() {
        let device = Device::try_from(row("stopped", Some("ABC"), None)).unwrap();
        assert_eq!(device.status, DeviceStatus::Stopped);
        assert!(device.credentials.is_none());
    }

    #[test]
    fn test_unknown_status_fails_conversion() {
        let result = Device::try_from(row("exploded", None, None));
        assert!(matches!(result, Err(DomainError::InvalidDeviceStatus(_))));
    }
}
