use crate::domain::DomainError;
use axum::response::{IntoResponse, Response};
use axum::http::StatusCode;

/// Map a domain error onto the REST status it is reported with
pub fn domain_error_status(error: &DomainError) -> StatusCode {
    match error {
        DomainError::UnsupportedDeviceType(_)
        | DomainError::InvalidDeviceStatus(_)
        | DomainError::InvalidRoutingInput(_) => StatusCode::BAD_REQUEST,

        DomainError::DeviceNotFound(_) => StatusCode::NOT_FOUND,

        DomainError::DeviceAlreadyExists(_)
        | DomainError::ProvisioningFailed { .. }
        | DomainError::PersistenceFailed { .. }
        | DomainError::StreamError(_)
        | DomainError::ContainerRuntimeError(_)
        | DomainError::RepositoryError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Handler error type: the domain error rendered as a plain-text body
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        Self {
            status: domain_error_status(&error),
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_bad_request() {
        let err = DomainError::UnsupportedDeviceType("toaster".to_string());
        assert_eq!(domain_error_status(&err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let err = ApiError::from(DomainError::DeviceNotFound("abc".to_string()));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Device not found: abc");
    }

    #[test]
    fn test_provisioning_failure_is_internal() {
        let err = DomainError::provisioning(
            "abc",
            DomainError::StreamError(anyhow::anyhow!("jetstream unavailable")),
        );
        let api = ApiError::from(err);
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(api.message.contains("jetstream unavailable"));
    }
}
