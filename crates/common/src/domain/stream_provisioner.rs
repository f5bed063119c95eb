use crate::domain::result::DomainResult;
use async_trait::async_trait;

/// Provisions the per-device message-bus stream.
///
/// Both operations are idempotent as part of the contract: ensuring a stream
/// that already exists and deleting one that does not exist both succeed.
/// Implementations resolve those conditions themselves so callers never
/// compare error values.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait StreamProvisioner: Send + Sync {
    /// Create a durable stream bound to exactly one subject, or accept the existing one
    async fn ensure_stream(&self, subject: &str, stream_name: &str) -> DomainResult<()>;

    /// Delete a stream by name; a missing stream is success
    async fn delete_stream(&self, stream_name: &str) -> DomainResult<()>;
}
