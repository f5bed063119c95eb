use anyhow::Result;
use async_nats::jetstream;
use async_trait::async_trait;

/// Outcome of a stream create request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamCreation {
    Created,
    AlreadyExists,
}

/// Outcome of a stream delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDeletion {
    Deleted,
    NotFound,
}

/// Trait for JetStream stream administration
/// "Already exists" and "not found" are reported as outcomes, never as errors
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait JetStreamAdmin: Send + Sync {
    /// Create a stream with the given configuration
    async fn create_stream(&self, config: jetstream::stream::Config) -> Result<StreamCreation>;

    /// Delete a stream by name
    async fn delete_stream(&self, stream_name: &str) -> Result<StreamDeletion>;
}
