use common::domain::DomainResult;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Runs cleanup steps whose failure must never abort the caller.
///
/// Failures are logged at warn and counted.
#[derive(Debug, Default)]
pub struct BestEffort {
    failures: AtomicU64,
}

impl BestEffort {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run<F>(&self, operation: &str, device_id: &str, step: F)
    where
        F: Future<Output = DomainResult<()>>,
    {
        match step.await {
            Ok(()) => debug!(operation = %operation, device_id = %device_id, "cleanup step succeeded"),
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    operation = %operation,
                    device_id = %device_id,
                    error = %e,
                    "best-effort {} failed for device {}",
                    operation,
                    device_id
                );
            }
        }
    }

    /// Failed steps since construction
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}
