//! Runs named long-lived processes side by side and shuts them down together.
//!
//! Every process receives a clone of one `CancellationToken`. The token is
//! cancelled on SIGINT/SIGTERM or as soon as any process fails; closers then
//! run concurrently under a shared timeout and the binary exits.
//!
//! ```no_run
//! use service_io_runner::Runner;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     Runner::new()
//!         .with_named_process("ticker", |token| async move {
//!             loop {
//!                 tokio::select! {
//!                     _ = token.cancelled() => return Ok(()),
//!                     _ = tokio::time::sleep(Duration::from_secs(1)) => tracing::info!("tick"),
//!                 }
//!             }
//!         })
//!         .with_closer(|| async move { Ok(()) })
//!         .with_closer_timeout(Duration::from_secs(5))
//!         .run()
//!         .await;
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

type BoxedResultFuture = Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send>>;

/// A process body: given the shared token, runs until cancelled or failed
pub type AppProcess = Box<dyn FnOnce(CancellationToken) -> BoxedResultFuture + Send>;

/// A shutdown hook run once all processes have stopped
pub type Closer = Box<dyn FnOnce() -> BoxedResultFuture + Send>;

struct NamedProcess {
    name: String,
    process: AppProcess,
}

pub struct Runner {
    processes: Vec<NamedProcess>,
    closers: Vec<Closer>,
    closer_timeout: Duration,
    cancellation_token: CancellationToken,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// No processes, no closers, 10 second closer timeout
    pub fn new() -> Self {
        Self {
            processes: Vec::new(),
            closers: Vec::new(),
            closer_timeout: Duration::from_secs(10),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Add a process identified by `name` in shutdown and failure logs
    pub fn with_named_process<F, Fut>(mut self, name: impl Into<String>, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        self.processes.push(NamedProcess {
            name: name.into(),
            process: Box::new(|token| Box::pin(process(token))),
        });
        self
    }

    /// Add a closer. Closers run even when a process failed; one closer
    /// failing does not prevent the others.
    pub fn with_closer<F, Fut>(mut self, closer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        self.closers.push(Box::new(|| Box::pin(closer())));
        self
    }

    pub fn with_closer_timeout(mut self, timeout: Duration) -> Self {
        self.closer_timeout = timeout;
        self
    }

    /// Share an externally owned token, e.g. one already handed to a service
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Run to completion and exit the binary: status 1 if a process failed, 0 otherwise.
    pub async fn run(self) {
        spawn_signal_handlers(self.cancellation_token.clone());

        match self.execute().await {
            Some(err) => {
                error!("Application exiting with error: {:#}", err);
                std::process::exit(1);
            }
            None => {
                info!("Application exiting normally");
                std::process::exit(0);
            }
        }
    }

    /// Drive processes and closers; returns the first process error, if any.
    async fn execute(self) -> Option<anyhow::Error> {
        let token = self.cancellation_token;
        let mut join_set = JoinSet::new();

        for NamedProcess { name, process } in self.processes {
            let process_token = token.clone();
            join_set.spawn(async move {
                debug!(process = %name, "starting process");
                let result = process(process_token).await;
                (name, result)
            });
        }

        let mut first_error = None;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((name, Ok(()))) => {
                    debug!(process = %name, "process completed");
                }
                Ok((name, Err(err))) => {
                    if !token.is_cancelled() {
                        error!(process = %name, "process failed: {:#}", err);
                        first_error = Some(err.context(format!("process {} failed", name)));
                        token.cancel();
                    } else {
                        debug!(process = %name, "process returned error after cancellation: {:#}", err);
                    }
                }
                Err(err) => {
                    error!("process panicked: {}", err);
                    token.cancel();
                }
            }

            if token.is_cancelled() {
                break;
            }
        }

        // Give the remaining processes their chance to observe the token
        while let Some(joined) = join_set.join_next().await {
            if let Ok((name, result)) = joined {
                debug!(process = %name, ok = result.is_ok(), "process stopped");
            }
        }

        if !self.closers.is_empty() {
            info!("Running closers with timeout of {:?}", self.closer_timeout);
            match tokio::time::timeout(self.closer_timeout, run_closers(self.closers)).await {
                Ok(()) => info!("All closers completed"),
                Err(_) => error!("Closers timed out after {:?}", self.closer_timeout),
            }
        }

        first_error
    }
}

fn spawn_signal_handlers(token: CancellationToken) {
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                ctrl_c_token.cancel();
            }
            Err(err) => error!("Error setting up signal handler: {}", err),
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM signal");
                token.cancel();
            }
            Err(err) => error!("Error setting up SIGTERM handler: {}", err),
        }
    });
}

async fn run_closers(closers: Vec<Closer>) {
    let mut closer_set = JoinSet::new();
    for closer in closers {
        closer_set.spawn(closer());
    }

    while let Some(result) = closer_set.join_next().await {
        match result {
            Ok(Ok(())) => debug!("Closer completed successfully"),
            Ok(Err(err)) => error!("Closer error: {:#}", err),
            Err(err) => error!("Closer panicked: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_failing_process_cancels_siblings_and_runs_closers() {
        let sibling_saw_cancel = Arc::new(AtomicBool::new(false));
        let closer_ran = Arc::new(AtomicBool::new(false));
        let saw = sibling_saw_cancel.clone();
        let ran = closer_ran.clone();

        let err = Runner::new()
            .with_named_process("waiter", move |token| async move {
                token.cancelled().await;
                saw.store(true, Ordering::SeqCst);
                Ok(())
            })
            .with_named_process("broken", |_| async move {
                Err(anyhow::anyhow!("boom"))
            })
            .with_closer(move || async move {
                ran.store(true, Ordering::SeqCst);
                Ok(())
            })
            .execute()
            .await;

        let err = err.expect("expected the failing process error");
        assert!(format!("{:#}", err).contains("broken"));
        assert!(format!("{:#}", err).contains("boom"));
        assert!(sibling_saw_cancel.load(Ordering::SeqCst));
        assert!(closer_ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_external_cancellation_is_clean_exit() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let err = Runner::new()
            .with_cancellation_token(token)
            .with_named_process("api", |token| async move {
                token.cancelled().await;
                Ok(())
            })
            .execute()
            .await;

        assert!(err.is_none());
    }

    #[tokio::test]
    async fn test_all_closers_run_even_if_one_fails() {
        let count = Arc::new(AtomicUsize::new(0));
        let first = count.clone();
        let second = count.clone();

        Runner::new()
            .with_closer(move || async move {
                first.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("closer failed"))
            })
            .with_closer(move || async move {
                second.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .execute()
            .await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_slow_closers_are_abandoned_after_timeout() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        Runner::new()
            .with_closer(move || async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .with_closer_timeout(Duration::from_millis(20))
            .execute()
            .await;

        assert!(!finished.load(Ordering::SeqCst));
    }
}
