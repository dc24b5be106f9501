//! The detached task spawner.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::TaskError;
use crate::task::TaskId;

/// Spawns background work decoupled from request lifetimes.
///
/// Work started here keeps running after the reply that triggered it has
/// been written; its cancellation scope is the process-wide shutdown, not
/// the request. Every outcome (completion, failure, panic, shutdown) is
/// logged with the task's name and ID.
///
/// # Example
///
/// ```
/// # tokio_test::block_on(async {
/// use tally_tasks::Spawner;
///
/// let spawner = Spawner::new();
/// let handle = spawner.spawn("report-update", async {
///     Ok::<(), std::io::Error>(())
/// });
/// handle.join().await.expect("task completed");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Spawner {
    shutdown_tx: watch::Sender<bool>,
    active: Arc<AtomicUsize>,
}

impl Default for Spawner {
    fn default() -> Self {
        Self::new()
    }
}

impl Spawner {
    /// Creates a spawner with its own shutdown scope.
    #[must_use]
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shutdown_tx,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Spawns `work` as a detached task.
    ///
    /// The task runs to completion unless the spawner's shutdown fires
    /// first. Errors and panics are contained and logged; they never
    /// propagate into the spawning request.
    pub fn spawn<F, E>(&self, name: impl Into<String>, work: F) -> TaskHandle
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let name = name.into();
        let id = TaskId::new();
        let mut shutdown = self.shutdown_tx.subscribe();
        let active = Arc::clone(&self.active);
        active.fetch_add(1, Ordering::SeqCst);

        let handle = tokio::spawn(async move {
            let outcome = tokio::select! {
                result = AssertUnwindSafe(work).catch_unwind() => match result {
                    Ok(Ok(())) => {
                        tracing::debug!(task = %name, task_id = %id, "detached task completed");
                        Ok(())
                    }
                    Ok(Err(err)) => {
                        tracing::error!(task = %name, task_id = %id, error = %err, "detached task failed");
                        Err(TaskError::Failed(err.to_string()))
                    }
                    Err(_) => {
                        tracing::error!(task = %name, task_id = %id, "detached task panicked");
                        Err(TaskError::Panicked)
                    }
                },
                _ = shutdown.changed() => {
                    tracing::warn!(task = %name, task_id = %id, "detached task cancelled by shutdown");
                    Err(TaskError::Cancelled)
                }
            };
            active.fetch_sub(1, Ordering::SeqCst);
            outcome
        });

        TaskHandle { id, handle }
    }

    /// Fires the shutdown scope; pending tasks resolve to
    /// [`TaskError::Cancelled`].
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Number of tasks currently in flight.
    #[must_use]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// A handle to one detached task.
///
/// Dropping the handle does not cancel the task; that is the point of
/// detachment. Join it to observe the outcome, or let it run.
#[derive(Debug)]
pub struct TaskHandle {
    id: TaskId,
    handle: JoinHandle<Result<(), TaskError>>,
}

impl TaskHandle {
    /// The task's ID.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Whether the task has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the task and returns its outcome.
    pub async fn join(self) -> Result<(), TaskError> {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => Err(TaskError::Panicked),
            Err(_) => Err(TaskError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn completed_task_joins_ok() {
        let spawner = Spawner::new();
        let handle = spawner.spawn("noop", async { Ok::<(), std::io::Error>(()) });
        assert!(handle.join().await.is_ok());
        assert_eq!(spawner.active(), 0);
    }

    #[tokio::test]
    async fn failing_task_is_contained() {
        let spawner = Spawner::new();
        let handle = spawner.spawn("failing", async {
            Err::<(), _>(std::io::Error::other("no such bucket"))
        });
        match handle.join().await {
            Err(TaskError::Failed(message)) => assert!(message.contains("no such bucket")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    async fn boom() -> Result<(), std::io::Error> {
        panic!("boom")
    }

    #[tokio::test]
    async fn panicking_task_is_contained() {
        let spawner = Spawner::new();
        let handle = spawner.spawn("panicking", boom());
        assert!(matches!(handle.join().await, Err(TaskError::Panicked)));
    }

    #[tokio::test]
    async fn shutdown_cancels_pending_tasks() {
        let spawner = Spawner::new();
        let handle = spawner.spawn("sleeper", async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<(), std::io::Error>(())
        });
        spawner.shutdown();
        assert!(matches!(handle.join().await, Err(TaskError::Cancelled)));
        assert_eq!(spawner.active(), 0);
    }

    #[tokio::test]
    async fn tasks_outlive_their_spawning_scope() {
        let spawner = Spawner::new();
        let handle = {
            // Simulates a handler spawning work and returning immediately.
            let spawner = spawner.clone();
            spawner.spawn("outliving", async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok::<(), std::io::Error>(())
            })
        };
        assert!(handle.join().await.is_ok());
    }
}
