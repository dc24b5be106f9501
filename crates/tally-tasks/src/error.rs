//! Task failure types.

/// Why a detached task did not complete normally.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The task returned an error of its own.
    #[error("task failed: {0}")]
    Failed(String),

    /// The task panicked; the panic was contained and logged.
    #[error("task panicked")]
    Panicked,

    /// The task was cut short by process shutdown.
    #[error("task cancelled by shutdown")]
    Cancelled,
}
