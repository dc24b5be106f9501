//! # Tally Tasks
//!
//! The detached-task primitive the pipeline's design notes call for:
//! fire-and-forget work spawned from inside a request (updating a report
//! after replying to the client, say) must not inherit the request's
//! cancellation, because the request future is dropped the moment the
//! response is written. A [`Spawner`] runs such work under the process-wide shutdown
//! scope instead, and logs errors and panics with the task's name so
//! nothing fails silently.

#![forbid(unsafe_code)]

mod error;
mod spawner;
mod task;

pub use error::TaskError;
pub use spawner::{Spawner, TaskHandle};
pub use task::TaskId;
