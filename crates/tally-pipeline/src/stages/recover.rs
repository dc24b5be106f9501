//! Panic isolation.
//!
//! Converts an abrupt failure (panic) anywhere downstream into a plain
//! `500` reply with a non-leaking message, so one request's failure never
//! takes other in-flight requests down and clients always receive the
//! standard envelope. Part of the default global composition.

use std::sync::Arc;

use futures_util::FutureExt;
use http::StatusCode;
use tally_core::Reply;

use crate::decorator::{Decorator, Dispatch};

/// Decorator that turns downstream panics into `500` replies.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoverDecorator;

impl RecoverDecorator {
    /// Creates the decorator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Decorator for RecoverDecorator {
    fn name(&self) -> &'static str {
        "recover"
    }

    fn wrap(&self, next: Dispatch) -> Dispatch {
        Arc::new(move |request, arguments| {
            let next = Arc::clone(&next);
            Box::pin(async move {
                match std::panic::AssertUnwindSafe(next(request, arguments))
                    .catch_unwind()
                    .await
                {
                    Ok(reply) => reply,
                    Err(panic) => {
                        let detail = panic_message(panic.as_ref());
                        tracing::error!(panic = %detail, "request handler panicked");
                        Reply::error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
                    }
                }
            })
        })
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
