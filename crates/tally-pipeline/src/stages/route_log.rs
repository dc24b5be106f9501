//! Request logging.
//!
//! Emits one structured event when a request is received and one when its
//! reply is ready, with method, path, status, and elapsed time. Sits just
//! inside the request-id stage so both events carry the request id through
//! the span.

use std::sync::Arc;
use std::time::Instant;

use crate::decorator::{Decorator, Dispatch};

/// Decorator that logs every request's receipt and completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteLogDecorator;

impl RouteLogDecorator {
    /// Creates the decorator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Decorator for RouteLogDecorator {
    fn name(&self) -> &'static str {
        "route-log"
    }

    fn wrap(&self, next: Dispatch) -> Dispatch {
        Arc::new(move |request, arguments| {
            let next = Arc::clone(&next);
            Box::pin(async move {
                let method = request.method().clone();
                let path = request.uri().path().to_string();
                tracing::info!(%method, %path, "request received");

                let started = Instant::now();
                let reply = next(request, arguments).await;
                let elapsed_ms = started.elapsed().as_millis();

                tracing::info!(
                    %method,
                    %path,
                    status = reply.status().as_u16(),
                    elapsed_ms,
                    "request served"
                );
                reply
            })
        })
    }
}
