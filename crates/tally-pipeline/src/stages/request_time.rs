//! Request receipt timestamp.
//!
//! Records the time the request entered the pipeline into the argument bag
//! and the logging context, for handlers and decorators that need the
//! receipt time rather than their own clock reads.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use tally_core::ArgKey;

use crate::decorator::{Decorator, Dispatch};

/// Bag key under which the receipt time is stored.
pub static REQUEST_TIME: ArgKey<DateTime<Utc>> = ArgKey::new("request-time");

/// Decorator that timestamps each request on receipt.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestTimeDecorator;

impl RequestTimeDecorator {
    /// Creates the decorator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Decorator for RequestTimeDecorator {
    fn name(&self) -> &'static str {
        "request-time"
    }

    fn wrap(&self, next: Dispatch) -> Dispatch {
        Arc::new(move |request, mut arguments| {
            let next = Arc::clone(&next);
            Box::pin(async move {
                let received_at = Utc::now();
                arguments.set(&REQUEST_TIME, received_at);
                tracing::trace!(received_at = %received_at.to_rfc3339(), "request timestamped");
                next(request, arguments).await
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorator::{compose, handler};
    use http::StatusCode;
    use tally_core::{Arguments, Payload};

    #[tokio::test]
    async fn receipt_time_is_visible_to_the_handler() {
        let decorators: Vec<Arc<dyn Decorator>> = vec![Arc::new(RequestTimeDecorator::new())];
        let before = Utc::now();
        let dispatch = compose(
            &decorators,
            handler(move |_request, arguments: Arguments| async move {
                let received_at = *arguments.expect(&REQUEST_TIME);
                assert!(received_at >= before);
                assert!(received_at <= Utc::now());
                (StatusCode::OK, Payload::Empty)
            }),
        );

        let request = http::Request::builder()
            .uri("/test")
            .body(bytes::Bytes::new())
            .expect("valid request");
        let reply = dispatch(request, Arguments::new()).await;
        assert_eq!(reply.status(), StatusCode::OK);
    }
}
