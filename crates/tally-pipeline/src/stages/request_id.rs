//! Request identification.
//!
//! Attaches a fresh [`RequestId`] to every incoming request: stores it in
//! the argument bag, threads it through the tracing span so every log line
//! emitted downstream carries it, and echoes it in the `X-Request-ID`
//! response header, on every response including short-circuited ones.

use std::sync::Arc;

use tracing::Instrument;

use tally_core::{ArgKey, RequestId};

use crate::decorator::{Decorator, Dispatch};

/// Bag key under which the request ID is stored.
pub static REQUEST_ID: ArgKey<RequestId> = ArgKey::new("request-id");

/// Response header carrying the request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Decorator that assigns each request its identifier.
///
/// Must be the outermost stage of the global composition so that every
/// request, including ones rejected by inner decorators, is identified.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdDecorator;

impl RequestIdDecorator {
    /// Creates the decorator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Decorator for RequestIdDecorator {
    fn name(&self) -> &'static str {
        "request-id"
    }

    fn wrap(&self, next: Dispatch) -> Dispatch {
        Arc::new(move |request, mut arguments| {
            let next = Arc::clone(&next);
            Box::pin(async move {
                let request_id = RequestId::new();
                arguments.set(&REQUEST_ID, request_id);

                let span = tracing::info_span!("request", request_id = %request_id);
                let mut reply = next(request, arguments).instrument(span).await;

                reply.headers_mut().insert(
                    REQUEST_ID_HEADER,
                    request_id
                        .to_string()
                        .parse()
                        .expect("uuid is a valid header value"),
                );
                reply
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorator::{compose, handler};
    use http::StatusCode;
    use std::sync::Mutex;
    use tally_core::{Arguments, Payload, Reply};
    use uuid::Uuid;

    fn request() -> tally_core::Request {
        http::Request::builder()
            .uri("/test")
            .body(bytes::Bytes::new())
            .expect("valid request")
    }

    #[tokio::test]
    async fn sets_header_and_bag_entry() {
        let seen = Arc::new(Mutex::new(None));
        let seen_in_handler = Arc::clone(&seen);
        let decorators: Vec<Arc<dyn Decorator>> = vec![Arc::new(RequestIdDecorator::new())];
        let dispatch = compose(
            &decorators,
            handler(move |_request, arguments: Arguments| {
                let seen = Arc::clone(&seen_in_handler);
                async move {
                    *seen.lock().unwrap() = Some(*arguments.expect(&REQUEST_ID));
                    (StatusCode::OK, Payload::Empty)
                }
            }),
        );

        let reply = dispatch(request(), Arguments::new()).await;

        let header = reply
            .headers()
            .get(REQUEST_ID_HEADER)
            .expect("header present")
            .to_str()
            .expect("ascii header");
        assert!(Uuid::parse_str(header).is_ok());

        let in_bag = seen.lock().unwrap().expect("handler saw the id");
        assert_eq!(in_bag.to_string(), header);
    }

    #[tokio::test]
    async fn short_circuited_replies_also_get_the_header() {
        struct Refuse;
        impl Decorator for Refuse {
            fn name(&self) -> &'static str {
                "refuse"
            }
            fn wrap(&self, _next: Dispatch) -> Dispatch {
                Arc::new(|_request, _arguments| {
                    Box::pin(async { Reply::error(StatusCode::UNAUTHORIZED, "no") })
                })
            }
        }

        let decorators: Vec<Arc<dyn Decorator>> =
            vec![Arc::new(RequestIdDecorator::new()), Arc::new(Refuse)];
        let dispatch = compose(
            &decorators,
            handler(|_request, _arguments| async { (StatusCode::OK, Payload::Empty) }),
        );

        let reply = dispatch(request(), Arguments::new()).await;
        assert_eq!(reply.status(), StatusCode::UNAUTHORIZED);
        assert!(reply.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn each_request_gets_a_fresh_id() {
        let decorators: Vec<Arc<dyn Decorator>> = vec![Arc::new(RequestIdDecorator::new())];
        let dispatch = compose(
            &decorators,
            handler(|_request, _arguments| async { (StatusCode::OK, Payload::Empty) }),
        );

        let first = dispatch(request(), Arguments::new()).await;
        let second = dispatch(request(), Arguments::new()).await;
        assert_ne!(
            first.headers().get(REQUEST_ID_HEADER),
            second.headers().get(REQUEST_ID_HEADER)
        );
    }
}
