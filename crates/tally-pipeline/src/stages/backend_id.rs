//! Backend process identity.
//!
//! Each server process carries an identity string (configured, or generated
//! at boot) that is echoed in the `X-Backend-ID` response header so a
//! client report can be traced back to the exact process that served it.

use std::sync::Arc;

use http::HeaderValue;

use crate::decorator::{Decorator, Dispatch};

/// Response header carrying the backend process identity.
pub const BACKEND_ID_HEADER: &str = "x-backend-id";

/// Decorator that stamps replies with the process identity.
#[derive(Debug, Clone)]
pub struct BackendIdDecorator {
    header_value: HeaderValue,
}

impl BackendIdDecorator {
    /// Creates the decorator for the given backend identity.
    ///
    /// # Errors
    ///
    /// Returns the invalid identity back if it cannot be used as a header
    /// value; callers treat that as a configuration error at boot.
    pub fn new(backend_id: &str) -> Result<Self, String> {
        HeaderValue::from_str(backend_id)
            .map(|header_value| Self { header_value })
            .map_err(|_| backend_id.to_string())
    }
}

impl Decorator for BackendIdDecorator {
    fn name(&self) -> &'static str {
        "backend-id"
    }

    fn wrap(&self, next: Dispatch) -> Dispatch {
        let header_value = self.header_value.clone();
        Arc::new(move |request, arguments| {
            let next = Arc::clone(&next);
            let header_value = header_value.clone();
            Box::pin(async move {
                let mut reply = next(request, arguments).await;
                reply.headers_mut().insert(BACKEND_ID_HEADER, header_value);
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
    use tally_core::{Arguments, Payload};

    #[tokio::test]
    async fn stamps_the_reply() {
        let decorator = BackendIdDecorator::new("backend-7f").expect("valid id");
        let decorators: Vec<Arc<dyn Decorator>> = vec![Arc::new(decorator)];
        let dispatch = compose(
            &decorators,
            handler(|_request, _arguments| async { (StatusCode::OK, Payload::Empty) }),
        );

        let request = http::Request::builder()
            .uri("/test")
            .body(bytes::Bytes::new())
            .expect("valid request");
        let reply = dispatch(request, Arguments::new()).await;
        assert_eq!(
            reply.headers().get(BACKEND_ID_HEADER).expect("header"),
            "backend-7f"
        );
    }

    #[test]
    fn rejects_unusable_identities() {
        assert!(BackendIdDecorator::new("backend\nid").is_err());
    }
}
