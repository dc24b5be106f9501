//! Cross-origin resource sharing.
//!
//! Sets the configured CORS headers unconditionally on every response,
//! including error responses and short-circuited ones, and answers
//! `OPTIONS` preflight requests with `204 No Content` without invoking
//! anything further down the chain.

use std::sync::Arc;

use http::{HeaderValue, Method};
use tally_core::Reply;

use crate::decorator::{Decorator, Dispatch};

/// Decorator that injects CORS headers into every reply.
///
/// # Example
///
/// ```
/// use tally_pipeline::stages::CorsDecorator;
///
/// let cors = CorsDecorator::new()
///     .allow_origin("*")
///     .allow_headers(["Content-Type", "Accept", "Authorization"])
///     .allow_credentials(true);
/// ```
#[derive(Debug, Clone)]
pub struct CorsDecorator {
    allow_origin: String,
    allow_headers: Vec<String>,
    allow_credentials: bool,
}

impl Default for CorsDecorator {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_headers: Vec::new(),
            allow_credentials: false,
        }
    }
}

impl CorsDecorator {
    /// Creates a decorator allowing any origin and no extra headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the allowed origin.
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allow_origin = origin.into();
        self
    }

    /// Sets the allowed request headers.
    #[must_use]
    pub fn allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Sets whether credentialed requests are allowed.
    #[must_use]
    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    fn apply(&self, reply: &mut Reply) {
        let headers = reply.headers_mut();
        if let Ok(origin) = HeaderValue::from_str(&self.allow_origin) {
            headers.insert("access-control-allow-origin", origin);
        }
        if !self.allow_headers.is_empty() {
            if let Ok(allowed) = HeaderValue::from_str(&self.allow_headers.join(", ")) {
                headers.insert("access-control-allow-headers", allowed);
            }
        }
        if self.allow_credentials {
            headers.insert(
                "access-control-allow-credentials",
                HeaderValue::from_static("true"),
            );
        }
    }
}

impl Decorator for CorsDecorator {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn wrap(&self, next: Dispatch) -> Dispatch {
        let config = self.clone();
        Arc::new(move |request, arguments| {
            let next = Arc::clone(&next);
            let config = config.clone();
            Box::pin(async move {
                // Preflight: reply directly, headers only.
                if request.method() == Method::OPTIONS {
                    let mut reply = Reply::no_content();
                    config.apply(&mut reply);
                    return reply;
                }

                let mut reply = next(request, arguments).await;
                config.apply(&mut reply);
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

    fn dispatch_with_cors() -> Dispatch {
        let cors = CorsDecorator::new()
            .allow_origin("*")
            .allow_headers(["Content-Type", "Authorization"])
            .allow_credentials(true);
        let decorators: Vec<Arc<dyn Decorator>> = vec![Arc::new(cors)];
        compose(
            &decorators,
            handler(|_request, _arguments| async {
                (StatusCode::BAD_REQUEST, Payload::error("bad input"))
            }),
        )
    }

    fn request(method: Method) -> tally_core::Request {
        http::Request::builder()
            .method(method)
            .uri("/aws/billrepository")
            .body(bytes::Bytes::new())
            .expect("valid request")
    }

    #[tokio::test]
    async fn headers_are_set_even_on_error_replies() {
        let dispatch = dispatch_with_cors();
        let reply = dispatch(request(Method::POST), Arguments::new()).await;

        assert_eq!(reply.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            reply
                .headers()
                .get("access-control-allow-origin")
                .expect("origin header"),
            "*"
        );
        assert_eq!(
            reply
                .headers()
                .get("access-control-allow-headers")
                .expect("headers header"),
            "Content-Type, Authorization"
        );
        assert_eq!(
            reply
                .headers()
                .get("access-control-allow-credentials")
                .expect("credentials header"),
            "true"
        );
    }

    #[tokio::test]
    async fn preflight_short_circuits_with_no_content() {
        let dispatch = dispatch_with_cors();
        let reply = dispatch(request(Method::OPTIONS), Arguments::new()).await;

        assert_eq!(reply.status(), StatusCode::NO_CONTENT);
        assert_eq!(reply.payload(), &Payload::Empty);
        assert!(reply.headers().contains_key("access-control-allow-origin"));
    }
}
