//! Request-body extraction and validation.
//!
//! [`RequestContentType`] gates a route on its declared `Content-Type`
//! header (exact match). [`RequestBody`] decodes the JSON body into the
//! declared shape and runs its structural validation tags; the decoded
//! value lands in the argument bag and the handler takes ownership of it
//! with [`take_body`]. Any failure short-circuits with a client error
//! naming the violated constraint, before the handler runs.

use std::sync::Arc;

use http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use validator::Validate;

use tally_core::{ArgKey, Arguments, Reply};
use tally_docs::RouteDocumentation;
use tally_pipeline::{Decorator, Dispatch};

use crate::error::ExtractError;

/// The bag key a decoded body of type `T` is stored under.
#[must_use]
pub fn body_key<T: Send + Sync + 'static>() -> ArgKey<T> {
    ArgKey::new("request-body")
}

/// Takes ownership of the decoded request body out of the bag.
///
/// # Panics
///
/// Panics if no `RequestBody<T>` decorator ran for this request; that is
/// a registration-time composition bug, not a runtime condition.
pub fn take_body<T: Send + Sync + 'static>(arguments: &mut Arguments) -> T {
    match arguments.take(&body_key::<T>()) {
        Some(body) => body,
        None => panic!(
            "request body of type {} expected but never decoded",
            std::any::type_name::<T>()
        ),
    }
}

/// Decorator gating a route on its declared content types.
///
/// The incoming `Content-Type` header must exactly match one of the
/// accepted values; anything else (including an absent header) is answered
/// with `415` before the handler runs.
pub struct RequestContentType(pub Vec<String>);

impl RequestContentType {
    /// Accepts exactly `application/json`.
    #[must_use]
    pub fn json() -> Self {
        Self(vec!["application/json".to_string()])
    }
}

impl Decorator for RequestContentType {
    fn name(&self) -> &'static str {
        "request-content-type"
    }

    fn wrap(&self, next: Dispatch) -> Dispatch {
        let accepted = self.0.clone();
        Arc::new(move |request, arguments| {
            let next = Arc::clone(&next);
            let accepted = accepted.clone();
            Box::pin(async move {
                let matches = request
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .is_some_and(|value| accepted.iter().any(|a| a == value));

                if matches {
                    next(request, arguments).await
                } else {
                    let err = ExtractError::UnsupportedContentType { expected: accepted };
                    Reply::error(err.status(), err.to_string())
                }
            })
        })
    }

    fn document(&self, doc: &mut RouteDocumentation) {
        doc.content_types = self.0.clone();
    }
}

/// Decorator decoding and validating the request body as `T`.
///
/// Carries an example value of `T` that is published verbatim in the
/// documentation catalogue as the route's example request body.
pub struct RequestBody<T> {
    example: T,
}

impl<T> RequestBody<T>
where
    T: DeserializeOwned + Serialize + Validate + Send + Sync + 'static,
{
    /// Creates the decorator with the documentation example.
    #[must_use]
    pub fn new(example: T) -> Self {
        Self { example }
    }
}

impl<T> Decorator for RequestBody<T>
where
    T: DeserializeOwned + Serialize + Validate + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "request-body"
    }

    fn wrap(&self, next: Dispatch) -> Dispatch {
        Arc::new(move |request, mut arguments| {
            let next = Arc::clone(&next);
            Box::pin(async move {
                let decoded: T = match serde_json::from_slice(request.body()) {
                    Ok(decoded) => decoded,
                    Err(err) => {
                        let err = ExtractError::MalformedBody(err.to_string());
                        return Reply::error(err.status(), err.to_string());
                    }
                };

                if let Err(errors) = decoded.validate() {
                    let err = first_violation(&errors);
                    return Reply::error(err.status(), err.to_string());
                }

                arguments.set(&body_key::<T>(), decoded);
                next(request, arguments).await
            })
        })
    }

    fn document(&self, doc: &mut RouteDocumentation) {
        doc.body_example = serde_json::to_value(&self.example).ok();
    }
}

/// Picks the first violated field constraint, deterministically, so the
/// client error names a single concrete problem.
fn first_violation(errors: &validator::ValidationErrors) -> ExtractError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| field.to_string());

    match fields.first() {
        Some((field, violations)) => {
            let detail = violations
                .first()
                .map(|violation| match &violation.message {
                    Some(message) => message.to_string(),
                    None => format!("violates the '{}' constraint", violation.code),
                })
                .unwrap_or_else(|| "invalid value".to_string());
            ExtractError::InvalidBodyField {
                field: field.to_string(),
                detail,
            }
        }
        None => ExtractError::MalformedBody("validation failed".to_string()),
    }
}
