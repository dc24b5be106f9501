//! Request and reply types for the dispatch pipeline.
//!
//! The transport adapter collects the request body up front, so the
//! pipeline sees a [`Request`] whose body is plain [`Bytes`]. Handlers and
//! decorators produce a [`Reply`]: a status code, response headers, and a
//! [`Payload`] that the transport serializes as JSON at the boundary.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde_json::Value;

use crate::error::ErrorBody;

/// The HTTP request type seen by decorators and handlers.
pub type Request = http::Request<Bytes>;

/// What a base handler returns: a status code and a payload.
///
/// Headers are the business of decorators, not handlers, so the handler
/// contract stays a plain `(status, payload)` pair.
pub type HandlerResult = (StatusCode, Payload);

/// The body of a reply, before serialization.
///
/// Success payloads carry arbitrary serializable data. Error payloads carry
/// only a message and always serialize to the `{"error": "<message>"}`
/// envelope, never to a bare string, so clients can rely on one stable
/// error shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A serializable success value.
    Data(Value),
    /// An error message, serialized as the standard envelope.
    Error(String),
    /// No body at all (e.g. a 204 preflight reply).
    Empty,
}

impl Payload {
    /// Creates an error payload from any displayable message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// Renders the payload to the JSON value written on the wire.
    ///
    /// Returns `None` for [`Payload::Empty`], meaning no body is written.
    #[must_use]
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Self::Data(value) => Some(value.clone()),
            Self::Error(message) => {
                Some(serde_json::to_value(ErrorBody::new(message)).expect("serialize error body"))
            }
            Self::Empty => None,
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Data(value)
    }
}

/// A complete reply: status code, response headers, payload.
///
/// Every dispatchable function returns exactly one `Reply`, whether the
/// request succeeded, failed validation, or was short-circuited by a
/// decorator.
#[derive(Debug)]
pub struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    payload: Payload,
}

impl Reply {
    /// Creates a reply with the given status and payload and no headers.
    #[must_use]
    pub fn new(status: StatusCode, payload: Payload) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            payload,
        }
    }

    /// Creates a `200 OK` reply carrying `value`.
    #[must_use]
    pub fn ok(value: Value) -> Self {
        Self::new(StatusCode::OK, Payload::Data(value))
    }

    /// Creates an error reply with the standard envelope.
    #[must_use]
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, Payload::Error(message.into()))
    }

    /// Creates a bodyless `204 No Content` reply.
    #[must_use]
    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT, Payload::Empty)
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the response headers for modification.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the payload.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Splits the reply into its parts for serialization.
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Payload) {
        (self.status, self.headers, self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn data_payload_renders_as_is() {
        let payload = Payload::Data(json!({"bucket": "my-bucket"}));
        assert_eq!(payload.to_json(), Some(json!({"bucket": "my-bucket"})));
    }

    #[test]
    fn error_payload_renders_the_envelope() {
        let payload = Payload::error("bucket name shall be no shorter than 3 chars");
        assert_eq!(
            payload.to_json(),
            Some(json!({"error": "bucket name shall be no shorter than 3 chars"}))
        );
    }

    #[test]
    fn empty_payload_renders_no_body() {
        assert_eq!(Payload::Empty.to_json(), None);
    }

    #[test]
    fn reply_constructors() {
        let ok = Reply::ok(json!([1, 2, 3]));
        assert_eq!(ok.status(), StatusCode::OK);

        let err = Reply::error(StatusCode::BAD_REQUEST, "bad input");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.payload(), &Payload::Error("bad input".to_string()));

        let empty = Reply::no_content();
        assert_eq!(empty.status(), StatusCode::NO_CONTENT);
        assert_eq!(empty.payload(), &Payload::Empty);
    }
}
