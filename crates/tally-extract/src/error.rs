//! Extraction failure types.

use http::StatusCode;

/// An extraction failure, carrying enough context to tell the client which
/// argument or field was at fault.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// A required query argument was absent from the request.
    #[error("missing required query argument '{0}'")]
    MissingArgument(&'static str),

    /// A query argument was present but did not parse as its declared shape.
    #[error("invalid query argument '{name}': {detail}")]
    InvalidArgument {
        /// The declared argument name.
        name: &'static str,
        /// What the parser expected.
        detail: String,
    },

    /// The query string itself could not be decoded.
    #[error("malformed query string: {0}")]
    MalformedQuery(String),

    /// The `Content-Type` header did not exactly match an accepted type.
    #[error("unsupported content type: expected one of [{}]", .expected.join(", "))]
    UnsupportedContentType {
        /// The accepted content types, as declared at registration.
        expected: Vec<String>,
    },

    /// The request body could not be decoded against the declared shape.
    #[error("invalid request body: {0}")]
    MalformedBody(String),

    /// The body decoded but a field violated its declared constraint.
    #[error("invalid body field '{field}': {detail}")]
    InvalidBodyField {
        /// The violating field.
        field: String,
        /// The violated constraint.
        detail: String,
    },
}

impl ExtractError {
    /// The status code this failure maps to on the wire.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedContentType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_argument() {
        let err = ExtractError::MissingArgument("accounts");
        assert!(err.to_string().contains("accounts"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = ExtractError::InvalidArgument {
            name: "begin",
            detail: "expected an ISO-8601 date-time".to_string(),
        };
        assert!(err.to_string().contains("begin"));
        assert!(err.to_string().contains("ISO-8601"));
    }

    #[test]
    fn content_type_failures_map_to_415() {
        let err = ExtractError::UnsupportedContentType {
            expected: vec!["application/json".to_string()],
        };
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(err.to_string().contains("application/json"));
    }

    #[test]
    fn body_field_failures_name_the_field() {
        let err = ExtractError::InvalidBodyField {
            field: "bucket".to_string(),
            detail: "bucket name must be between 3 and 63 characters".to_string(),
        };
        assert!(err.to_string().contains("bucket"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
