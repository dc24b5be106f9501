//! The wire-format error envelope.

use serde::{Deserialize, Serialize};

/// The single-field error object written for every failed request.
///
/// Clients can rely on any 4xx/5xx reply carrying exactly this shape:
///
/// ```json
/// {"error": "bucket name shall be no shorter than 3 chars"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message describing the failure.
    pub error: String,
}

impl ErrorBody {
    /// Creates an envelope around `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
