//! Documentation entry types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The shape of a query argument, as published in the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapeDoc {
    /// Free-form string.
    String,
    /// Non-negative integer.
    Uint,
    /// Comma-separated list of non-negative integers.
    UintList,
    /// ISO-8601 date-time, `YYYY-MM-DDTHH:MM:SSZ`.
    DateTime,
}

/// The published contract of one declared query argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryArgDoc {
    /// Argument name as it appears in the query string.
    pub name: String,
    /// Expected value shape.
    pub shape: ShapeDoc,
    /// Human-readable description.
    pub description: String,
    /// Whether the argument must be present.
    pub required: bool,
}

/// The documentation entry for one (pattern, method) registration.
///
/// Assembled at registration time by walking the route's decorators: the
/// `Documentation` pseudo-decorator contributes summary and description,
/// `QueryArgs` contributes its declared arguments, `RequestContentType`
/// and `RequestBody` contribute the body contract. Never mutated after the
/// catalogue is frozen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteDocumentation {
    /// One-line summary of what the operation does.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    /// Longer free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Declared query arguments, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_args: Vec<QueryArgDoc>,
    /// Accepted request content types, if the operation takes a body.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_types: Vec<String>,
    /// Example request body, if the operation takes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_example: Option<Value>,
}

impl RouteDocumentation {
    /// Creates an empty entry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
