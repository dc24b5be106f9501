//! Typed query-string argument extraction.
//!
//! A [`QueryArg`] is a static descriptor pairing an argument name with one
//! of a fixed set of value shapes. The [`QueryArgs`] decorator parses the
//! raw query string once, runs every declared descriptor, and either fills
//! the argument bag with typed values or short-circuits with a client
//! error naming the argument that failed.
//!
//! ```
//! use tally_extract::{QueryArg, Uint, UintList};
//!
//! /// The IDs of the AWS accounts to query.
//! static ACCOUNTS: QueryArg<UintList> =
//!     QueryArg::new("accounts", "The IDs for many AWS accounts.");
//!
//! /// Page size, defaulting when absent.
//! static LIMIT: QueryArg<Uint> =
//!     QueryArg::with_default("limit", "Maximum number of results.", 50);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};

use tally_core::{ArgKey, Arguments, Reply};
use tally_docs::{QueryArgDoc, RouteDocumentation, ShapeDoc};
use tally_pipeline::{Decorator, Dispatch};

use crate::error::ExtractError;

/// One of the fixed set of query-argument value shapes.
pub trait QueryShape: Send + Sync + 'static {
    /// The typed value stored in the argument bag.
    type Value: Clone + Send + Sync + 'static;

    /// The shape as published in the documentation catalogue.
    const SHAPE: ShapeDoc;

    /// Parses a raw (percent-decoded) query value.
    ///
    /// On failure, returns a description of what was expected; the caller
    /// prefixes it with the argument name.
    fn parse(raw: &str) -> Result<Self::Value, String>;
}

/// Free-form string.
pub struct Text;

impl QueryShape for Text {
    type Value = String;
    const SHAPE: ShapeDoc = ShapeDoc::String;

    fn parse(raw: &str) -> Result<String, String> {
        Ok(raw.to_string())
    }
}

/// Non-negative integer.
pub struct Uint;

impl QueryShape for Uint {
    type Value = u64;
    const SHAPE: ShapeDoc = ShapeDoc::Uint;

    fn parse(raw: &str) -> Result<u64, String> {
        raw.parse()
            .map_err(|_| format!("'{raw}' is not a non-negative integer"))
    }
}

/// Comma-separated list of non-negative integers, order preserved.
pub struct UintList;

impl QueryShape for UintList {
    type Value = Vec<u64>;
    const SHAPE: ShapeDoc = ShapeDoc::UintList;

    fn parse(raw: &str) -> Result<Vec<u64>, String> {
        raw.split(',')
            .map(|part| {
                part.parse()
                    .map_err(|_| format!("'{part}' is not a non-negative integer"))
            })
            .collect()
    }
}

/// ISO-8601 date-time in the `YYYY-MM-DDTHH:MM:SSZ` format.
pub struct IsoDate;

impl QueryShape for IsoDate {
    type Value = DateTime<Utc>;
    const SHAPE: ShapeDoc = ShapeDoc::DateTime;

    fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%SZ")
            .map(|naive| naive.and_utc())
            .map_err(|_| format!("'{raw}' is not a date-time in the YYYY-MM-DDTHH:MM:SSZ format"))
    }
}

/// A static query-argument descriptor.
///
/// Declared once per endpoint, immutable, shared by reference across
/// requests. The descriptor owns the [`ArgKey`] its values are stored
/// under; handlers read through [`QueryArg::key`].
pub struct QueryArg<S: QueryShape> {
    name: &'static str,
    description: &'static str,
    required: bool,
    default: Option<S::Value>,
    key: ArgKey<S::Value>,
}

impl<S: QueryShape> QueryArg<S> {
    /// Declares a required argument.
    #[must_use]
    pub const fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: true,
            default: None,
            key: ArgKey::new(name),
        }
    }

    /// Declares an optional argument; when absent, nothing is stored.
    #[must_use]
    pub const fn optional(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: false,
            default: None,
            key: ArgKey::new(name),
        }
    }

    /// Declares an optional argument with a default stored when absent.
    #[must_use]
    pub const fn with_default(
        name: &'static str,
        description: &'static str,
        default: S::Value,
    ) -> Self {
        Self {
            name,
            description,
            required: false,
            default: Some(default),
            key: ArgKey::new(name),
        }
    }

    /// The bag key this argument's parsed value is stored under.
    #[must_use]
    pub const fn key(&self) -> &ArgKey<S::Value> {
        &self.key
    }

    /// The argument name as it appears in the query string.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

/// Object-safe face of [`QueryArg`], so one decorator can run a
/// heterogeneous list of descriptors.
pub trait QueryExtract: Send + Sync {
    /// The argument name.
    fn name(&self) -> &'static str;

    /// The published contract of this argument.
    fn doc(&self) -> QueryArgDoc;

    /// Parses this argument out of the query map into the bag, or fails
    /// with an error naming the argument.
    fn extract(&self, query: &QueryMap, arguments: &mut Arguments) -> Result<(), ExtractError>;
}

impl<S: QueryShape> QueryExtract for QueryArg<S> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn doc(&self) -> QueryArgDoc {
        QueryArgDoc {
            name: self.name.to_string(),
            shape: S::SHAPE,
            description: self.description.to_string(),
            required: self.required,
        }
    }

    fn extract(&self, query: &QueryMap, arguments: &mut Arguments) -> Result<(), ExtractError> {
        match query.get(self.name) {
            Some(raw) => match S::parse(raw) {
                Ok(value) => {
                    arguments.set(&self.key, value);
                    Ok(())
                }
                Err(detail) => Err(ExtractError::InvalidArgument {
                    name: self.name,
                    detail,
                }),
            },
            None if self.required => Err(ExtractError::MissingArgument(self.name)),
            None => {
                if let Some(default) = &self.default {
                    arguments.set(&self.key, default.clone());
                }
                Ok(())
            }
        }
    }
}

/// The percent-decoded query string, first value wins per name.
#[derive(Debug, Default)]
pub struct QueryMap {
    values: HashMap<String, String>,
}

impl QueryMap {
    /// Decodes a raw query string.
    pub fn parse(query: Option<&str>) -> Result<Self, ExtractError> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query.unwrap_or(""))
            .map_err(|err| ExtractError::MalformedQuery(err.to_string()))?;

        let mut values = HashMap::new();
        for (name, value) in pairs {
            values.entry(name).or_insert(value);
        }
        Ok(Self { values })
    }

    /// Returns the raw value for `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Decorator running a declared list of query-argument descriptors.
///
/// On any failure the request is answered with a client error before the
/// handler runs; on success every declared value sits typed in the bag.
pub struct QueryArgs(pub Vec<&'static dyn QueryExtract>);

impl Decorator for QueryArgs {
    fn name(&self) -> &'static str {
        "query-args"
    }

    fn wrap(&self, next: Dispatch) -> Dispatch {
        let extractors = self.0.clone();
        Arc::new(move |request, mut arguments| {
            let next = Arc::clone(&next);
            let extractors = extractors.clone();
            Box::pin(async move {
                let query = match QueryMap::parse(request.uri().query()) {
                    Ok(query) => query,
                    Err(err) => return Reply::error(err.status(), err.to_string()),
                };
                for extractor in &extractors {
                    if let Err(err) = extractor.extract(&query, &mut arguments) {
                        return Reply::error(err.status(), err.to_string());
                    }
                }
                next(request, arguments).await
            })
        })
    }

    fn document(&self, doc: &mut RouteDocumentation) {
        for extractor in &self.0 {
            doc.query_args.push(extractor.doc());
        }
    }
}
