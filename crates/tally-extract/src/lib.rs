//! # Tally Extract
//!
//! Typed argument extraction: the bridge between untyped query-string and
//! JSON-body input and the typed values handlers read from the argument
//! bag. Every extractor is a decorator that either stores a typed value
//! under its own key or short-circuits the request with a client error
//! naming the offending argument; a handler never needs to re-validate
//! input it declared.

#![forbid(unsafe_code)]

mod body;
mod error;
mod query;

pub use body::{body_key, take_body, RequestBody, RequestContentType};
pub use error::ExtractError;
pub use query::{IsoDate, QueryArg, QueryArgs, QueryExtract, QueryMap, QueryShape, Text, Uint, UintList};
