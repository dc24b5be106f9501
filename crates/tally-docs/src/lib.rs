//! # Tally Docs
//!
//! Machine-readable route documentation. Every route registration
//! contributes one [`RouteDocumentation`] per (pattern, method), assembled
//! from the decorators attached to that route; the entries accumulate in a
//! [`Catalogue`] that is rendered exactly once when the route table is
//! frozen and served verbatim afterwards.

#![forbid(unsafe_code)]

mod catalogue;
mod entry;

pub use catalogue::Catalogue;
pub use entry::{QueryArgDoc, RouteDocumentation, ShapeDoc};
