//! # Tally Pipeline
//!
//! The decorator chain: every route is a base handler wrapped, at
//! registration time, by an ordered list of [`Decorator`]s. The first
//! decorator in the declared list is outermost: it runs first on the way
//! in and last on the way out. A decorator may short-circuit by producing
//! a complete reply without calling onward; that is a first-class outcome,
//! not an error.
//!
//! The [`stages`] module carries the cross-cutting decorators that define
//! the chain's ordering invariants: request identification and logging
//! outermost, CORS and panic recovery around every route-level chain.

#![forbid(unsafe_code)]

mod decorator;
pub mod stages;

pub use decorator::{compose, handler, BoxFuture, Decorator, Dispatch};
