//! # Tally Core
//!
//! Core types shared by every stage of the Tally request pipeline:
//!
//! - [`Request`] and [`Reply`], the values that flow through a dispatch
//! - [`RequestId`], the per-request identifier echoed in `X-Request-ID`
//! - [`Arguments`], the per-request typed argument bag keyed by [`ArgKey`]
//! - [`ErrorBody`], the stable `{"error": "..."}` wire envelope

#![forbid(unsafe_code)]

mod arguments;
mod error;
mod request_id;
mod types;

pub use arguments::{ArgKey, Arguments};
pub use error::ErrorBody;
pub use request_id::RequestId;
pub use types::{HandlerResult, Payload, Reply, Request};
