//! # Tally Routes
//!
//! The registration surface every feature module uses to publish its
//! endpoints:
//!
//! ```
//! use http::StatusCode;
//! use tally_core::{Arguments, Payload, Request};
//! use tally_routes::{route, Documentation, MethodMuxer, RouteTable};
//!
//! async fn list_costs(_request: Request, _arguments: Arguments) -> (StatusCode, Payload) {
//!     (StatusCode::OK, Payload::Data(serde_json::json!([])))
//! }
//!
//! let mut table = RouteTable::new();
//! MethodMuxer::new()
//!     .get(route(list_costs).with(Documentation {
//!         summary: "get cost data",
//!         description: "Responds with cost data for the selected accounts.",
//!     }))
//!     .register(&mut table, "/costs")
//!     .expect("pattern registered once");
//! let registry = table.freeze();
//! # assert_eq!(registry.catalogue().len(), 1);
//! ```
//!
//! Registration is the only write path: the table is mutable during boot,
//! duplicate patterns are fatal, and [`RouteTable::freeze`] produces the
//! immutable [`Registry`] the transport layer serves from.

#![forbid(unsafe_code)]

mod builder;
mod muxer;
mod registry;

pub use builder::{route, Documentation, Route};
pub use muxer::{Endpoint, MethodMuxer};
pub use registry::{Registry, RegistryError, RouteTable};
