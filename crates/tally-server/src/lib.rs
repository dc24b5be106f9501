//! # Tally Server
//!
//! The transport layer: binds the frozen route registry to a Hyper HTTP/1
//! server, collects request bodies, enforces the request timeout, and
//! serializes replies: success payloads as-is, error payloads as the
//! stable `{"error": "..."}` envelope.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tally_server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::from_env();
//!     let server = Server::new(config, registry, global_decorators);
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod config;
mod server;
mod shutdown;

pub use config::ServerConfig;
pub use server::{write_reply, Server, ServerError};
pub use shutdown::ShutdownSignal;
