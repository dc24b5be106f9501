//! # tallyd
//!
//! The Tally application: feature modules registered on the shared
//! pipeline. The pipeline crates know nothing about accounts or bill
//! repositories; everything domain-shaped lives here, composed from the
//! same decorator contract every feature module uses.

#![forbid(unsafe_code)]

pub mod auth;
pub mod billing;
pub mod db;

use std::sync::Arc;

use tally_pipeline::stages::{
    BackendIdDecorator, CorsDecorator, RecoverDecorator, RequestIdDecorator,
    RequestTimeDecorator, RouteLogDecorator,
};
use tally_pipeline::Decorator;
use tally_server::ServerConfig;

/// The process-global decorator list, outermost first.
///
/// This single definition owns the cross-module ordering: identification
/// and logging outermost, CORS outside recovery so even a panic reply
/// carries cross-origin headers, recovery innermost so it fences every
/// route-level chain.
///
/// # Errors
///
/// Fails if the configured backend id is not usable as a header value.
pub fn global_decorators(config: &ServerConfig) -> Result<Vec<Arc<dyn Decorator>>, String> {
    let backend_id = BackendIdDecorator::new(config.backend_id())
        .map_err(|id| format!("backend id '{id}' is not a valid header value"))?;

    Ok(vec![
        Arc::new(RequestIdDecorator::new()),
        Arc::new(RequestTimeDecorator::new()),
        Arc::new(RouteLogDecorator::new()),
        Arc::new(backend_id),
        Arc::new(
            CorsDecorator::new()
                .allow_origin("*")
                .allow_headers(["Content-Type", "Accept", "Authorization"])
                .allow_credentials(true),
        ),
        Arc::new(RecoverDecorator::new()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_list_is_ordered_as_documented() {
        let config = ServerConfig::builder().backend_id("backend-test").build();
        let globals = global_decorators(&config).expect("valid config");
        let names: Vec<&str> = globals.iter().map(|d| d.name()).collect();
        assert_eq!(
            names,
            [
                "request-id",
                "request-time",
                "route-log",
                "backend-id",
                "cors",
                "recover"
            ]
        );
    }

    #[test]
    fn unusable_backend_id_is_rejected() {
        let config = ServerConfig::builder().backend_id("bad\nid").build();
        assert!(global_decorators(&config).is_err());
    }
}
