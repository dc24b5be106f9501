//! Server boot: logging, configuration, route aggregation, serve.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use tally_routes::RouteTable;
use tally_server::{Server, ServerConfig, ShutdownSignal};
use tally_tasks::Spawner;

use tallyd::auth::{AuthenticatedUser, StaticTokenVerifier, TokenVerifier};
use tallyd::db::Store;
use tallyd::{billing, global_decorators};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();
    let token = std::env::var("TALLY_AUTH_TOKEN").context("TALLY_AUTH_TOKEN must be set")?;

    let store = Arc::new(Store::new());
    let verifier: Arc<dyn TokenVerifier> = Arc::new(StaticTokenVerifier::new(
        token,
        AuthenticatedUser {
            id: 1,
            email: "admin@tally.local".to_string(),
        },
    ));
    let spawner = Spawner::new();

    let mut table = RouteTable::new();
    billing::register(&mut table, Arc::clone(&store), verifier, spawner.clone())?;
    table.serve_docs("/docs")?;

    let registry = Arc::new(table.freeze());
    for pattern in registry.patterns() {
        tracing::info!(%pattern, "registered route");
    }

    let globals = global_decorators(&config).map_err(|message| anyhow::anyhow!(message))?;
    tracing::info!(backend_id = %config.backend_id(), "started");

    let shutdown = ShutdownSignal::with_os_signals();
    let result = Server::new(config, registry, &globals)
        .bind()
        .await?
        .serve(shutdown)
        .await;

    // Stop accepting transactions, then cut detached work loose.
    store.close();
    spawner.shutdown();

    result?;
    tracing::info!("stopped");
    Ok(())
}
