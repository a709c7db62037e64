//! CLI launcher: resolves configuration, opens the database, starts the
//! background sweeper/evicter tasks, and serves the HTTP request surface.

use std::sync::Arc;

use clap::Parser;
use emberdb_core::{spawn_evicter, spawn_sweeper, Database};
use emberdb_server::config::{Cli, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::resolve(cli)?;
    let addr = format!("{}:{}", config.db.host, config.db.port);

    let db = Arc::new(Database::open(config.db)?);
    spawn_sweeper(Arc::clone(&db));
    spawn_evicter(Arc::clone(&db));

    let router = emberdb_server::build_router(Arc::clone(&db));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr, "emberdb server listening");
    axum::serve(listener, router).await?;

    Ok(())
}
