use anyhow::Result;
use axum::Router;
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use services::{
    discovery::NodeDirectory, docker_runtime::DockerRuntime, gateway::Gateway,
    s3_store::S3Connector,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config + discover-only flag ---
    let (cfg, discover_only) = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting gateway with config: {:?}", cfg);

    // --- Discover nodes and build the ring ---
    // Any failure here ends the process before a listener exists.
    let runtime = DockerRuntime::connect()?;
    let directory = NodeDirectory::new(runtime);
    let gateway = Gateway::setup(&directory, &S3Connector).await?;

    if discover_only {
        for client in gateway.nodes() {
            let node = client.node();
            println!("{}\t{}", node.id, node.endpoint);
        }
        tracing::info!("Discovery complete, {} nodes", gateway.node_count());
        return Ok(());
    }

    // --- Build router ---
    let app: Router = routes::routes::routes(cfg.max_upload_bytes).with_state(Arc::new(gateway));

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
