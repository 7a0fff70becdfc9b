//! Coordinator binary.
//!
//! Initializes tracing and metrics, loads or creates the system parameters
//! and serves the HTTP API until shutdown.

use clap::Parser as _;
use eyre::Context as _;
use shardvault_coordinator::config::CoordinatorConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    shardvault_coordinator::metrics::describe_metrics();

    let config = CoordinatorConfig::parse();
    tracing::info!("starting shardvault-coordinator with config: {config:#?}");

    let bind_addr = config.bind_addr;
    let service = shardvault_coordinator::init(config)
        .await
        .context("while initializing the coordinator")?;
    tracing::info!("coordinator instance {}", service.coordinator_id);

    let cancellation_token = CancellationToken::new();
    tokio::spawn({
        let cancellation_token = cancellation_token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("received ctrl-c, shutting down");
            }
            cancellation_token.cancel();
        }
    });

    tracing::info!("binding to {bind_addr}");
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .context("while binding tcp-listener")?;

    axum::serve(
        listener,
        service
            .router
            .into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(async move { cancellation_token.cancelled().await })
    .await
    .context("while serving")?;

    tracing::info!("coordinator shut down");
    Ok(())
}
