//! TebNegar CLI and REST API entry point.
//!
//! Binary name: `tebnegar`
//!
//! Parses CLI arguments, sets up tracing, opens storage, then either starts
//! the REST API server or runs an operator command.

mod cli;
mod http;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tebnegar_observe::tracing_setup::{init_tracing, shutdown_tracing, TracingOptions};
use tebnegar_types::config::RegistryConfig;

use cli::{Cli, Commands};
use state::{AppState, ConcreteRegistry, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&TracingOptions {
        otel: cli.otel,
        json: cli.json,
        verbose: cli.verbose,
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let storage = Storage::open().await?;

    let result = match cli.command {
        Commands::Serve { host, port } => serve(storage, host, port).await,
        Commands::Stats => {
            let result = cli::stats::stats(&storage, cli.json).await;
            storage.db_pool.close().await;
            result
        }
        Commands::Check => cli::check::check(&storage, cli.json).await,
    };

    shutdown_tracing();
    result
}

async fn serve(storage: Storage, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| storage.config.server.host.clone());
    let port = port.unwrap_or(storage.config.server.port);

    let state = AppState::init(storage).await?;
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    println!();
    println!(
        "  {} TebNegar API listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!(
        "  {} {} ({})",
        console::style("AI").dim(),
        state.registry.provider_name(),
        state.config.provider.model
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let shutdown = CancellationToken::new();
    let sweeper = spawn_idle_sweeper(state.registry.clone(), &state.config.registry, shutdown.clone());

    let db_pool = state.db_pool.clone();
    let router = http::router::build_router(state);

    let signal = shutdown.clone();
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        signal.cancel();
    })
    .await?;

    shutdown.cancel();
    if let Some(handle) = sweeper {
        let _ = handle.await;
    }
    db_pool.close().await;

    println!("\n  Server stopped.");
    Ok(())
}

/// Periodically drop AI sessions idle longer than the configured TTL.
///
/// Returns `None` when no TTL is configured.
fn spawn_idle_sweeper(
    registry: Arc<ConcreteRegistry>,
    config: &RegistryConfig,
    shutdown: CancellationToken,
) -> Option<JoinHandle<()>> {
    if config.idle_ttl_secs.is_none() {
        return None;
    }
    let period = Duration::from_secs(config.sweep_interval_secs.max(1));

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    registry.evict_idle();
                }
            }
        }
        tracing::debug!("idle session sweeper stopped");
    }))
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
