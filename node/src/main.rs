// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # MicroCoin Gateway
//!
//! Entry point for the `microcoin-gateway` binary. Parses CLI arguments,
//! initializes logging and metrics, connects to a ledger node and serves
//! the HTTP/WS API.
//!
//! The binary supports three subcommands:
//!
//! - `serve`   - run the gateway
//! - `status`  - query a running gateway's health endpoint
//! - `version` - print build version information

mod api;
mod cli;
mod config;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;

use microcoin_protocol::ledger::{InMemoryLedger, JsonRpcNode, LedgerNode, LedgerSeed};

use cli::{Commands, GatewayCli, LedgerMode};
use config::GatewayConfig;
use metrics::GatewayMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = GatewayCli::parse();

    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Runs the gateway: API server, metrics endpoint and, for the in-memory
/// ledger, the block sealing loop.
async fn serve(args: cli::ServeArgs) -> Result<()> {
    let config = Arc::new(GatewayConfig::from_args(&args).context("invalid configuration")?);
    logging::init_logging(config.log_level, config.log_format)
        .context("failed to initialize logging")?;

    tracing::info!(
        api_addr = %config.api_addr,
        metrics_addr = %config.metrics_addr,
        ledger = ?config.ledger,
        network = %config.network,
        "starting microcoin-gateway"
    );

    // --- Ledger node ---
    let (node, block_loop): (Arc<dyn LedgerNode>, _) = match config.ledger {
        LedgerMode::Rpc => {
            let node = JsonRpcNode::with_timeout(&config.node_url, config.rpc_timeout)
                .with_context(|| format!("failed to create node client for {}", config.node_url))?;
            tracing::info!(url = %config.node_url, "using JSON-RPC ledger node");
            (Arc::new(node), None)
        }
        LedgerMode::Memory => {
            let ledger = Arc::new(load_memory_ledger(&config)?);
            let block_loop = spawn_block_loop(Arc::clone(&ledger), config.block_interval);
            (ledger, Some(block_loop))
        }
    };

    // --- Metrics ---
    let gateway_metrics =
        Arc::new(GatewayMetrics::new().context("failed to register prometheus metrics")?);

    // --- Event broadcast ---
    let (event_tx, _) = broadcast::channel(config.event_capacity);

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            microcoin_protocol::config::PROTOCOL_VERSION,
        ),
        network: config.network.clone(),
        node,
        event_tx,
        metrics: Arc::clone(&gateway_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state, config.cors_layer());
    let api_listener = tokio::net::TcpListener::bind(config.api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", config.api_addr))?;
    tracing::info!("API server listening on {}", config.api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&gateway_metrics));
    let metrics_listener = tokio::net::TcpListener::bind(config.metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", config.metrics_addr))?;
    tracing::info!("Metrics server listening on {}", config.metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    if let Some(handle) = block_loop {
        handle.abort();
    }
    tracing::info!("microcoin-gateway stopped");
    Ok(())
}

/// Builds the in-memory ledger, from the seed file when one is configured.
fn load_memory_ledger(config: &GatewayConfig) -> Result<InMemoryLedger> {
    let Some(path) = &config.seed else {
        tracing::warn!("in-memory ledger started without a seed; no accounts exist");
        return Ok(InMemoryLedger::new());
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    let seed: LedgerSeed = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse seed file {}", path.display()))?;
    let accounts = seed.accounts.len();
    let ledger = InMemoryLedger::from_seed(seed)
        .with_context(|| format!("invalid seed file {}", path.display()))?;

    tracing::info!(path = %path.display(), accounts, "in-memory ledger seeded");
    Ok(ledger)
}

/// Seals pending operations into a block every `interval`, so history and
/// confirmation counts move forward without a real node.
fn spawn_block_loop(
    ledger: Arc<InMemoryLedger>,
    interval: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let height = ledger.seal_block();
            tracing::debug!(height, "block sealed");
        }
    })
}

/// Queries a running gateway's health endpoint and prints the result.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let url = format!("{}/health", args.gateway_url.trim_end_matches('/'));
    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("failed to reach {}", url))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .with_context(|| format!("failed to read response from {}", url))?;

    if !status.is_success() {
        anyhow::bail!("{} returned {}: {}", url, status, body);
    }
    println!("{}", body);
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("microcoin-gateway {}", env!("CARGO_PKG_VERSION"));
    println!("protocol          {}", microcoin_protocol::config::PROTOCOL_VERSION);
    println!("rustc             {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed, that branch never completes.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
