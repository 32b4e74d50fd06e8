// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # CLI Interface
//!
//! Defines the command-line argument structure for `microcoin-gateway`
//! using `clap` derive. Every `serve` flag has a `MICROCOIN_*` environment
//! fallback so the gateway can be configured entirely from the
//! environment in containers.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use microcoin_protocol::config::{DEFAULT_API_PORT, DEFAULT_METRICS_PORT, DEFAULT_NODE_RPC_URL};

use crate::logging::{LogFormat, LogLevel};

/// MicroCoin transaction gateway.
///
/// Builds operations from client requests, hands out the hash to sign,
/// verifies the returned signature and submits the operation to a
/// MicroCoin ledger node.
#[derive(Parser, Debug)]
#[command(
    name = "microcoin-gateway",
    about = "MicroCoin transaction gateway",
    version,
    propagate_version = true
)]
pub struct GatewayCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP/WebSocket API.
    Serve(ServeArgs),
    /// Query a running gateway's health endpoint.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Where account state comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LedgerMode {
    /// A ledger node reached over JSON-RPC.
    Rpc,
    /// A throwaway in-memory ledger, for development.
    Memory,
}

/// Arguments for the `serve` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    /// JSON-RPC endpoint of the ledger node.
    #[arg(long, env = "MICROCOIN_NODE_URL", default_value = DEFAULT_NODE_RPC_URL)]
    pub node_url: String,

    #[arg(long, value_enum, env = "MICROCOIN_LEDGER", default_value_t = LedgerMode::Rpc)]
    pub ledger: LedgerMode,

    /// JSON file with initial accounts for `--ledger memory`.
    #[arg(long, env = "MICROCOIN_SEED")]
    pub seed: Option<PathBuf>,

    /// Seconds between blocks sealed by the in-memory ledger.
    #[arg(long, env = "MICROCOIN_BLOCK_INTERVAL_SECS", default_value_t = 10)]
    pub block_interval_secs: u64,

    /// Address to bind both listeners on.
    #[arg(long, env = "MICROCOIN_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    #[arg(long, env = "MICROCOIN_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    #[arg(long, env = "MICROCOIN_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Network label reported by `/health`.
    #[arg(long, env = "MICROCOIN_NETWORK", default_value = "mainnet")]
    pub network: String,

    #[arg(long, value_enum, env = "MICROCOIN_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Level for the gateway's own crates. `MICROCOIN_LOG` or `RUST_LOG`
    /// replace the whole filter when set.
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Timeout for a single ledger node call.
    #[arg(long, env = "MICROCOIN_RPC_TIMEOUT_SECS", default_value_t = 30)]
    pub rpc_timeout_secs: u64,

    /// Buffered transaction events per WebSocket subscriber.
    #[arg(long, env = "MICROCOIN_EVENT_CAPACITY", default_value_t = 256)]
    pub event_capacity: usize,

    /// Allowed CORS origins, comma separated. Any origin when omitted.
    #[arg(long, env = "MICROCOIN_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Base URL of the running gateway.
    #[arg(long, env = "MICROCOIN_GATEWAY_URL", default_value = "http://127.0.0.1:8080")]
    pub gateway_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        GatewayCli::command().debug_assert();
    }

    #[test]
    fn serve_defaults() {
        let cli = GatewayCli::try_parse_from(["microcoin-gateway", "serve"]).unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.ledger, LedgerMode::Rpc);
        assert_eq!(args.api_port, DEFAULT_API_PORT);
        assert!(args.cors_origins.is_empty());
    }

    #[test]
    fn memory_ledger_with_origins() {
        let cli = GatewayCli::try_parse_from([
            "microcoin-gateway",
            "serve",
            "--ledger",
            "memory",
            "--cors-origins",
            "https://a.example,https://b.example",
        ])
        .unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.ledger, LedgerMode::Memory);
        assert_eq!(args.cors_origins.len(), 2);
    }
}
