// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Gateway configuration.
//!
//! Built once from the `serve` arguments, validated, then shared read-only
//! through an `Arc`. Nothing in the presentation layer reads flags or
//! environment variables after startup.

use anyhow::{bail, Context, Result};
use axum::http::{HeaderValue, Method};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::cli::{LedgerMode, ServeArgs};
use crate::logging::{LogFormat, LogLevel};

/// Which origins may call the API from a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsPolicy {
    Any,
    Origins(Vec<HeaderValue>),
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub node_url: String,
    pub ledger: LedgerMode,
    pub seed: Option<PathBuf>,
    pub block_interval: Duration,
    pub api_addr: SocketAddr,
    pub metrics_addr: SocketAddr,
    pub network: String,
    pub log_format: LogFormat,
    pub log_level: LogLevel,
    pub rpc_timeout: Duration,
    pub event_capacity: usize,
    pub cors: CorsPolicy,
}

impl GatewayConfig {
    pub fn from_args(args: &ServeArgs) -> Result<Self> {
        if args.event_capacity == 0 {
            bail!("event capacity must be at least 1");
        }
        if args.rpc_timeout_secs == 0 {
            bail!("rpc timeout must be at least one second");
        }
        if args.ledger == LedgerMode::Memory && args.block_interval_secs == 0 {
            bail!("block interval must be at least one second");
        }

        let api_addr = socket_addr(&args.bind, args.api_port)?;
        let metrics_addr = socket_addr(&args.bind, args.metrics_port)?;

        let cors = if args.cors_origins.is_empty() {
            CorsPolicy::Any
        } else {
            let origins = args
                .cors_origins
                .iter()
                .map(|o| {
                    HeaderValue::from_str(o.trim())
                        .with_context(|| format!("invalid CORS origin `{o}`"))
                })
                .collect::<Result<Vec<_>>>()?;
            CorsPolicy::Origins(origins)
        };

        Ok(Self {
            node_url: args.node_url.clone(),
            ledger: args.ledger,
            seed: args.seed.clone(),
            block_interval: Duration::from_secs(args.block_interval_secs),
            api_addr,
            metrics_addr,
            network: args.network.clone(),
            log_format: args.log_format,
            log_level: args.log_level,
            rpc_timeout: Duration::from_secs(args.rpc_timeout_secs),
            event_capacity: args.event_capacity,
            cors,
        })
    }

    pub fn cors_layer(&self) -> CorsLayer {
        let layer = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);
        match &self.cors {
            CorsPolicy::Any => layer.allow_origin(Any),
            CorsPolicy::Origins(origins) => layer.allow_origin(origins.clone()),
        }
    }
}

fn socket_addr(bind: &str, port: u16) -> Result<SocketAddr> {
    format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address `{bind}:{port}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Commands, GatewayCli};
    use clap::Parser;

    fn serve_args(extra: &[&str]) -> ServeArgs {
        let mut argv = vec!["microcoin-gateway", "serve"];
        argv.extend_from_slice(extra);
        match GatewayCli::try_parse_from(argv).unwrap().command {
            Commands::Serve(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn defaults_allow_any_origin() {
        let config = GatewayConfig::from_args(&serve_args(&[])).unwrap();
        assert_eq!(config.cors, CorsPolicy::Any);
        assert_eq!(config.api_addr.port(), 8080);
        assert_eq!(config.rpc_timeout, Duration::from_secs(30));
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn origins_are_parsed() {
        let config =
            GatewayConfig::from_args(&serve_args(&["--cors-origins", "https://wallet.example"]))
                .unwrap();
        assert_eq!(
            config.cors,
            CorsPolicy::Origins(vec![HeaderValue::from_static("https://wallet.example")])
        );
    }

    #[test]
    fn log_level_is_parsed() {
        let config = GatewayConfig::from_args(&serve_args(&["--log-level", "debug"])).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(GatewayConfig::from_args(&serve_args(&["--event-capacity", "0"])).is_err());
        assert!(GatewayConfig::from_args(&serve_args(&["--bind", "not an ip"])).is_err());
    }
}
