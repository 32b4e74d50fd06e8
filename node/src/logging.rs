// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Structured Logging
//!
//! The gateway logs through `tracing`. The filter comes from, in order:
//!
//! 1. `MICROCOIN_LOG`, a full directive string;
//! 2. `RUST_LOG`;
//! 3. per-crate defaults built from `--log-level`.
//!
//! The defaults only raise the gateway's own crates to the chosen level.
//! `tower_http` stays at `warn` unless asked for explicitly, since its
//! per-request spans drown out operation logs at `debug`.
//!
//! Output goes to stderr so stdout stays clean for `status`.

use clap::ValueEnum;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding a full filter directive for the gateway.
pub const LOG_ENV: &str = "MICROCOIN_LOG";

/// Crates that follow `--log-level`.
const GATEWAY_CRATES: [&str; 2] = ["microcoin_gateway", "microcoin_protocol"];

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable, colored output. Suitable for local development.
    Pretty,
    /// Machine-parseable JSON lines. Suitable for production log aggregation.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Directive used when neither `MICROCOIN_LOG` nor `RUST_LOG` is set.
///
/// Everything outside the gateway crates logs warnings only.
pub fn default_directive(level: LogLevel) -> String {
    let mut directive = String::from("warn");
    for krate in GATEWAY_CRATES {
        directive.push_str(&format!(",{krate}={}", level.as_str()));
    }
    directive.push_str(",tower_http=warn");
    directive
}

/// Picks the filter: an explicit override wins, otherwise the per-crate
/// defaults. A malformed override is an error, not a silent fallback.
pub fn build_filter(level: LogLevel, directive: Option<&str>) -> Result<EnvFilter, ParseError> {
    match directive {
        Some(d) if !d.trim().is_empty() => EnvFilter::try_new(d),
        _ => EnvFilter::try_new(default_directive(level)),
    }
}

/// Reads the override from `MICROCOIN_LOG`, then `RUST_LOG`.
fn env_directive() -> Option<String> {
    std::env::var(LOG_ENV)
        .ok()
        .or_else(|| std::env::var(EnvFilter::DEFAULT_ENV).ok())
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),
    #[error("logging already initialized: {0}")]
    Init(#[from] TryInitError),
}

/// Installs the global subscriber. Call once, early in `serve`.
pub fn init_logging(level: LogLevel, format: LogFormat) -> Result<(), LoggingError> {
    let directive = env_directive();
    let filter = build_filter(level, directive.as_deref())?;

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()?,
    }

    tracing::info!(
        ?format,
        level = level.as_str(),
        overridden = directive.is_some(),
        "logging initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_level_for_gateway_crates_only() {
        let directive = default_directive(LogLevel::Debug);
        assert_eq!(
            directive,
            "warn,microcoin_gateway=debug,microcoin_protocol=debug,tower_http=warn"
        );
        assert!(EnvFilter::try_new(&directive).is_ok());
    }

    #[test]
    fn override_wins_over_level() {
        let filter = build_filter(LogLevel::Error, Some("microcoin_protocol=trace")).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("microcoin_protocol=trace"), "{rendered}");
        assert!(!rendered.contains("microcoin_gateway"), "{rendered}");

        let blank = build_filter(LogLevel::Info, Some("  ")).unwrap();
        assert!(blank.to_string().contains("microcoin_gateway=info"));
    }

    #[test]
    fn malformed_override_is_an_error() {
        assert!(build_filter(LogLevel::Info, Some("microcoin_gateway=loud")).is_err());
    }
}
