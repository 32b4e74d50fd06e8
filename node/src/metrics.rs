// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Prometheus Metrics
//!
//! Operational metrics for the gateway, scraped by Prometheus at `/metrics`
//! on the dedicated metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the gateway.
///
/// Clone-friendly (prometheus handles are reference counted) so it can be
/// shared across request handlers.
#[derive(Clone)]
pub struct GatewayMetrics {
    registry: Registry,
    /// `start` calls that produced a hash, by operation type.
    pub operations_started_total: IntCounterVec,
    /// Operations the ledger node accepted, by operation type.
    pub operations_committed_total: IntCounterVec,
    /// Commits that ended in an error, by error code label.
    pub operations_rejected_total: IntCounterVec,
    /// Time from receiving a commit to the node's answer.
    pub commit_latency_seconds: Histogram,
}

impl GatewayMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("microcoin".into()), None)?;

        let operations_started_total = IntCounterVec::new(
            Opts::new(
                "operations_started_total",
                "Operations built and hashed for signing",
            ),
            &["op_type"],
        )?;
        registry.register(Box::new(operations_started_total.clone()))?;

        let operations_committed_total = IntCounterVec::new(
            Opts::new(
                "operations_committed_total",
                "Operations accepted by the ledger node",
            ),
            &["op_type"],
        )?;
        registry.register(Box::new(operations_committed_total.clone()))?;

        let operations_rejected_total = IntCounterVec::new(
            Opts::new(
                "operations_rejected_total",
                "Commits rejected locally or by the ledger node",
            ),
            &["code"],
        )?;
        registry.register(Box::new(operations_rejected_total.clone()))?;

        let commit_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "commit_latency_seconds",
                "Commit handling latency in seconds, including the node round trip",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
        )?;
        registry.register(Box::new(commit_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            operations_started_total,
            operations_committed_total,
            operations_rejected_total,
            commit_latency_seconds,
        })
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<GatewayMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
