//! # Prometheus Metrics
//!
//! Operational counters for the vault service, scraped at `/metrics` on the
//! configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Vaults deployed and persisted.
    pub vaults_created_total: IntCounter,
    /// Successful owner check-ins.
    pub check_ins_total: IntCounter,
    /// Successful beneficiary claims.
    pub claims_total: IntCounter,
    /// Claims refused before or during redemption.
    pub claim_rejections_total: IntCounter,
    /// Delegations left pending after a check-in could not disable them.
    pub disable_failures_total: IntCounter,
    /// Handler latency in seconds, all mutating endpoints.
    pub request_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("lastwill".into()), None)?;

        let counter = |name: &str, help: &str| -> Result<IntCounter, prometheus::Error> {
            let c = IntCounter::new(name, help)?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };

        let vaults_created_total = counter("vaults_created_total", "Vaults deployed and persisted")?;
        let check_ins_total = counter("check_ins_total", "Successful owner check-ins")?;
        let claims_total = counter("claims_total", "Successful beneficiary claims")?;
        let claim_rejections_total = counter(
            "claim_rejections_total",
            "Claims refused before or during redemption",
        )?;
        let disable_failures_total = counter(
            "disable_failures_total",
            "Delegations a check-in could not disable",
        )?;

        let request_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "request_latency_seconds",
                "Latency of mutating vault requests in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )?;
        registry.register(Box::new(request_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            vaults_created_total,
            check_ins_total,
            claims_total,
            claim_rejections_total,
            disable_failures_total,
            request_latency_seconds,
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
pub type SharedMetrics = Arc<NodeMetrics>;

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_prefixed() {
        let metrics = NodeMetrics::new().unwrap();
        metrics.check_ins_total.inc();
        metrics.request_latency_seconds.observe(0.02);

        let text = metrics.encode().unwrap();
        assert!(text.contains("lastwill_check_ins_total 1"));
        assert!(text.contains("lastwill_request_latency_seconds_count 1"));
    }
}
