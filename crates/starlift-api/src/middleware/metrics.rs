//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Coordinator gauges (active transfers, stored exports,
//! connected instances, subscribed clients) are updated on each
//! `/metrics` scrape — see the metrics handler in `lib.rs`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    core::Collector, Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics (push model) --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Coordinator gauges (pull model, updated on /metrics scrape) --
    active_transfers: IntGauge,
    stored_exports: IntGauge,
    connected_instances: IntGauge,
    subscribed_clients: IntGauge,
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("starlift_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "starlift_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new(
                "starlift_http_errors_total",
                "Total HTTP errors (4xx and 5xx)",
            ),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let active_transfers = IntGauge::new(
            "starlift_active_transfers",
            "Transfers currently in the active table",
        )
        .expect("metric can be created");

        let stored_exports =
            IntGauge::new("starlift_stored_exports", "Exports currently staged")
                .expect("metric can be created");

        let connected_instances = IntGauge::new(
            "starlift_connected_instances",
            "Instances with a live session",
        )
        .expect("metric can be created");

        let subscribed_clients = IntGauge::new(
            "starlift_subscribed_clients",
            "Clients with a live subscriber socket",
        )
        .expect("metric can be created");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_errors_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(active_transfers.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(stored_exports.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(connected_instances.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(subscribed_clients.clone()))
            .expect("metric can be registered");

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                active_transfers,
                stored_exports,
                connected_instances,
                subscribed_clients,
            }),
        }
    }

    /// Total request count (sum across labels).
    pub fn requests(&self) -> u64 {
        let mut total = 0u64;
        for family in &self.inner.http_requests_total.collect() {
            for metric in family.get_metric() {
                total += metric.get_counter().get_value() as u64;
            }
        }
        total
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    /// Update coordinator gauges (called by the `/metrics` handler).
    pub fn set_coordinator_gauges(
        &self,
        active_transfers: usize,
        stored_exports: usize,
        connected_instances: usize,
        subscribed_clients: usize,
    ) {
        self.inner.active_transfers.set(active_transfers as i64);
        self.inner.stored_exports.set(stored_exports as i64);
        self.inner
            .connected_instances
            .set(connected_instances as i64);
        self.inner.subscribed_clients.set(subscribed_clients as i64);
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer)
            .map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .finish()
    }
}

/// Normalize a request path by collapsing id-bearing segments, keeping
/// Prometheus label cardinality bounded. Transfer and export ids carry
/// recognizable prefixes.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with("transfer_") || segment.starts_with("export_") {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records HTTP request metrics via Prometheus.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(metrics) = metrics {
        metrics.record_request(
            &method,
            &path,
            response.status().as_u16(),
            start.elapsed().as_secs_f64(),
        );
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_metrics_start_at_zero() {
        let metrics = ApiMetrics::new();
        assert_eq!(metrics.requests(), 0);
    }

    #[test]
    fn requests_and_errors_increment() {
        let metrics = ApiMetrics::new();
        metrics.record_request("GET", "/v1/tree", 200, 0.01);
        metrics.record_request("POST", "/v1/transfers", 422, 0.02);
        assert_eq!(metrics.requests(), 2);

        let output = metrics.gather_and_encode().unwrap();
        assert!(output.contains("starlift_http_requests_total"));
        assert!(output.contains("starlift_http_errors_total"));
    }

    #[test]
    fn coordinator_gauges_render() {
        let metrics = ApiMetrics::new();
        metrics.set_coordinator_gauges(3, 7, 2, 1);
        let output = metrics.gather_and_encode().unwrap();
        assert!(output.contains("starlift_active_transfers 3"));
        assert!(output.contains("starlift_stored_exports 7"));
        assert!(output.contains("starlift_connected_instances 2"));
        assert!(output.contains("starlift_subscribed_clients 1"));
    }

    #[test]
    fn normalize_path_collapses_ids() {
        assert_eq!(
            normalize_path("/v1/transfers/transfer_1722_abc/log"),
            "/v1/transfers/{id}/log"
        );
        assert_eq!(
            normalize_path("/v1/exports/export_1722_def"),
            "/v1/exports/{id}"
        );
        assert_eq!(normalize_path("/v1/tree"), "/v1/tree");
    }

    #[test]
    fn clone_shares_underlying_counters() {
        let metrics = ApiMetrics::new();
        let clone = metrics.clone();
        metrics.record_request("GET", "/v1/tree", 200, 0.01);
        assert_eq!(clone.requests(), 1);
    }
}
