//! HTTP middleware: Prometheus request metrics.

pub mod metrics;
