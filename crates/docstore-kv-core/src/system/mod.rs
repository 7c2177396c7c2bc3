//! System utilities and metrics

/// Prometheus metrics
pub mod metrics;
