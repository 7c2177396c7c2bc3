//! Metrics collection for key-value operations
//!
//! Counters and latency histograms live in a crate-local Prometheus registry
//! so the server can expose them without touching the global default one.

use once_cell::sync::Lazy;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Instant;

use crate::types::{Error, Result};

/// Metrics registry for the adapter
static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Operation metrics
pub struct Metrics {
    /// Operations by name and outcome (`ok` or an error kind)
    pub operations: IntCounterVec,
    /// Operation latency in seconds by name
    pub duration: HistogramVec,
}

impl Metrics {
    fn new() -> Result<Self> {
        let operations = IntCounterVec::new(
            Opts::new("kv_operations_total", "Total number of key-value operations"),
            &["op", "outcome"],
        )
        .map_err(|e| Error::internal(format!("metrics: {}", e)))?;
        let duration = HistogramVec::new(
            HistogramOpts::new(
                "kv_operation_duration_seconds",
                "Key-value operation latency in seconds",
            ),
            &["op"],
        )
        .map_err(|e| Error::internal(format!("metrics: {}", e)))?;

        REGISTRY
            .register(Box::new(operations.clone()))
            .map_err(|e| Error::internal(format!("metrics: {}", e)))?;
        REGISTRY
            .register(Box::new(duration.clone()))
            .map_err(|e| Error::internal(format!("metrics: {}", e)))?;

        Ok(Self { operations, duration })
    }

    /// Get the global metrics instance
    pub fn global() -> &'static Metrics {
        static INSTANCE: Lazy<Metrics> =
            Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
        &INSTANCE
    }

    /// Start timing an operation
    pub fn start(op: &'static str) -> OperationTimer {
        OperationTimer {
            op,
            started: Instant::now(),
        }
    }
}

/// In-flight operation measurement
pub struct OperationTimer {
    op: &'static str,
    started: Instant,
}

impl OperationTimer {
    /// Record the outcome of the operation
    pub fn finish<T>(self, result: &Result<T>) {
        let outcome = match result {
            Ok(_) => "ok",
            Err(e) => e.kind().as_str(),
        };
        record(self.op, outcome);
        Metrics::global()
            .duration
            .with_label_values(&[self.op])
            .observe(self.started.elapsed().as_secs_f64());
    }
}

/// Count one operation outcome without timing it
pub fn record(op: &str, outcome: &str) {
    Metrics::global()
        .operations
        .with_label_values(&[op, outcome])
        .inc();
}

/// Render all metrics in the Prometheus text exposition format
pub fn render() -> Result<String> {
    // Make sure the families exist even before the first operation
    let _ = Metrics::global();

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| Error::internal(format!("metrics encoding failed: {}", e)))?;
    String::from_utf8(buffer).map_err(|e| Error::internal(format!("metrics encoding failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_counts_outcome() {
        let before = Metrics::global()
            .operations
            .with_label_values(&["test_op", "NotFound"])
            .get();

        let result: Result<()> = Err(Error::not_found("s", "k"));
        Metrics::start("test_op").finish(&result);

        let after = Metrics::global()
            .operations
            .with_label_values(&["test_op", "NotFound"])
            .get();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_render_exposes_families() {
        record("render_op", "ok");
        let text = render().unwrap();
        assert!(text.contains("kv_operations_total"));
        assert!(text.contains("render_op"));
    }
}
