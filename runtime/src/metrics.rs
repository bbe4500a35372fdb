//! Prometheus metrics for observability and monitoring.
//!
//! This module provides the exporter and the store-level recorders:
//! - Commands processed and reducer latency
//! - Effects executed by kind
//! - Actions rejected during shutdown
//!
//! Ledger-specific metrics (operations, rejections, escrow) are registered by
//! the ledger crate on top of these.
//!
//! # Example
//!
//! ```rust,no_run
//! use turnstile_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other crates
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Exposes metrics on an HTTP endpoint for Prometheus scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Install the Prometheus recorder and start the HTTP listener.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed. A recorder
    /// that is already installed (e.g. by another test) is not an error.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        let (recorder, exporter) = builder
            .build()
            .map_err(|e| MetricsError::Build(e.to_string()))?;
        let handle = recorder.handle();

        match metrics::set_global_recorder(recorder) {
            Ok(()) => {
                tokio::spawn(async move {
                    // `ExporterError` implements neither `Debug` nor `Display` in
                    // metrics-exporter-prometheus 0.15, so it cannot be logged.
                    if exporter.await.is_err() {
                        tracing::error!("Metrics exporter stopped");
                    }
                });
                self.handle = Some(handle);
                tracing::info!(
                    addr = %self.addr,
                    "Metrics available at http://{}/metrics",
                    self.addr
                );
                Ok(())
            },
            Err(_) => {
                tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                Ok(())
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this server did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register store metric descriptions.
fn register_metrics() {
    describe_counter!(
        "store_commands_total",
        "Total number of actions processed by the store"
    );
    describe_histogram!(
        "store_reducer_duration_seconds",
        "Time spent inside the reducer while holding the write lock"
    );
    describe_histogram!(
        "store_effects_count",
        "Number of effects returned per action"
    );
    describe_counter!(
        "store_effects_executed_total",
        "Total number of effects executed, by type"
    );
    describe_counter!(
        "store_shutdown_rejected_actions_total",
        "Actions rejected because the store was shutting down"
    );
}

/// Store metrics recorder.
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record one action passing through the reducer.
    pub fn record_command(duration: Duration, effects: usize) {
        counter!("store_commands_total").increment(1);
        histogram!("store_reducer_duration_seconds").record(duration.as_secs_f64());
        // Precision loss acceptable for metrics (effect counts < 2^52)
        #[allow(clippy::cast_precision_loss)]
        histogram!("store_effects_count").record(effects as f64);
    }

    /// Record an effect execution.
    pub fn record_effect(kind: &'static str) {
        counter!("store_effects_executed_total", "type" => kind).increment(1);
    }

    /// Record an action rejected during shutdown.
    pub fn record_shutdown_rejection() {
        counter!("store_shutdown_rejected_actions_total").increment(1);
    }
}
