//! Download metrics
//!
//! Counters and histograms emitted through the `metrics` facade. Nothing is
//! recorded anywhere until a recorder is installed; [`init_metrics`] installs
//! the Prometheus exporter.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::feed::{ErrorCategory, FeedPath};

static METRICS_INITIALIZED: OnceCell<SocketAddr> = OnceCell::new();

/// Install the Prometheus exporter and register metric descriptions.
///
/// Idempotent: later calls are no-ops.
///
/// # Arguments
/// * `addr` - Socket address for the scrape endpoint (e.g. "0.0.0.0:9090")
pub fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INITIALIZED.get().is_some() {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "feed_chunks_total",
        Unit::Count,
        "Total number of feed chunks received"
    );
    describe_counter!(
        "feed_bytes_total",
        Unit::Bytes,
        "Total number of feed bytes written to sinks"
    );
    describe_counter!(
        "feed_downloads_completed_total",
        Unit::Count,
        "Total number of feed downloads completed"
    );
    describe_counter!(
        "feed_downloads_failed_total",
        Unit::Count,
        "Total number of feed downloads that failed"
    );
    describe_histogram!(
        "feed_download_duration_seconds",
        Unit::Seconds,
        "Feed download duration in seconds"
    );

    let _ = METRICS_INITIALIZED.set(addr);
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

/// Whether [`init_metrics`] has run.
pub fn is_initialized() -> bool {
    METRICS_INITIALIZED.get().is_some()
}

/// Metrics for one download call
#[derive(Debug)]
pub struct DownloadMetrics {
    path: &'static str,
    category_id: String,
    start_time: Instant,
    chunks: u64,
    bytes: u64,
}

impl DownloadMetrics {
    /// Start tracking a download.
    pub fn start(path: FeedPath, category_id: impl Into<String>) -> Self {
        Self {
            path: path.as_str(),
            category_id: category_id.into(),
            start_time: Instant::now(),
            chunks: 0,
            bytes: 0,
        }
    }

    /// Record one chunk of `bytes` copied into the sink.
    pub fn record_chunk(&mut self, bytes: u64) {
        self.chunks += 1;
        self.bytes += bytes;
        counter!("feed_chunks_total", "path" => self.path).increment(1);
        counter!("feed_bytes_total", "path" => self.path).increment(bytes);
    }

    /// Chunks recorded so far.
    pub fn chunks(&self) -> u64 {
        self.chunks
    }

    /// Bytes recorded so far.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Record a completed download with the reported feed size.
    pub fn record_success(&self, size: u64) {
        let duration = self.start_time.elapsed();

        counter!("feed_downloads_completed_total", "path" => self.path).increment(1);
        histogram!("feed_download_duration_seconds", "path" => self.path)
            .record(duration.as_secs_f64());

        info!(
            path = self.path,
            category_id = %self.category_id,
            chunks = self.chunks,
            bytes = self.bytes,
            size = size,
            duration_ms = duration.as_millis() as u64,
            "Feed download completed"
        );
    }

    /// Record a failed download.
    pub fn record_failure(&self, category: ErrorCategory, error: &str) {
        let duration = self.start_time.elapsed();

        counter!(
            "feed_downloads_failed_total",
            "path" => self.path,
            "category" => category.as_str(),
        )
        .increment(1);

        error!(
            path = self.path,
            category_id = %self.category_id,
            category = %category,
            chunks = self.chunks,
            error = %error,
            duration_ms = duration.as_millis() as u64,
            "Feed download failed"
        );
    }
}
