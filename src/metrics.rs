//! Observability metrics for the photo pipeline
//!
//! Uses the `metrics` facade so recording is a no-op until a recorder is
//! installed. [`init_metrics`] installs a Prometheus exporter with its own
//! scrape listener; the CLI only does this when `--metrics-addr` is given.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::{ObservationDate, Rover};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Initialize metrics system with Prometheus exporter
///
/// Idempotent: later calls are ignored once a recorder is installed.
///
/// # Arguments
/// * `addr` - Socket address for the scrape endpoint (e.g., "0.0.0.0:9090")
pub fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        METRICS_INITIALIZED.store(false, Ordering::SeqCst);
        return Err(format!("Failed to install Prometheus exporter: {e}").into());
    }

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Total number of HTTP requests made to the photo API and image hosts"
    );

    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration in seconds"
    );

    describe_counter!(
        "photos_downloaded_total",
        Unit::Count,
        "Photos downloaded and written to the cache"
    );

    describe_counter!(
        "photos_downloaded_bytes_total",
        Unit::Bytes,
        "Bytes of photo data written to the cache"
    );

    describe_counter!(
        "photos_skipped_total",
        Unit::Count,
        "Photos already present in the cache"
    );

    describe_counter!(
        "no_photo_markers_total",
        Unit::Count,
        "Dates recorded as having no photos"
    );

    describe_counter!(
        "date_batches_completed_total",
        Unit::Count,
        "Rover/date batches that settled without failure"
    );

    describe_counter!(
        "date_batches_failed_total",
        Unit::Count,
        "Rover/date batches that failed or were cancelled"
    );

    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Generate a new correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Record an HTTP request with timing
pub struct HttpRequestMetrics {
    endpoint: &'static str,
    start_time: Instant,
    correlation_id: String,
}

impl HttpRequestMetrics {
    /// Start recording a new HTTP request
    pub fn start(endpoint: &'static str) -> Self {
        let correlation_id = generate_correlation_id();
        debug!(
            correlation_id = %correlation_id,
            endpoint = endpoint,
            "Starting HTTP request"
        );

        Self {
            endpoint,
            start_time: Instant::now(),
            correlation_id,
        }
    }

    /// Record completion of the HTTP request
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint,
            "status" => status_code.to_string(),
        )
        .increment(1);

        histogram!(
            "http_request_duration_seconds",
            "endpoint" => self.endpoint,
        )
        .record(duration.as_secs_f64());

        if status_code == 429 {
            warn!(
                correlation_id = %self.correlation_id,
                endpoint = self.endpoint,
                "Rate limit error (429) from photo API"
            );
        }

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = self.endpoint,
            status = status_code,
            duration_ms = duration.as_millis(),
            "HTTP request completed"
        );
    }

    /// Record a network error (no status code)
    pub fn record_network_error(&self) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint,
            "status" => "network_error",
        )
        .increment(1);

        warn!(
            correlation_id = %self.correlation_id,
            endpoint = self.endpoint,
            duration_ms = duration.as_millis(),
            "Network error recorded"
        );
    }

    /// Get the correlation ID for this request
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Record one photo written to the cache
pub fn record_photo_written(rover: Rover, bytes: usize) {
    counter!("photos_downloaded_total", "rover" => rover.name()).increment(1);
    counter!("photos_downloaded_bytes_total", "rover" => rover.name()).increment(bytes as u64);
}

/// Record photos that were already cached
pub fn record_photos_skipped(rover: Rover, count: usize) {
    if count > 0 {
        counter!("photos_skipped_total", "rover" => rover.name()).increment(count as u64);
    }
}

/// Record a "no photos" marker write
pub fn record_no_photos_marker(rover: Rover) {
    counter!("no_photo_markers_total", "rover" => rover.name()).increment(1);
}

/// Metrics for one rover/date batch
pub struct BatchMetrics {
    rover: Rover,
    date: ObservationDate,
    start_time: Instant,
}

impl BatchMetrics {
    /// Start tracking a batch
    pub fn start(rover: Rover, date: ObservationDate) -> Self {
        Self {
            rover,
            date,
            start_time: Instant::now(),
        }
    }

    /// Record a batch that settled without failure
    pub fn record_success(&self, downloaded: usize, skipped: usize) {
        counter!("date_batches_completed_total", "rover" => self.rover.name()).increment(1);

        info!(
            rover = %self.rover,
            date = %self.date,
            downloaded = downloaded,
            skipped = skipped,
            duration_ms = self.start_time.elapsed().as_millis(),
            "Date batch completed"
        );
    }

    /// Record a failed or cancelled batch
    pub fn record_failure(&self, error: &str) {
        counter!("date_batches_failed_total", "rover" => self.rover.name()).increment(1);

        error!(
            rover = %self.rover,
            date = %self.date,
            error = %error,
            duration_ms = self.start_time.elapsed().as_millis(),
            "Date batch failed"
        );
    }
}
