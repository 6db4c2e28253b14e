// Render service Prometheus metrics
//
// Provides:
// - Render request counters by content kind and outcome
// - Render duration histograms
// - Skipped watermark tile counters
// - Identity resolution counters by source

use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global metrics registry for the render service
pub struct RenderMetrics {
    /// Render requests by `kind` (pdf, image, passthrough, none) and `outcome`
    pub requests: IntCounterVec,

    /// End-to-end render duration by `kind` (in seconds)
    pub duration: HistogramVec,

    /// Watermark tiles skipped after a composite failure, by `kind`
    pub tiles_skipped: IntCounterVec,

    /// Identity resolutions by winning `source`
    pub identity_resolutions: IntCounterVec,
}

static METRICS: OnceLock<RenderMetrics> = OnceLock::new();

impl RenderMetrics {
    /// Initialize and return the global metrics instance
    pub fn global() -> &'static Self {
        METRICS.get_or_init(|| {
            let requests = register_int_counter_vec!(
                "inkmark_render_requests_total",
                "Total number of render requests by content kind and outcome",
                &["kind", "outcome"]
            )
            .expect("Failed to register render_requests_total metric");

            let duration = register_histogram_vec!(
                "inkmark_render_duration_seconds",
                "Duration of render requests in seconds",
                &["kind"],
                vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0] // 10ms to 60s
            )
            .expect("Failed to register render_duration_seconds metric");

            let tiles_skipped = register_int_counter_vec!(
                "inkmark_watermark_tiles_skipped_total",
                "Total number of watermark tiles skipped after a composite failure",
                &["kind"] // image, pdf
            )
            .expect("Failed to register watermark_tiles_skipped_total metric");

            let identity_resolutions = register_int_counter_vec!(
                "inkmark_identity_resolutions_total",
                "Total number of identity resolutions by winning source",
                &["source"] // caller, user_id, email, email_local_part, sentinel
            )
            .expect("Failed to register identity_resolutions_total metric");

            RenderMetrics {
                requests,
                duration,
                tiles_skipped,
                identity_resolutions,
            }
        })
    }

    pub fn record_request(&self, kind: &str, outcome: &str, seconds: f64) {
        self.requests.with_label_values(&[kind, outcome]).inc();
        self.duration.with_label_values(&[kind]).observe(seconds);
    }

    pub fn record_skipped_tiles(&self, kind: &str, count: usize) {
        if count > 0 {
            self.tiles_skipped
                .with_label_values(&[kind])
                .inc_by(count as u64);
        }
    }

    pub fn record_identity(&self, source: &str) {
        self.identity_resolutions.with_label_values(&[source]).inc();
    }
}

/// Renders every registered metric in Prometheus text format
pub fn export_text() -> String {
    // Make sure our families exist even before the first request
    RenderMetrics::global();

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
