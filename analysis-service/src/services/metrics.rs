//! Metrics module for analysis-service.
//! Provides Prometheus metrics for analyzer calls and CSV uploads.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_histogram, register_int_counter_vec, Encoder, Histogram,
    IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Rows per accepted CSV upload.
pub static CSV_ROWS_PER_UPLOAD: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(histogram_opts!(
        "analysis_csv_rows_per_upload",
        "Transaction rows per accepted CSV upload"
    ))
    .expect("Failed to register CSV_ROWS_PER_UPLOAD")
});

/// Analyzer request counter by operation and outcome.
pub static ANALYZER_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// CSV upload counter by outcome.
pub static CSV_UPLOADS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    ANALYZER_REQUESTS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "analysis_analyzer_requests_total",
                "Total analyzer requests by operation and outcome"
            ),
            &["operation", "outcome"]
        )
        .expect("Failed to register ANALYZER_REQUESTS_TOTAL")
    });

    CSV_UPLOADS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "analysis_csv_uploads_total",
                "Total CSV uploads by outcome"
            ),
            &["outcome"]
        )
        .expect("Failed to register CSV_UPLOADS_TOTAL")
    });

    // Force initialization of lazy statics
    let _ = &*CSV_ROWS_PER_UPLOAD;
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Failed to convert metrics to string")
}

/// Record one analyzer request.
pub fn record_analyzer_request(operation: &str, outcome: &str) {
    if let Some(counter) = ANALYZER_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[operation, outcome]).inc();
    }
}

/// Record one CSV upload.
pub fn record_csv_upload(outcome: &str) {
    if let Some(counter) = CSV_UPLOADS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Record the row count of an accepted upload.
pub fn record_csv_rows(rows: usize) {
    CSV_ROWS_PER_UPLOAD.observe(rows as f64);
}
