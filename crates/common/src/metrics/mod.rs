//! Metrics and observability utilities
//!
//! Prometheus-style metrics recorded through the `metrics` facade. Binaries
//! decide whether an exporter is installed; without one every call is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics prefix for all JurisRAG metrics
pub const METRICS_PREFIX: &str = "jurisrag";

/// Histogram buckets for end-to-end query latency (in seconds).
/// Each query makes two or three model round-trips, so the range is wide.
pub const QUERY_BUCKETS: &[f64] = &[
    0.250, 0.500, 1.000, 2.000, 3.000, 5.000, 8.000, 13.00, 21.00, 34.00, 60.00,
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total pipeline runs by intent and search type"
    );

    describe_histogram!(
        format!("{}_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end pipeline latency in seconds"
    );

    describe_histogram!(
        format!("{}_cases_returned", METRICS_PREFIX),
        Unit::Count,
        "Number of unique cases handed to the synthesizer"
    );

    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API requests"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );

    describe_counter!(
        format!("{}_index_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total vector index queries"
    );

    describe_histogram!(
        format!("{}_index_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Vector index query latency in seconds"
    );

    describe_counter!(
        format!("{}_llm_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total chat completion requests"
    );

    describe_histogram!(
        format!("{}_llm_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Chat completion latency in seconds"
    );

    tracing::info!("Metrics registered");
}

fn status_label(success: bool) -> &'static str {
    if success { "success" } else { "error" }
}

/// Record a completed pipeline run
pub fn record_query(duration_secs: f64, intent: &str, search_type: &str, cases: usize) {
    counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        "intent" => intent.to_string(),
        "search_type" => search_type.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_query_duration_seconds", METRICS_PREFIX),
        "intent" => intent.to_string()
    )
    .record(duration_secs);

    histogram!(format!("{}_cases_returned", METRICS_PREFIX)).record(cases as f64);
}

/// Record an embedding request
pub fn record_embedding(duration_secs: f64, model: &str, success: bool) {
    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status_label(success)
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    }
}

/// Record a vector index query
pub fn record_index_query(duration_secs: f64, limit: usize, success: bool) {
    counter!(
        format!("{}_index_queries_total", METRICS_PREFIX),
        "status" => status_label(success)
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_index_query_duration_seconds", METRICS_PREFIX),
            "limit" => limit.to_string()
        )
        .record(duration_secs);
    }
}

/// Record a chat completion call
pub fn record_llm(duration_secs: f64, model: &str, success: bool) {
    counter!(
        format!("{}_llm_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status_label(success)
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_llm_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in QUERY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_recording_without_exporter() {
        // No recorder installed: calls must be no-ops
        record_query(1.2, "legal_query", "hybrid", 15);
        record_embedding(0.1, "mock", true);
        record_index_query(0.05, 300, false);
        record_llm(0.8, "mock", true);
    }
}
