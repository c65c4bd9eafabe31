//! Metrics collection for accessd operations
//!
//! Provides structured metrics using the `metrics` crate with Prometheus export.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

/// Initialize all metric descriptions
pub fn init_metrics_descriptions() {
    // Snapshot cache metrics
    describe_counter!("accessd_cache_hits_total", "Total number of snapshot cache hits");
    describe_counter!("accessd_cache_misses_total", "Total number of snapshot cache misses");
    describe_gauge!("accessd_cache_entries", "Current number of cached snapshots");
    describe_counter!(
        "accessd_cache_evictions_total",
        "Total number of snapshots evicted for capacity"
    );

    // Snapshot computation metrics
    describe_counter!(
        "accessd_snapshot_computations_total",
        "Total number of authorization snapshots computed from policy indexes"
    );
    describe_histogram!(
        "accessd_snapshot_compute_duration_seconds",
        "Duration of authorization snapshot computation in seconds"
    );
    describe_counter!(
        "accessd_coalesced_requests_total",
        "Total number of requests that waited on another caller's computation"
    );
    describe_counter!(
        "accessd_resolution_failures_total",
        "Total number of snapshot resolutions that failed upstream"
    );

    // Invalidation metrics
    describe_counter!("accessd_purges_total", "Total number of snapshot purges");
}

/// Record a snapshot cache lookup
pub fn record_cache_hit(hit: bool) {
    if hit {
        counter!("accessd_cache_hits_total").increment(1);
    } else {
        counter!("accessd_cache_misses_total").increment(1);
    }
}

/// Update the cached snapshot count
pub fn update_cache_entries(entries: u64) {
    gauge!("accessd_cache_entries").set(entries as f64);
}

/// Record a capacity eviction
pub fn record_cache_eviction() {
    counter!("accessd_cache_evictions_total").increment(1);
}

/// Record a completed snapshot computation
pub fn record_snapshot_computed(duration_seconds: f64, subjects: usize) {
    counter!("accessd_snapshot_computations_total").increment(1);
    histogram!("accessd_snapshot_compute_duration_seconds").record(duration_seconds);
    histogram!("accessd_snapshot_subjects").record(subjects as f64);
}

/// Record a caller that shared another caller's in-flight computation
pub fn record_coalesced_request() {
    counter!("accessd_coalesced_requests_total").increment(1);
}

/// Record a failed resolution
pub fn record_resolution_failure(reason: &str) {
    counter!("accessd_resolution_failures_total", "reason" => reason.to_string()).increment(1);
}

/// Record a purge; `scope` is `"entry"` or `"all"`
pub fn record_purge(scope: &'static str) {
    counter!("accessd_purges_total", "scope" => scope).increment(1);
}
