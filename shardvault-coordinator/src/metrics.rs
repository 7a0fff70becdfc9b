//! Metrics definitions for the coordinator.

/// Metrics key for accepted file uploads.
pub const METRICS_ID_COORDINATOR_FILES_UPLOADED: &str = "shardvault.coordinator.files.uploaded";
/// Metrics key for shares collected during download aggregation.
pub const METRICS_ID_COORDINATOR_SHARES_COLLECTED: &str =
    "shardvault.coordinator.shares.collected";
/// Metrics key for failed node fan-out calls.
pub const METRICS_ID_COORDINATOR_FANOUT_FAILURES: &str =
    "shardvault.coordinator.fanout.failures";

/// Describe all metrics used by the coordinator.
pub fn describe_metrics() {
    metrics::describe_counter!(
        METRICS_ID_COORDINATOR_FILES_UPLOADED,
        metrics::Unit::Count,
        "Number of accepted file uploads"
    );
    metrics::describe_counter!(
        METRICS_ID_COORDINATOR_SHARES_COLLECTED,
        metrics::Unit::Count,
        "Number of re-encrypted shares collected from nodes"
    );
    metrics::describe_counter!(
        METRICS_ID_COORDINATOR_FANOUT_FAILURES,
        metrics::Unit::Count,
        "Number of failed share fan-out calls to nodes"
    );
}
