//! Metrics definitions for the storage node.

/// Metrics key for shares accepted via `/sign_cryption`.
pub const METRICS_ID_NODE_SHARES_STORED: &str = "shardvault.node.shares.stored";
/// Metrics key for shares served via `/download_request`.
pub const METRICS_ID_NODE_SHARES_SERVED: &str = "shardvault.node.shares.served";
/// Metrics key for rejected coordinator signatures.
pub const METRICS_ID_NODE_SIGNATURE_FAILURES: &str = "shardvault.node.signature.failures";

/// Describe all metrics used by the node.
pub fn describe_metrics() {
    metrics::describe_counter!(
        METRICS_ID_NODE_SHARES_STORED,
        metrics::Unit::Count,
        "Number of shares accepted via /sign_cryption"
    );
    metrics::describe_counter!(
        METRICS_ID_NODE_SHARES_SERVED,
        metrics::Unit::Count,
        "Number of shares re-encrypted and served via /download_request"
    );
    metrics::describe_counter!(
        METRICS_ID_NODE_SIGNATURE_FAILURES,
        metrics::Unit::Count,
        "Number of inbound shares rejected for a bad coordinator signature"
    );
}
