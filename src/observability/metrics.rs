//! Metrics collection.
//!
//! # Metrics
//! - `retry_attempts_total` (counter): submissions by operation and outcome
//! - `rpc_requests_total` (counter): JSON-RPC calls by method and status
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Label values are static strings to keep cardinality bounded

/// Record the outcome of one submission made by the retry executor.
///
/// `outcome` is one of `success`, `rate_limited`, `fatal`, `confirmation_failed`.
pub fn record_retry_attempt(operation: &'static str, outcome: &'static str) {
    ::metrics::counter!(
        "retry_attempts_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a JSON-RPC call and how it ended.
///
/// `status` is one of `ok`, `rate_limited`, `rpc_error`, `transport_error`, `timeout`.
pub fn record_rpc_request(method: &'static str, status: &'static str) {
    ::metrics::counter!(
        "rpc_requests_total",
        "method" => method,
        "status" => status
    )
    .increment(1);
}
