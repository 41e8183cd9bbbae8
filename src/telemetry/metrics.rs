//! Call and pool metrics through the `metrics` facade.
//!
//! Nothing is exported unless the embedding application installs a recorder.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

pub const CALLS_TOTAL: &str = "infer_pool_calls_total";
pub const CALL_LATENCY_MS: &str = "infer_pool_call_latency_ms";
pub const PREDICTORS_IN_USE: &str = "infer_pool_predictors_in_use";

/// Register descriptions for every metric this crate emits.
pub fn init_metrics() {
    describe_counter!(CALLS_TOTAL, Unit::Count, "Inference calls by status and failure kind");
    describe_histogram!(CALL_LATENCY_MS, Unit::Milliseconds, "Latency of successful calls");
    describe_gauge!(PREDICTORS_IN_USE, Unit::Count, "Predictors currently checked out");
}

pub fn record_call_success(latency_ms: u64) {
    counter!(CALLS_TOTAL, "status" => "ok").increment(1);
    histogram!(CALL_LATENCY_MS).record(latency_ms as f64);
}

/// `kind` is a short class such as `usage`, `backend` or `timeout`.
pub fn record_call_failure(kind: &'static str) {
    counter!(CALLS_TOTAL, "status" => "error", "kind" => kind).increment(1);
}

pub fn record_pool_in_use(in_use: usize) {
    gauge!(PREDICTORS_IN_USE).set(in_use as f64);
}
