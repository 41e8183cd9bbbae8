//! Telemetry for the inference pool.
//!
//! Structured logging via `tracing-subscriber`, per-call spans, and
//! metrics through the `metrics` facade.

mod logging;
pub(crate) mod metrics;
mod spans;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use self::metrics::{
    init_metrics, record_call_failure, record_call_success, record_pool_in_use,
};
pub use spans::{CallSpan, SpanExt};
