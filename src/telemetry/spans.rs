//! Span utilities and extension traits for inference tracing.
//!
//! Provides standardized span creation and result recording.

use tracing::{info_span, Span};

/// Extension trait for adding context to spans.
pub trait SpanExt {
    /// Record the result of an operation into the span.
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display;
}

impl SpanExt for Span {
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(_) => {
                self.record("status", "ok");
            }
            Err(e) => {
                self.record("status", "error");
                self.record("error.message", e.to_string().as_str());
            }
        }
    }
}

/// Factory for creating standardized inference call spans.
pub struct CallSpan;

impl CallSpan {
    /// Create a new call span with standard fields.
    ///
    /// Fields included:
    /// - `inputs`: Number of tensors supplied by the caller
    /// - `status`: To be filled in by `SpanExt::record_result`
    /// - `error.message`: To be filled in on error
    /// - `latency_ms`: To be filled in after completion
    /// - `outputs`: Number of tensors produced
    pub fn new(inputs: usize) -> Span {
        info_span!(
            "inference_call",
            inputs,
            status = tracing::field::Empty,
            error.message = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
            outputs = tracing::field::Empty,
        )
    }
}
