//! Inference error types.
//!
//! Every error is fatal to the call that raised it and to nothing else; the
//! predictor it held has already been returned to the pool.

use std::time::Duration;

use thiserror::Error;

use super::backend::{BackendError, ElementType, LoadError};
use crate::tensor::TensorError;

/// Errors that can occur while building an engine or running a call.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Max concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("Inputs mismatch: model expects {expected} ({names:?}), got {actual}")]
    InputCountMismatch {
        expected: usize,
        actual: usize,
        names: Vec<String>,
    },

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Unknown output data type {tag:?} for output '{name}'")]
    UnsupportedOutputType { name: String, tag: ElementType },

    #[error("No predictor available after {0:?}")]
    CheckoutTimeout(Duration),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Model artifacts invalid: {0}")]
    Load(#[from] LoadError),

    #[error("Tensor error: {0}")]
    Tensor(#[from] TensorError),

    #[error("Inference task failed: {0}")]
    Join(String),
}

impl InferenceError {
    /// Returns true if the caller supplied bad inputs.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::InputCountMismatch { .. }
                | Self::MissingInput(_)
                | Self::Tensor(_)
                | Self::Backend(BackendError::InvalidInput { .. })
        )
    }

    /// Returns true if the failure came from the backend itself.
    pub fn is_backend_error(&self) -> bool {
        match self {
            Self::UnsupportedOutputType { .. } => true,
            Self::Backend(e) => !matches!(e, BackendError::InvalidInput { .. }),
            _ => false,
        }
    }

    /// Short failure class used as a metrics label.
    pub fn kind(&self) -> &'static str {
        if self.is_usage_error() {
            return "usage";
        }
        if self.is_backend_error() {
            return "backend";
        }
        match self {
            Self::CheckoutTimeout(_) => "timeout",
            Self::InvalidConcurrency | Self::Load(_) => "config",
            _ => "internal",
        }
    }
}
