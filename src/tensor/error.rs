//! Tensor error types.
//!
//! All errors are fail-closed: malformed buffers are rejected, not reshaped.

use thiserror::Error;

/// Errors raised while building or mutating tensors and matrices.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TensorError {
    #[error("Ragged input at depth {depth}: expected length {expected}, got {actual}")]
    Ragged {
        depth: usize,
        expected: usize,
        actual: usize,
    },

    /// `expected` is `usize::MAX` when the shape's element count overflows.
    #[error("Buffer length {actual} does not match shape {shape:?} ({expected} elements)")]
    LengthMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("Tensor of rank {0} is not a matrix")]
    NotAMatrix(usize),

    #[error("Range rows {rows:?} x cols {cols:?} out of bounds for {dims:?} matrix")]
    OutOfBounds {
        rows: (usize, usize),
        cols: (usize, usize),
        dims: (usize, usize),
    },
}
