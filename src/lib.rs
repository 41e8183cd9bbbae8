//! infer-pool
//!
//! Concurrent inference against one pre-loaded model through a native
//! backend, with a bounded pool of backend sessions and a shape-aware
//! numeric buffer format for moving data in and out.
//!
//! # Layout
//!
//! - [`tensor`]: type-erased [`Tensor`], typed views, and the rank-2 [`Matrix`]
//! - [`engine`]: the [`PredictorPool`] and the [`InferenceEngine`] built on it
//! - [`config`]: `INFER_POOL_*` environment configuration
//! - [`telemetry`]: `tracing` setup and per-call spans
//!
//! # Example
//!
//! ```
//! use infer_pool::engine::{InferenceEngine, MockBackend, ModelConfig};
//! use infer_pool::tensor::Tensor;
//!
//! let backend = MockBackend::new(&["x"]).with_echo_output("y", "x");
//! let engine = InferenceEngine::new(&backend, ModelConfig::in_dir("models/demo"), 2)?;
//!
//! let x = Tensor::from_2d(&[vec![1.0f32, 2.0], vec![3.0, 4.0]])?;
//! let outputs = engine.infer(&[x.clone()])?;
//! assert_eq!(outputs, vec![x]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod telemetry;
pub mod tensor;

pub use engine::{
    Backend, EngineConfig, InferenceEngine, InferenceError, ModelConfig, PooledPredictor,
    Predictor, PredictorPool,
};
pub use tensor::{DataType, Matrix, Tensor, TensorData, TensorError, TypedTensor};
