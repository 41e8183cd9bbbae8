//! Inference engine module.
//!
//! Owns a fixed pool of predictors created from one model configuration and
//! runs tensor-in, tensor-out calls against it. The native runtime sits
//! behind the [`Backend`] / [`Predictor`] traits.

pub mod backend;
pub mod error;
pub mod mock;
pub mod pool;

mod inference;

pub use backend::{Backend, BackendError, ElementType, LoadError, ModelConfig, Predictor};
pub use backend::{DEFAULT_MODEL_FILE, DEFAULT_PARAMS_FILE};
pub use error::InferenceError;
pub use inference::{EngineConfig, InferenceEngine};
pub use mock::{FailAt, MockBackend, MockCounters, MockPredictor};
pub use pool::{PoolStats, PooledPredictor, PredictorPool};
