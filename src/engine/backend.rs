// Copyright 2024-2026 infer-pool Contributors
// SPDX-License-Identifier: Apache-2.0

//! Capability interface for the native inference backend.
//!
//! The pool and engine only ever talk to a backend through [`Backend`] and
//! [`Predictor`], so they can be exercised against an in-memory fake.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::tensor::{DataType, TensorData};

/// Default model file name produced by the provisioning step.
pub const DEFAULT_MODEL_FILE: &str = "inference.pdmodel";
/// Default parameters file name produced by the provisioning step.
pub const DEFAULT_PARAMS_FILE: &str = "inference.pdiparams";

/// Errors reported by a backend implementation.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Predictor creation failed: {0}")]
    Creation(String),

    #[error("Invalid input '{name}': {reason}")]
    InvalidInput { name: String, reason: String },

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Output '{name}' unavailable: {reason}")]
    Output { name: String, reason: String },
}

/// Errors from validating model artifacts on disk.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Model file not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("Params file not found: {}", .0.display())]
    ParamsNotFound(PathBuf),
}

/// Immutable predictor configuration, cloned once per pooled predictor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    model_path: PathBuf,
    params_path: PathBuf,
    memory_optim: bool,
}

impl ModelConfig {
    /// Configuration for a model/params pair. Memory optimization is on.
    pub fn new(model_path: impl Into<PathBuf>, params_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            params_path: params_path.into(),
            memory_optim: true,
        }
    }

    /// Configuration for the default file names inside a provisioned directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(DEFAULT_MODEL_FILE), dir.join(DEFAULT_PARAMS_FILE))
    }

    pub fn with_memory_optim(mut self, enabled: bool) -> Self {
        self.memory_optim = enabled;
        self
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn params_path(&self) -> &Path {
        &self.params_path
    }

    pub fn memory_optim(&self) -> bool {
        self.memory_optim
    }

    /// Check that both artifacts exist as regular files.
    pub fn validate(&self) -> Result<(), LoadError> {
        if !self.model_path.is_file() {
            return Err(LoadError::ModelNotFound(self.model_path.clone()));
        }
        if !self.params_path.is_file() {
            return Err(LoadError::ParamsNotFound(self.params_path.clone()));
        }
        Ok(())
    }
}

/// Element type tag as reported by the backend for an output slot.
///
/// Wider than [`DataType`]: a backend may report kinds this crate cannot
/// represent, which the engine turns into an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Float32,
    Int32,
    Int64,
    Uint8,
    Int8,
    Float16,
    Float64,
    Bool,
    Other(i32),
}

impl From<DataType> for ElementType {
    fn from(dtype: DataType) -> Self {
        match dtype {
            DataType::Float32 => Self::Float32,
            DataType::Int32 => Self::Int32,
            DataType::Int64 => Self::Int64,
            DataType::Uint8 => Self::Uint8,
            DataType::Int8 => Self::Int8,
        }
    }
}

impl TryFrom<ElementType> for DataType {
    type Error = ElementType;

    fn try_from(tag: ElementType) -> Result<Self, Self::Error> {
        match tag {
            ElementType::Float32 => Ok(DataType::Float32),
            ElementType::Int32 => Ok(DataType::Int32),
            ElementType::Int64 => Ok(DataType::Int64),
            ElementType::Uint8 => Ok(DataType::Uint8),
            ElementType::Int8 => Ok(DataType::Int8),
            other => Err(other),
        }
    }
}

/// One stateful backend session.
///
/// Input and output names are reported in the order the model declares them.
pub trait Predictor: Send {
    fn input_names(&self) -> Vec<String>;

    /// Reshape input slot `name` to `shape` and copy `data` into it.
    fn set_input(&mut self, name: &str, shape: &[usize], data: &TensorData)
        -> Result<(), BackendError>;

    /// Run the model synchronously.
    fn run(&mut self) -> Result<(), BackendError>;

    fn output_names(&self) -> Vec<String>;

    fn output_shape(&self, name: &str) -> Result<Vec<usize>, BackendError>;

    fn output_type(&self, name: &str) -> Result<ElementType, BackendError>;

    /// Copy output `name` into `dst`, which is pre-sized to the output shape.
    fn copy_output(&self, name: &str, dst: &mut TensorData) -> Result<(), BackendError>;

    /// Drop intermediate tensors and shrink held memory. No-op by default.
    fn reclaim_memory(&mut self) {}
}

/// Factory that turns a [`ModelConfig`] into a live predictor.
pub trait Backend: Send + Sync {
    type Predictor: Predictor;

    fn create_predictor(&self, config: ModelConfig) -> Result<Self::Predictor, BackendError>;
}
