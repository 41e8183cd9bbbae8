// Copyright 2024-2026 infer-pool Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-memory backend for tests and benchmarks.
//!
//! A [`MockBackend`] describes a model by its input names and output slots.
//! Outputs either return a fixed tensor or echo one of the bound inputs.
//! Failures can be injected at any stage of a call, and shared
//! [`MockCounters`] record what every predictor did.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::backend::{Backend, BackendError, ElementType, ModelConfig, Predictor};
use crate::tensor::{Tensor, TensorData};

/// Stage of a call at which a mock predictor fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Creation,
    SetInput,
    Run,
    Output,
}

#[derive(Debug, Clone)]
enum OutputSource {
    Fixed { tag: ElementType, tensor: Tensor },
    Echo(String),
}

#[derive(Debug, Clone)]
struct OutputSlot {
    name: String,
    source: OutputSource,
    /// Shape reported in place of the source tensor's own.
    reported_shape: Option<Vec<usize>>,
}

/// Activity counters shared by every predictor a backend creates.
#[derive(Debug, Default)]
pub struct MockCounters {
    created: AtomicUsize,
    runs: AtomicUsize,
    reclaims: AtomicUsize,
    running: AtomicUsize,
    peak_running: AtomicUsize,
}

impl MockCounters {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Completed `run` calls, failed ones included.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn reclaims(&self) -> usize {
        self.reclaims.load(Ordering::SeqCst)
    }

    /// Most runs ever in flight at the same moment.
    pub fn peak_running(&self) -> usize {
        self.peak_running.load(Ordering::SeqCst)
    }
}

/// Scriptable backend whose predictors never touch native code.
#[derive(Debug, Clone)]
pub struct MockBackend {
    inputs: Vec<String>,
    outputs: Vec<OutputSlot>,
    fail_at: Option<FailAt>,
    run_delay: Duration,
    counters: Arc<MockCounters>,
}

impl MockBackend {
    pub fn new(inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: Vec::new(),
            fail_at: None,
            run_delay: Duration::ZERO,
            counters: Arc::new(MockCounters::default()),
        }
    }

    /// Output that always returns `tensor`, tagged with its own kind.
    pub fn with_output(self, name: &str, tensor: Tensor) -> Self {
        let tag = ElementType::from(tensor.data_type());
        self.with_tagged_output(name, tag, tensor)
    }

    /// Output that reports `tag` regardless of the data it holds.
    pub fn with_tagged_output(mut self, name: &str, tag: ElementType, tensor: Tensor) -> Self {
        self.outputs.push(OutputSlot {
            name: name.to_string(),
            source: OutputSource::Fixed { tag, tensor },
            reported_shape: None,
        });
        self
    }

    /// Output that returns whatever was bound to `input`.
    pub fn with_echo_output(mut self, name: &str, input: &str) -> Self {
        self.outputs.push(OutputSlot {
            name: name.to_string(),
            source: OutputSource::Echo(input.to_string()),
            reported_shape: None,
        });
        self
    }

    /// Make output `name` report `shape` whatever it actually holds.
    pub fn with_reported_shape(mut self, name: &str, shape: &[usize]) -> Self {
        if let Some(slot) = self.outputs.iter_mut().find(|o| o.name == name) {
            slot.reported_shape = Some(shape.to_vec());
        }
        self
    }

    pub fn with_failure(mut self, stage: FailAt) -> Self {
        self.fail_at = Some(stage);
        self
    }

    /// Make every run block for `delay`.
    pub fn with_run_delay(mut self, delay: Duration) -> Self {
        self.run_delay = delay;
        self
    }

    pub fn counters(&self) -> Arc<MockCounters> {
        self.counters.clone()
    }
}

impl Backend for MockBackend {
    type Predictor = MockPredictor;

    fn create_predictor(&self, config: ModelConfig) -> Result<MockPredictor, BackendError> {
        if self.fail_at == Some(FailAt::Creation) {
            return Err(BackendError::Creation(format!(
                "cannot load {}",
                config.model_path().display()
            )));
        }
        let id = self.counters.created.fetch_add(1, Ordering::SeqCst);
        Ok(MockPredictor {
            id,
            config,
            backend: self.clone(),
            bound: HashMap::new(),
        })
    }
}

/// Predictor produced by [`MockBackend`].
#[derive(Debug)]
pub struct MockPredictor {
    id: usize,
    config: ModelConfig,
    backend: MockBackend,
    bound: HashMap<String, Tensor>,
}

impl MockPredictor {
    /// Creation order within the owning backend, starting at 0.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Number of inputs currently bound (cleared by memory reclaim).
    pub fn bound_inputs(&self) -> usize {
        self.bound.len()
    }

    fn fails_at(&self, stage: FailAt) -> bool {
        self.backend.fail_at == Some(stage)
    }

    fn slot(&self, name: &str) -> Result<&OutputSlot, BackendError> {
        self.backend
            .outputs
            .iter()
            .find(|o| o.name == name)
            .ok_or_else(|| BackendError::Output {
                name: name.to_string(),
                reason: "no such output".into(),
            })
    }

    fn resolve(&self, name: &str) -> Result<(ElementType, &Tensor), BackendError> {
        match &self.slot(name)?.source {
            OutputSource::Fixed { tag, tensor } => Ok((*tag, tensor)),
            OutputSource::Echo(input) => {
                let tensor = self.bound.get(input).ok_or_else(|| BackendError::Output {
                    name: name.to_string(),
                    reason: format!("input '{}' was never bound", input),
                })?;
                Ok((ElementType::from(tensor.data_type()), tensor))
            }
        }
    }
}

impl Predictor for MockPredictor {
    fn input_names(&self) -> Vec<String> {
        self.backend.inputs.clone()
    }

    fn set_input(
        &mut self,
        name: &str,
        shape: &[usize],
        data: &TensorData,
    ) -> Result<(), BackendError> {
        if self.fails_at(FailAt::SetInput) || !self.backend.inputs.iter().any(|n| n == name) {
            return Err(BackendError::InvalidInput {
                name: name.to_string(),
                reason: "rejected by model".into(),
            });
        }
        let tensor = Tensor::new(shape.to_vec(), data.clone()).map_err(|e| {
            BackendError::InvalidInput {
                name: name.to_string(),
                reason: e.to_string(),
            }
        })?;
        self.bound.insert(name.to_string(), tensor);
        Ok(())
    }

    fn run(&mut self) -> Result<(), BackendError> {
        let counters = &self.backend.counters;
        let running = counters.running.fetch_add(1, Ordering::SeqCst) + 1;
        counters.peak_running.fetch_max(running, Ordering::SeqCst);
        if !self.backend.run_delay.is_zero() {
            std::thread::sleep(self.backend.run_delay);
        }
        counters.running.fetch_sub(1, Ordering::SeqCst);
        counters.runs.fetch_add(1, Ordering::SeqCst);

        if self.fails_at(FailAt::Run) {
            return Err(BackendError::Execution("injected failure".into()));
        }
        Ok(())
    }

    fn output_names(&self) -> Vec<String> {
        self.backend.outputs.iter().map(|o| o.name.clone()).collect()
    }

    fn output_shape(&self, name: &str) -> Result<Vec<usize>, BackendError> {
        if let Some(shape) = &self.slot(name)?.reported_shape {
            return Ok(shape.clone());
        }
        let (_, tensor) = self.resolve(name)?;
        Ok(tensor.shape().to_vec())
    }

    fn output_type(&self, name: &str) -> Result<ElementType, BackendError> {
        let (tag, _) = self.resolve(name)?;
        Ok(tag)
    }

    fn copy_output(&self, name: &str, dst: &mut TensorData) -> Result<(), BackendError> {
        let (_, tensor) = self.resolve(name)?;
        if self.fails_at(FailAt::Output)
            || dst.data_type() != tensor.data_type()
            || dst.len() != tensor.len()
        {
            return Err(BackendError::Output {
                name: name.to_string(),
                reason: "copy to host failed".into(),
            });
        }
        *dst = tensor.data().clone();
        Ok(())
    }

    fn reclaim_memory(&mut self) {
        self.bound.clear();
        self.backend.counters.reclaims.fetch_add(1, Ordering::SeqCst);
    }
}
