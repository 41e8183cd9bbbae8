//! End-to-end inference calls over a predictor pool.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::warn;

use super::backend::{Backend, BackendError, ModelConfig, Predictor};
use super::error::InferenceError;
use super::pool::{PooledPredictor, PredictorPool};
use crate::telemetry::{self, CallSpan, SpanExt};
use crate::tensor::{checked_num_elements, DataType, Tensor, TensorData};

/// Engine sizing and checkout policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of predictors, and so the number of calls that can run at once.
    pub max_concurrency: usize,
    /// How long a call may wait for a predictor. None = wait forever.
    pub checkout_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: num_cpus::get().max(1),
            checkout_timeout: None,
        }
    }
}

/// Runs inference calls against a fixed pool of predictors.
pub struct InferenceEngine<P> {
    pool: PredictorPool<P>,
    checkout_timeout: Option<Duration>,
}

impl<P: Predictor> InferenceEngine<P> {
    /// Create an engine with `max_concurrency` predictors built from `model`.
    pub fn new<B>(backend: &B, model: ModelConfig, max_concurrency: usize) -> Result<Self, InferenceError>
    where
        B: Backend<Predictor = P>,
    {
        let config = EngineConfig {
            max_concurrency,
            ..Default::default()
        };
        Self::with_config(backend, model, &config)
    }

    pub fn with_config<B>(
        backend: &B,
        model: ModelConfig,
        config: &EngineConfig,
    ) -> Result<Self, InferenceError>
    where
        B: Backend<Predictor = P>,
    {
        let pool = PredictorPool::from_backend(backend, &model, config.max_concurrency)?;
        Ok(Self {
            pool,
            checkout_timeout: config.checkout_timeout,
        })
    }

    /// Wrap an existing pool. Checkout waits forever.
    pub fn from_pool(pool: PredictorPool<P>) -> Self {
        Self {
            pool,
            checkout_timeout: None,
        }
    }

    pub fn pool(&self) -> &PredictorPool<P> {
        &self.pool
    }

    /// Run one call with inputs given in the model's declared input order.
    pub fn infer(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>, InferenceError> {
        self.execute(inputs.len(), |names| {
            if inputs.len() != names.len() {
                return Err(InferenceError::InputCountMismatch {
                    expected: names.len(),
                    actual: inputs.len(),
                    names: names.to_vec(),
                });
            }
            Ok(inputs.iter().collect())
        })
    }

    /// Run one call with inputs keyed by input name.
    pub fn infer_named(&self, inputs: &HashMap<String, Tensor>) -> Result<Vec<Tensor>, InferenceError> {
        self.execute(inputs.len(), |names| {
            let ordered = names
                .iter()
                .map(|name| {
                    inputs
                        .get(name)
                        .ok_or_else(|| InferenceError::MissingInput(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            if inputs.len() != names.len() {
                return Err(InferenceError::InputCountMismatch {
                    expected: names.len(),
                    actual: inputs.len(),
                    names: names.to_vec(),
                });
            }
            Ok(ordered)
        })
    }

    fn checkout(&self) -> Result<PooledPredictor<'_, P>, InferenceError> {
        match self.checkout_timeout {
            None => Ok(self.pool.get()),
            Some(timeout) => self
                .pool
                .get_timeout(timeout)
                .ok_or(InferenceError::CheckoutTimeout(timeout)),
        }
    }

    fn execute<'a, F>(&self, supplied: usize, select: F) -> Result<Vec<Tensor>, InferenceError>
    where
        F: FnOnce(&[String]) -> Result<Vec<&'a Tensor>, InferenceError>,
    {
        let span = CallSpan::new(supplied);
        let _enter = span.enter();
        let start = Instant::now();

        let result = self.checkout().and_then(|mut predictor| {
            let result = run_call(&mut *predictor, select);
            // Drop intermediates before the predictor goes back to the pool.
            predictor.reclaim_memory();
            result
        });

        let latency_ms = start.elapsed().as_millis() as u64;
        span.record("latency_ms", latency_ms);
        span.record_result(&result);
        match &result {
            Ok(outputs) => {
                span.record("outputs", outputs.len());
                telemetry::record_call_success(latency_ms);
            }
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "Inference call failed");
                telemetry::record_call_failure(e.kind());
            }
        }
        result
    }
}

impl<P: Predictor + 'static> InferenceEngine<P> {
    /// Run [`infer`](Self::infer) on the blocking thread pool.
    ///
    /// Dropping the returned future (for example under `tokio::time::timeout`)
    /// stops waiting for the result, but a call that already holds a predictor
    /// runs to completion before that predictor is released.
    pub async fn infer_async(self: Arc<Self>, inputs: Vec<Tensor>) -> Result<Vec<Tensor>, InferenceError> {
        tokio::task::spawn_blocking(move || self.infer(&inputs))
            .await
            .map_err(|e| InferenceError::Join(e.to_string()))?
    }
}

fn run_call<'a, P, F>(predictor: &mut P, select: F) -> Result<Vec<Tensor>, InferenceError>
where
    P: Predictor,
    F: FnOnce(&[String]) -> Result<Vec<&'a Tensor>, InferenceError>,
{
    let names = predictor.input_names();
    let inputs = select(&names)?;

    for (name, tensor) in names.iter().zip(inputs) {
        predictor.set_input(name, tensor.shape(), tensor.data())?;
    }

    predictor.run()?;

    let predictor: &P = predictor;
    predictor
        .output_names()
        .iter()
        .map(|name| read_output(predictor, name))
        .collect()
}

fn read_output<P: Predictor>(predictor: &P, name: &str) -> Result<Tensor, InferenceError> {
    let shape = predictor.output_shape(name)?;
    let dtype = DataType::try_from(predictor.output_type(name)?).map_err(|tag| {
        InferenceError::UnsupportedOutputType {
            name: name.to_string(),
            tag,
        }
    })?;

    let len = checked_num_elements(&shape).ok_or_else(|| BackendError::Output {
        name: name.to_string(),
        reason: format!("shape {:?} overflows the element count", shape),
    })?;
    let mut data = TensorData::zeros(dtype, len);
    predictor.copy_output(name, &mut data)?;

    Tensor::new(shape, data).map_err(|e| {
        BackendError::Output {
            name: name.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
#[path = "inference_tests.rs"]
mod tests;
