//! ONNX Runtime backend implementation
//!
//! Runs the model with ONNX Runtime on the CPU, or on a CUDA device when an
//! accelerated execution target is configured.

use crate::config::{ExecutionTarget, PipelineConfig};
use crate::error::{BgRemovalError, Result};
use crate::inference::InferenceBackend;
use ndarray::{Array4, ArrayD};
use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider as OrtExecutionProvider};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// ONNX Runtime backend for running background removal models
#[derive(Debug)]
pub struct OnnxBackend {
    session: Mutex<Session>,
    execution_target: ExecutionTarget,
}

impl OnnxBackend {
    /// List ONNX Runtime execution providers with availability status and descriptions
    pub fn list_providers() -> Vec<(String, bool, String)> {
        let cuda_available =
            OrtExecutionProvider::is_available(&CUDAExecutionProvider::default()).unwrap_or(false);
        vec![
            (
                "CPU".to_string(),
                true,
                "Always available, default execution target".to_string(),
            ),
            (
                "CUDA".to_string(),
                cuda_available,
                "NVIDIA GPU acceleration, selected with a device index".to_string(),
            ),
        ]
    }

    /// Load a model from memory and create the session
    ///
    /// # Errors
    /// Every failure here is a configuration error: unloadable model data,
    /// unavailable CUDA provider, or a model without the configured input name.
    pub fn from_memory(model_data: &[u8], config: &PipelineConfig) -> Result<Self> {
        let model_load_start = instant::Instant::now();

        let mut session_builder = Session::builder()
            .map_err(|e| {
                BgRemovalError::configuration(format!("Failed to create session builder: {e}"))
            })?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                BgRemovalError::configuration(format!("Failed to set optimization level: {e}"))
            })?;

        session_builder = match config.execution_target {
            ExecutionTarget::Default => {
                log::info!("Using CPU execution provider");
                session_builder
            },
            ExecutionTarget::Accelerated(device) => {
                let device_id = i32::try_from(device).map_err(|_| {
                    BgRemovalError::config_value_error("CUDA device index", device, "0-2147483647")
                })?;
                let cuda_provider = CUDAExecutionProvider::default().with_device_id(device_id);
                if !OrtExecutionProvider::is_available(&cuda_provider).unwrap_or(false) {
                    return Err(BgRemovalError::configuration(format!(
                        "CUDA execution provider requested for device {device} but not available"
                    )));
                }
                log::info!("Using CUDA execution provider on device {device}");
                session_builder
                    .with_execution_providers([cuda_provider.build().error_on_failure()])
                    .map_err(|e| {
                        BgRemovalError::configuration(format!(
                            "Failed to set CUDA execution provider: {e}"
                        ))
                    })?
            },
        };

        if config.intra_threads > 0 {
            session_builder = session_builder
                .with_intra_threads(config.intra_threads)
                .map_err(|e| {
                    BgRemovalError::configuration(format!("Failed to set intra threads: {e}"))
                })?;
        }

        let session = session_builder.commit_from_memory(model_data).map_err(|e| {
            BgRemovalError::configuration(format!("Failed to create session from model data: {e}"))
        })?;

        let input_name = &config.model.input_parameter_name;
        if !session.inputs.iter().any(|input| &input.name == input_name) {
            let available: Vec<&str> = session.inputs.iter().map(|i| i.name.as_str()).collect();
            return Err(BgRemovalError::configuration(format!(
                "Model has no input named '{}' (available: {})",
                input_name,
                available.join(", ")
            )));
        }

        log::debug!("ONNX Runtime session created");
        log::debug!("  - Execution target: {}", config.execution_target);
        log::debug!("  - Optimization level: Level3");
        log::debug!("  - Input: {input_name}");
        log::info!(
            "Model loading complete: {:.0}ms",
            model_load_start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(Self {
            session: Mutex::new(session),
            execution_target: config.execution_target,
        })
    }
}

/// Lock the shared session, recovering it if a previous call panicked
///
/// A panic during one call leaves nothing half-updated in the session, so the
/// next call may use it as is.
fn lock_session<T>(session: &Mutex<T>) -> MutexGuard<'_, T> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InferenceBackend for OnnxBackend {
    fn infer(&self, input_name: &str, input: &Array4<f32>) -> Result<ArrayD<f32>> {
        let inference_start = instant::Instant::now();
        log::debug!("Starting inference with input shape: {:?}", input.dim());

        let input_value = Tensor::from_array(input.clone()).map_err(|e| {
            BgRemovalError::inference(format!("Failed to convert input tensor: {e}"))
        })?;

        let output = {
            let mut session = lock_session(&self.session);

            let outputs = session
                .run(ort::inputs![input_name => input_value])
                .map_err(|e| BgRemovalError::inference(format!("ONNX inference failed: {e}")))?;

            // First output by position; output names vary between exported models
            let keys: Vec<_> = outputs.keys().collect();
            let Some(first_key) = keys.first() else {
                return Err(BgRemovalError::unusable_output("No output tensors found"));
            };
            let output_view = outputs
                .get(first_key)
                .ok_or_else(|| BgRemovalError::unusable_output("First output tensor not found"))?
                .try_extract_array::<f32>()
                .map_err(|e| {
                    BgRemovalError::unusable_output(format!(
                        "Failed to extract f32 output tensor: {e}"
                    ))
                })?;
            output_view.to_owned()
        };

        log::debug!(
            "Inference complete: {:.2}ms, output shape {:?}",
            inference_start.elapsed().as_secs_f64() * 1000.0,
            output.shape()
        );
        Ok(output)
    }

    fn name(&self) -> &'static str {
        "onnx"
    }

    fn execution_target(&self) -> ExecutionTarget {
        self.execution_target
    }
}
