//! Tract backend implementation for background removal models
//!
//! Pure Rust inference with no native runtime to install. Runs on the CPU only.

use crate::config::{ExecutionTarget, PipelineConfig};
use crate::error::{BgRemovalError, Result};
use crate::inference::InferenceBackend;
use ndarray::{Array4, ArrayD, IxDyn};
use tract_onnx::prelude::*;

/// Type alias for the complex Tract model type to reduce complexity warnings
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Tract backend for running background removal models using pure Rust inference
#[derive(Debug)]
pub struct TractBackend {
    model: TractModel,
}

impl TractBackend {
    /// Load a model from memory, pin its input shape and optimize it
    ///
    /// # Errors
    /// Configuration error when an accelerated target is requested, the model
    /// cannot be parsed or optimized, or it has no input with the configured name.
    pub fn from_memory(model_data: &[u8], config: &PipelineConfig) -> Result<Self> {
        if let ExecutionTarget::Accelerated(device) = config.execution_target {
            return Err(BgRemovalError::configuration(format!(
                "Tract backend runs on the CPU only; accelerated device {device} is not supported"
            )));
        }

        let model_load_start = instant::Instant::now();
        log::info!("Initializing Tract backend");
        log::info!(
            "Model size: {:.2} MB",
            model_data.len() as f64 / (1024.0 * 1024.0)
        );

        let model = onnx()
            .model_for_read(&mut std::io::Cursor::new(model_data))
            .map_err(|e| {
                BgRemovalError::configuration(format!("Failed to load ONNX model: {e}"))
            })?;

        let input_index = Self::find_input(&model, &config.model.input_parameter_name)?;
        let (n, c, h, w) = config.model.input_shape();

        let model = model
            .with_input_fact(input_index, f32::fact([n, c, h, w]).into())
            .map_err(|e| {
                BgRemovalError::configuration(format!("Failed to set input shape: {e}"))
            })?
            .into_optimized()
            .map_err(|e| {
                BgRemovalError::configuration(format!("Failed to optimize model: {e}"))
            })?
            .into_runnable()
            .map_err(|e| {
                BgRemovalError::configuration(format!("Failed to create runnable model: {e}"))
            })?;

        log::info!(
            "Tract backend initialized in {}ms",
            model_load_start.elapsed().as_millis()
        );

        Ok(Self { model })
    }

    /// Position of the graph input whose node carries `name`
    fn find_input(model: &InferenceModel, name: &str) -> Result<usize> {
        let outlets = model.input_outlets().map_err(|e| {
            BgRemovalError::configuration(format!("Failed to read model inputs: {e}"))
        })?;

        outlets
            .iter()
            .position(|outlet| model.node(outlet.node).name == name)
            .ok_or_else(|| {
                let available: Vec<&str> = outlets
                    .iter()
                    .map(|outlet| model.node(outlet.node).name.as_str())
                    .collect();
                BgRemovalError::configuration(format!(
                    "Model has no input named '{}' (available: {})",
                    name,
                    available.join(", ")
                ))
            })
    }
}

impl InferenceBackend for TractBackend {
    fn infer(&self, _input_name: &str, input: &Array4<f32>) -> Result<ArrayD<f32>> {
        log::debug!("Running Tract inference, input tensor: {:?}", input.shape());
        let inference_start = instant::Instant::now();

        // The input was bound by name when the model was loaded
        let data: Vec<f32> = input.iter().copied().collect();
        let input_tensor = Tensor::from_shape(input.shape(), &data).map_err(|e| {
            BgRemovalError::inference(format!("Failed to convert input tensor: {e}"))
        })?;

        let outputs = self
            .model
            .run(tvec![input_tensor.into()])
            .map_err(|e| BgRemovalError::inference(format!("Tract inference failed: {e}")))?;

        let output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| BgRemovalError::unusable_output("No output tensors found"))?;

        let values = output.as_slice::<f32>().map_err(|e| {
            BgRemovalError::unusable_output(format!("Output tensor is not f32: {e}"))
        })?;
        let output_array = ArrayD::from_shape_vec(IxDyn(output.shape()), values.to_vec())
            .map_err(|e| {
                BgRemovalError::unusable_output(format!("Failed to reshape output tensor: {e}"))
            })?;

        log::debug!(
            "Tract inference completed in {}ms, output tensor: {:?}",
            inference_start.elapsed().as_millis(),
            output_array.shape()
        );

        Ok(output_array)
    }

    fn name(&self) -> &'static str {
        "tract"
    }

    fn execution_target(&self) -> ExecutionTarget {
        ExecutionTarget::Default
    }
}
