//! Configuration types for background removal operations

use crate::error::{BgRemovalError, Result};
use crate::utils::StretchResize;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_dimension() -> u32 {
    320
}

fn default_input_parameter_name() -> String {
    "input_image".to_string()
}

/// Fixed tensor geometry of the segmentation model
///
/// Shared read-only by the tensor packer and the mask builder for the lifetime
/// of a [`crate::BackgroundRemover`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Width of the model input tensor
    #[serde(default = "default_dimension")]
    pub input_width: u32,

    /// Height of the model input tensor
    #[serde(default = "default_dimension")]
    pub input_height: u32,

    /// Width of the model output tensor
    #[serde(default = "default_dimension")]
    pub output_width: u32,

    /// Height of the model output tensor
    #[serde(default = "default_dimension")]
    pub output_height: u32,

    /// Name of the model input the packed image is fed to
    #[serde(default = "default_input_parameter_name")]
    pub input_parameter_name: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            input_width: default_dimension(),
            input_height: default_dimension(),
            output_width: default_dimension(),
            output_height: default_dimension(),
            input_parameter_name: default_input_parameter_name(),
        }
    }
}

impl ModelConfig {
    /// Model whose input and output are both `size`×`size`
    pub fn square<S: Into<String>>(size: u32, input_parameter_name: S) -> Self {
        Self {
            input_width: size,
            input_height: size,
            output_width: size,
            output_height: size,
            input_parameter_name: input_parameter_name.into(),
        }
    }

    /// Load a model configuration from a JSON file
    ///
    /// Missing fields take their defaults. The loaded configuration is validated.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BgRemovalError::configuration(format!(
                "Failed to read model config '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            BgRemovalError::configuration(format!(
                "Failed to parse model config '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Input tensor shape `[1, 3, input_height, input_width]`
    #[must_use]
    pub fn input_shape(&self) -> (usize, usize, usize, usize) {
        (1, 3, self.input_height as usize, self.input_width as usize)
    }

    /// Logical output tensor shape `[1, 1, output_height, output_width]`
    #[must_use]
    pub fn output_shape(&self) -> (usize, usize, usize, usize) {
        (1, 1, self.output_height as usize, self.output_width as usize)
    }

    /// Validate dimensions and input name
    pub fn validate(&self) -> Result<()> {
        let dimensions = [
            ("input width", self.input_width),
            ("input height", self.input_height),
            ("output width", self.output_width),
            ("output height", self.output_height),
        ];
        for (name, value) in dimensions {
            if value == 0 {
                return Err(BgRemovalError::config_value_error(name, value, "1 or greater"));
            }
        }

        if self.input_parameter_name.trim().is_empty() {
            return Err(BgRemovalError::configuration(
                "Input parameter name must not be empty",
            ));
        }

        Ok(())
    }
}

/// Where inference runs, resolved once at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionTarget {
    /// Default compute-only target (CPU)
    #[default]
    Default,
    /// Accelerated target (CUDA) with the given device index
    Accelerated(u32),
}

impl ExecutionTarget {
    /// Map an optional device index to a target: absent means the default target
    #[must_use]
    pub fn from_device(device_index: Option<u32>) -> Self {
        device_index.map_or(Self::Default, Self::Accelerated)
    }

    /// Whether this target requests an accelerator
    #[must_use]
    pub fn is_accelerated(self) -> bool {
        matches!(self, Self::Accelerated(_))
    }
}

impl std::fmt::Display for ExecutionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "cpu"),
            Self::Accelerated(device) => write!(f, "cuda:{device}"),
        }
    }
}

/// Inference runtime used to execute the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendType {
    /// ONNX Runtime backend (supports GPU acceleration)
    Onnx,
    /// Tract backend (pure Rust, no external dependencies)
    Tract,
}

impl Default for BackendType {
    fn default() -> Self {
        if cfg!(feature = "onnx") || !cfg!(feature = "tract") {
            Self::Onnx
        } else {
            Self::Tract
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Onnx => write!(f, "onnx"),
            Self::Tract => write!(f, "tract"),
        }
    }
}

/// Construction-time configuration of the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Model tensor geometry
    pub model: ModelConfig,
    /// Default or accelerated execution
    pub execution_target: ExecutionTarget,
    /// Runtime used to execute the model
    pub backend_type: BackendType,
    /// Number of intra-op threads (0 = runtime default)
    pub intra_threads: usize,
    /// Resize policy shared by the input shrink and the mask regrowth
    pub resize: StretchResize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            execution_target: ExecutionTarget::Default,
            backend_type: BackendType::default(),
            intra_threads: 0,
            resize: StretchResize::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline configuration builder
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.model.validate()
    }
}

/// Builder for `PipelineConfig`
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    #[must_use]
    pub fn model(mut self, model: ModelConfig) -> Self {
        self.config.model = model;
        self
    }

    #[must_use]
    pub fn execution_target(mut self, target: ExecutionTarget) -> Self {
        self.config.execution_target = target;
        self
    }

    #[must_use]
    pub fn backend_type(mut self, backend_type: BackendType) -> Self {
        self.config.backend_type = backend_type;
        self
    }

    #[must_use]
    pub fn intra_threads(mut self, threads: usize) -> Self {
        self.config.intra_threads = threads;
        self
    }

    #[must_use]
    pub fn resize(mut self, resize: StretchResize) -> Self {
        self.config.resize = resize;
        self
    }

    /// Build the pipeline configuration
    ///
    /// # Errors
    /// Returns a configuration error for zero model dimensions or an empty input name.
    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
