//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{CliBackend, ModelArgs};
use crate::config::{BackendType, ExecutionTarget, ModelConfig, PipelineConfig};
use anyhow::{Context, Result};

impl From<CliBackend> for BackendType {
    fn from(backend: CliBackend) -> Self {
        match backend {
            CliBackend::Onnx => Self::Onnx,
            CliBackend::Tract => Self::Tract,
        }
    }
}

/// Convert CLI arguments to a `PipelineConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the pipeline configuration from the shared model arguments
    ///
    /// `--model-config` wins over `--size` and `--parameter`.
    pub(crate) fn from_model_args(args: &ModelArgs) -> Result<PipelineConfig> {
        let model = match &args.model_config {
            Some(path) => ModelConfig::from_json_file(path).with_context(|| {
                format!("Failed to load model configuration {}", path.display())
            })?,
            None => ModelConfig::square(args.size, args.parameter.clone()),
        };

        let backend_type = args.backend.map(BackendType::from).unwrap_or_default();

        PipelineConfig::builder()
            .model(model)
            .execution_target(ExecutionTarget::from_device(args.gpu))
            .backend_type(backend_type)
            .intra_threads(args.threads)
            .build()
            .context("Invalid configuration")
    }

    /// Validate the model arguments before anything is loaded
    pub(crate) fn validate_model_args(args: &ModelArgs) -> Result<()> {
        if !args.model.is_file() {
            anyhow::bail!("Could not find model: {}", args.model.display());
        }
        if args.size == 0 {
            anyhow::bail!("Model image size must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn model_args(model: PathBuf) -> ModelArgs {
        ModelArgs {
            model,
            parameter: "input_image".to_string(),
            size: 320,
            model_config: None,
            gpu: None,
            backend: None,
            threads: 0,
        }
    }

    #[test]
    fn test_square_model_from_size() {
        let mut args = model_args(PathBuf::from("model.onnx"));
        args.size = 1024;
        args.parameter = "img".to_string();

        let config = CliConfigBuilder::from_model_args(&args).unwrap();

        assert_eq!(config.model, ModelConfig::square(1024, "img"));
        assert_eq!(config.execution_target, ExecutionTarget::Default);
        assert_eq!(config.backend_type, BackendType::default());
    }

    #[test]
    fn test_gpu_and_backend_selection() {
        let mut args = model_args(PathBuf::from("model.onnx"));
        args.gpu = Some(1);
        args.backend = Some(CliBackend::Tract);
        args.threads = 2;

        let config = CliConfigBuilder::from_model_args(&args).unwrap();

        assert_eq!(config.execution_target, ExecutionTarget::Accelerated(1));
        assert_eq!(config.backend_type, BackendType::Tract);
        assert_eq!(config.intra_threads, 2);
    }

    #[test]
    fn test_model_config_file_overrides_size() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"input_width": 512, "input_height": 256, "output_width": 64, "output_height": 32, "input_parameter_name": "pixels"}}"#
        )
        .unwrap();

        let mut args = model_args(PathBuf::from("model.onnx"));
        args.model_config = Some(file.path().to_path_buf());

        let config = CliConfigBuilder::from_model_args(&args).unwrap();
        assert_eq!(config.model.input_width, 512);
        assert_eq!(config.model.output_height, 32);
        assert_eq!(config.model.input_parameter_name, "pixels");
    }

    #[test]
    fn test_missing_model_rejected() {
        let args = model_args(PathBuf::from("/nonexistent/u2net.onnx"));
        let err = CliConfigBuilder::validate_model_args(&args).unwrap_err();
        assert!(err.to_string().contains("Could not find model"));
    }

    #[test]
    fn test_existing_model_accepted() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let args = model_args(file.path().to_path_buf());
        assert!(CliConfigBuilder::validate_model_args(&args).is_ok());
    }
}
