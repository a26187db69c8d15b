//! Error types for background removal operations

use thiserror::Error;

/// Result type alias for background removal operations
pub type Result<T> = std::result::Result<T, BgRemovalError>;

/// Error taxonomy for the background removal pipeline
///
/// Configuration errors are raised while a [`crate::BackgroundRemover`] is being
/// constructed and leave no usable instance behind. Every other variant is
/// scoped to a single processing call; the loaded model stays usable afterwards.
#[derive(Error, Debug)]
pub enum BgRemovalError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode or encode errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Model artifact missing, unreadable or unloadable, or invalid parameters
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The inference backend returned no tensor, or one that cannot be read as a mask
    #[error("Model produced unusable output: {0}")]
    UnusableOutput(String),

    /// Dimension mismatch between pipeline stages
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// The inference runtime failed while running the model
    #[error("Inference error: {0}")]
    Inference(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BgRemovalError {
    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a new unusable-output error
    pub fn unusable_output<S: Into<String>>(msg: S) -> Self {
        Self::UnusableOutput(msg.into())
    }

    /// Create a new precondition-violation error
    pub fn precondition<S: Into<String>>(msg: S) -> Self {
        Self::Precondition(msg.into())
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a configuration error for a model path that does not exist
    pub fn model_not_found<P: AsRef<std::path::Path>>(path: P) -> Self {
        Self::Configuration(format!(
            "Could not find model '{}'",
            path.as_ref().display()
        ))
    }

    /// Create a configuration error for a model that exists but failed to load
    pub fn model_load_error<P: AsRef<std::path::Path>>(operation: &str, path: P, error: &str) -> Self {
        Self::Configuration(format!(
            "Failed to {} model '{}': {}",
            operation,
            path.as_ref().display(),
            error
        ))
    }

    /// Create a configuration error for an out-of-range parameter
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::Configuration(format!(
            "Invalid {}: {} (valid range: {})",
            parameter, value, valid_range
        ))
    }

    /// Whether this error was raised while constructing the pipeline
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Whether this error is scoped to a single processing call
    #[must_use]
    pub fn is_per_call(&self) -> bool {
        !self.is_configuration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = BgRemovalError::configuration("bad model");
        assert!(matches!(err, BgRemovalError::Configuration(_)));

        let err = BgRemovalError::unusable_output("no tensors");
        assert!(matches!(err, BgRemovalError::UnusableOutput(_)));

        let err = BgRemovalError::precondition("mask is 2x2, image is 4x4");
        assert!(matches!(err, BgRemovalError::Precondition(_)));
    }

    #[test]
    fn test_error_display() {
        let err = BgRemovalError::unusable_output("output tensor is i64");
        assert_eq!(
            err.to_string(),
            "Model produced unusable output: output tensor is i64"
        );

        let err = BgRemovalError::model_not_found(Path::new("/models/u2net.onnx"));
        assert!(err.to_string().contains("Could not find model"));
        assert!(err.to_string().contains("/models/u2net.onnx"));
    }

    #[test]
    fn test_error_classification() {
        assert!(BgRemovalError::model_not_found("missing.onnx").is_configuration());
        assert!(!BgRemovalError::model_not_found("missing.onnx").is_per_call());

        let per_call = [
            BgRemovalError::unusable_output("x"),
            BgRemovalError::precondition("x"),
            BgRemovalError::inference("x"),
            BgRemovalError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "x")),
        ];
        for err in &per_call {
            assert!(err.is_per_call(), "{err} should be per-call");
        }
    }

    #[test]
    fn test_config_value_error() {
        let err = BgRemovalError::config_value_error("input width", 0, "1-65535");
        let message = err.to_string();
        assert!(message.contains("input width"));
        assert!(message.contains("1-65535"));
        assert!(err.is_configuration());
    }
}
