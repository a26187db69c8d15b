//! Inference backend abstraction
//!
//! The model is treated as an opaque function from a `[1, 3, H, W]` input tensor
//! to a single floating-point output tensor. Any runtime exposing that shape
//! can sit behind [`InferenceBackend`].

use crate::config::ExecutionTarget;
use crate::error::Result;
use ndarray::{Array4, ArrayD};
use std::sync::Arc;

/// Trait for inference backends
///
/// Backends are loaded once and shared read-only by every processing call, so
/// `infer` takes `&self`. Runtimes that need exclusive access to their session
/// must guard it internally.
pub trait InferenceBackend: Send + Sync {
    /// Run the model on `input`, fed to the model input called `input_name`
    ///
    /// # Errors
    /// - `UnusableOutput` when the model produced no tensor or a non-`f32` tensor
    /// - `Inference` when the runtime itself fails
    fn infer(&self, input_name: &str, input: &Array4<f32>) -> Result<ArrayD<f32>>;

    /// Short runtime name for logging
    fn name(&self) -> &'static str;

    /// Target the backend was loaded for
    fn execution_target(&self) -> ExecutionTarget;
}

impl<B: InferenceBackend + ?Sized> InferenceBackend for Box<B> {
    fn infer(&self, input_name: &str, input: &Array4<f32>) -> Result<ArrayD<f32>> {
        (**self).infer(input_name, input)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn execution_target(&self) -> ExecutionTarget {
        (**self).execution_target()
    }
}

impl<B: InferenceBackend + ?Sized> InferenceBackend for Arc<B> {
    fn infer(&self, input_name: &str, input: &Array4<f32>) -> Result<ArrayD<f32>> {
        (**self).infer(input_name, input)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn execution_target(&self) -> ExecutionTarget {
        (**self).execution_target()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockBackend;
    use crate::config::ModelConfig;

    #[test]
    fn test_boxed_backend_delegates() {
        let config = ModelConfig::square(2, "input_image");
        let backend: Box<dyn InferenceBackend> = Box::new(MockBackend::constant(&config, 0.5));

        let input = Array4::<f32>::zeros(config.input_shape());
        let output = backend.infer("input_image", &input).unwrap();

        assert_eq!(output.shape(), &[1, 1, 2, 2]);
        assert_eq!(backend.name(), "mock");
        assert_eq!(backend.execution_target(), ExecutionTarget::Default);
    }

    #[test]
    fn test_shared_backend_keeps_call_count() {
        let config = ModelConfig::square(2, "input_image");
        let mock = Arc::new(MockBackend::constant(&config, 0.5));
        let backend: Box<dyn InferenceBackend> = Box::new(Arc::clone(&mock));

        let input = Array4::<f32>::zeros(config.input_shape());
        backend.infer("input_image", &input).unwrap();
        backend.infer("input_image", &input).unwrap();

        assert_eq!(mock.calls(), 2);
    }

    #[test]
    fn test_backend_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Box<dyn InferenceBackend>>();
    }
}
