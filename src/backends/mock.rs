//! Mock backend implementation for testing and benchmarking

use crate::config::{ExecutionTarget, ModelConfig};
use crate::error::{BgRemovalError, Result};
use crate::inference::InferenceBackend;
use ndarray::{Array4, ArrayD, IxDyn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

type OutputFn = dyn Fn(&Array4<f32>) -> ArrayD<f32> + Send + Sync;

enum MockOutput {
    Constant { shape: Vec<usize>, value: f32 },
    Computed(Box<OutputFn>),
    Missing,
}

/// Stub backend that stands in for a real model
///
/// Returns a constant tensor, a tensor computed from the input, or no output at
/// all. Counts calls and remembers the last input name it was fed.
pub struct MockBackend {
    output: MockOutput,
    calls: AtomicUsize,
    last_input_name: Mutex<Option<String>>,
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}

impl MockBackend {
    fn with_output(output: MockOutput) -> Self {
        Self {
            output,
            calls: AtomicUsize::new(0),
            last_input_name: Mutex::new(None),
        }
    }

    /// Output of `value` everywhere, shaped `[1, 1, output_height, output_width]`
    #[must_use]
    pub fn constant(config: &ModelConfig, value: f32) -> Self {
        let (n, c, h, w) = config.output_shape();
        Self::with_shape(&[n, c, h, w], value)
    }

    /// Output of `value` everywhere with an arbitrary shape
    #[must_use]
    pub fn with_shape(shape: &[usize], value: f32) -> Self {
        Self::with_output(MockOutput::Constant {
            shape: shape.to_vec(),
            value,
        })
    }

    /// Output computed from the packed input tensor
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Array4<f32>) -> ArrayD<f32> + Send + Sync + 'static,
    {
        Self::with_output(MockOutput::Computed(Box::new(f)))
    }

    /// Backend whose model produces no output tensors
    #[must_use]
    pub fn no_output() -> Self {
        Self::with_output(MockOutput::Missing)
    }

    /// Number of inference calls served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Input name passed to the most recent call
    pub fn last_input_name(&self) -> Option<String> {
        self.last_input_name
            .lock()
            .ok()
            .and_then(|name| name.clone())
    }
}

impl InferenceBackend for MockBackend {
    fn infer(&self, input_name: &str, input: &Array4<f32>) -> Result<ArrayD<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_input_name.lock() {
            *last = Some(input_name.to_string());
        }

        match &self.output {
            MockOutput::Constant { shape, value } => {
                Ok(ArrayD::from_elem(IxDyn(shape), *value))
            },
            MockOutput::Computed(f) => Ok(f(input)),
            MockOutput::Missing => Err(BgRemovalError::unusable_output(
                "No output tensors found",
            )),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    fn execution_target(&self) -> ExecutionTarget {
        ExecutionTarget::Default
    }
}
