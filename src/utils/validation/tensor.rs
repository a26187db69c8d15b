//! Tensor validation utilities
//!
//! Centralizes the shape checks performed between pipeline stages.

use crate::error::{BgRemovalError, Result};
use ndarray::{ArrayD, ArrayView4, Axis, Ix4};

/// Validator for tensor shapes and stage dimensions
pub struct TensorValidator;

impl TensorValidator {
    /// View a raw model output as `[N, C, H, W]` and check it covers the mask window
    ///
    /// Rank 2 and 3 outputs get leading axes of size 1. The view must have at
    /// least one batch and channel entry and be at least `height`×`width` in its
    /// trailing dimensions; only the `[0, 0, ..height, ..width]` window is read.
    pub fn output_as_nchw(
        output: &ArrayD<f32>,
        height: usize,
        width: usize,
    ) -> Result<ArrayView4<'_, f32>> {
        let rank = output.ndim();
        if !(2..=4).contains(&rank) {
            return Err(BgRemovalError::unusable_output(format!(
                "Expected a 2D to 4D output tensor, got {}D with shape {:?}",
                rank,
                output.shape()
            )));
        }

        let mut view = output.view();
        while view.ndim() < 4 {
            view.insert_axis_inplace(Axis(0));
        }
        let view = view.into_dimensionality::<Ix4>().map_err(|e| {
            BgRemovalError::unusable_output(format!("Failed to view output as NCHW: {e}"))
        })?;

        let (batch, channels, actual_height, actual_width) = view.dim();
        if batch == 0 || channels == 0 {
            return Err(BgRemovalError::unusable_output(format!(
                "Output tensor has an empty batch or channel dimension: {:?}",
                output.shape()
            )));
        }
        if actual_height < height || actual_width < width {
            return Err(BgRemovalError::unusable_output(format!(
                "Output tensor {}x{} is smaller than the configured output {}x{}",
                actual_width, actual_height, width, height
            )));
        }

        Ok(view)
    }

    /// Fail loudly when two stages disagree on image dimensions
    pub fn ensure_dimensions(
        stage: &str,
        actual: (u32, u32),
        expected: (u32, u32),
    ) -> Result<()> {
        if actual != expected {
            return Err(BgRemovalError::precondition(format!(
                "{} expected {}x{}, got {}x{}",
                stage, expected.0, expected.1, actual.0, actual.1
            )));
        }
        Ok(())
    }
}
