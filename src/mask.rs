//! Mask building from raw model output
//!
//! Turns the model output tensor into an 8-bit foreground mask at the model
//! output resolution, then stretches it back to the original image size.

use crate::config::ModelConfig;
use crate::error::Result;
use crate::utils::{StretchResize, TensorValidator};
use image::{GrayImage, Luma};
use ndarray::ArrayD;

/// Builds foreground masks from model output tensors
pub struct MaskBuilder;

impl MaskBuilder {
    /// Quantize a confidence value to a mask byte
    ///
    /// Values are scaled by 255, rounded and clamped into `0..=255`. NaN maps to 0.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn quantize(value: f32) -> u8 {
        if value.is_nan() {
            return 0;
        }
        // Clamped into u8 range first, so the cast cannot truncate
        (value * 255.0).round().clamp(0.0, 255.0) as u8
    }

    /// Read the `[0, 0, y, x]` window of the model output into a mask
    ///
    /// The mask is `output_width`×`output_height`. Extra batch entries,
    /// channels or trailing rows and columns in the tensor are ignored.
    ///
    /// # Errors
    /// `UnusableOutput` when the tensor cannot be viewed as NCHW or is smaller
    /// than the configured output size.
    pub fn unpack(output: &ArrayD<f32>, model: &ModelConfig) -> Result<GrayImage> {
        let (_, _, height, width) = model.output_shape();
        let view = TensorValidator::output_as_nchw(output, height, width)?;

        #[allow(clippy::indexing_slicing)]
        // Safe: output_as_nchw checked the tensor covers the output window
        let mask = GrayImage::from_fn(model.output_width, model.output_height, |x, y| {
            Luma([Self::quantize(view[[0, 0, y as usize, x as usize]])])
        });

        Ok(mask)
    }

    /// Stretch a mask to `width`×`height` with the pipeline resize policy
    #[must_use]
    pub fn rescale(mask: &GrayImage, width: u32, height: u32, policy: &StretchResize) -> GrayImage {
        policy.resize(mask, width, height)
    }

    /// Unpack the model output and grow the mask to the original image size
    ///
    /// # Errors
    /// Same as [`MaskBuilder::unpack`].
    pub fn build(
        output: &ArrayD<f32>,
        model: &ModelConfig,
        original_dimensions: (u32, u32),
        policy: &StretchResize,
    ) -> Result<GrayImage> {
        let mask = Self::unpack(output, model)?;
        let (width, height) = original_dimensions;
        Ok(Self::rescale(&mask, width, height, policy))
    }
}
