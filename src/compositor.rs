//! Alpha compositing of the foreground mask onto the original image

use crate::error::Result;
use crate::utils::TensorValidator;
use image::{GrayImage, RgbaImage};

/// Writes mask bytes into the alpha channel of an image
pub struct Compositor;

impl Compositor {
    /// Replace the alpha of every pixel with the mask byte at the same position
    ///
    /// Red, green and blue are left exactly as they were, including under
    /// pixels that end up fully transparent.
    ///
    /// # Errors
    /// Precondition error when the mask and image sizes differ.
    pub fn composite(mut original: RgbaImage, mask: &GrayImage) -> Result<RgbaImage> {
        TensorValidator::ensure_dimensions("compositing", mask.dimensions(), original.dimensions())?;

        for (pixel, alpha) in original.pixels_mut().zip(mask.pixels()) {
            pixel.0[3] = alpha.0[0];
        }

        Ok(original)
    }
}
