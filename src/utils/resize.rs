//! Stretch resize policy
//!
//! Width and height are scaled independently; aspect ratio is not preserved.
//! The same policy shrinks the working copy to the model input size and grows
//! the mask back to the original resolution, so both resizes operate over the
//! same pair of stretch factors and the mask stays aligned with the image.

use image::{imageops::FilterType, GenericImageView, ImageBuffer, Pixel};

/// Non-uniform stretch resize with a fixed sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StretchResize {
    filter: FilterType,
}

impl Default for StretchResize {
    fn default() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }
}

impl StretchResize {
    /// Create a policy using the given sampling filter
    #[must_use]
    pub fn new(filter: FilterType) -> Self {
        Self { filter }
    }

    /// Sampling filter used for both directions
    #[must_use]
    pub fn filter(&self) -> FilterType {
        self.filter
    }

    /// Stretch `image` to exactly `width`×`height`
    ///
    /// Always returns a new buffer, including when the size is unchanged.
    pub fn resize<I>(
        &self,
        image: &I,
        width: u32,
        height: u32,
    ) -> ImageBuffer<I::Pixel, Vec<<I::Pixel as Pixel>::Subpixel>>
    where
        I: GenericImageView,
        I::Pixel: 'static,
        <I::Pixel as Pixel>::Subpixel: 'static,
    {
        image::imageops::resize(image, width, height, self.filter)
    }
}
