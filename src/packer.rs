//! Image to tensor packing
//!
//! Converts a working-copy image, already stretched to the model input size,
//! into the channel-first `[1, 3, H, W]` tensor the model expects.

use image::RgbaImage;
use ndarray::Array4;

/// Offset subtracted from every channel byte before scaling
pub const NORMALIZATION_OFFSET: f32 = 127.0;

/// Divisor applied after the offset
pub const NORMALIZATION_SCALE: f32 = 128.0;

/// Packs an RGBA image into a normalized NCHW tensor
pub struct TensorPacker;

impl TensorPacker {
    /// Normalize one channel byte to `(byte - 127) / 128`
    #[inline]
    #[must_use]
    pub fn normalize(byte: u8) -> f32 {
        (f32::from(byte) - NORMALIZATION_OFFSET) / NORMALIZATION_SCALE
    }

    /// Pack every pixel of `image` into `tensor[0, c, y, x]` for c in R, G, B
    ///
    /// The tensor takes its height and width from the image. The caller is
    /// responsible for stretching the image to the model input size first;
    /// alpha is ignored.
    #[must_use]
    pub fn pack(image: &RgbaImage) -> Array4<f32> {
        let (width, height) = image.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        #[allow(clippy::indexing_slicing)]
        // Safe: tensor dimensions pre-allocated to match the image size
        for (x, y, pixel) in image.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            tensor[[0, 0, y, x]] = Self::normalize(pixel[0]); // R channel
            tensor[[0, 1, y, x]] = Self::normalize(pixel[1]); // G channel
            tensor[[0, 2, y, x]] = Self::normalize(pixel[2]); // B channel
        }

        tensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_pack_shape_and_layout() {
        let mut image = RgbaImage::from_pixel(3, 2, Rgba([0, 0, 0, 255]));
        image.put_pixel(2, 1, Rgba([255, 127, 0, 0]));

        let tensor = TensorPacker::pack(&image);

        assert_eq!(tensor.shape(), &[1, 3, 2, 3]);
        assert!((tensor[[0, 0, 1, 2]] - 1.0).abs() < f32::EPSILON);
        assert!(tensor[[0, 1, 1, 2]].abs() < f32::EPSILON);
        assert!((tensor[[0, 2, 1, 2]] + 127.0 / 128.0).abs() < f32::EPSILON);
        // Neighbouring pixel is untouched by the bright one
        assert!((tensor[[0, 0, 1, 1]] + 127.0 / 128.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_channel_order_is_rgb() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([255, 127, 0, 255]));
        let tensor = TensorPacker::pack(&image);
        assert!(tensor[[0, 0, 0, 0]] > tensor[[0, 1, 0, 0]]);
        assert!(tensor[[0, 1, 0, 0]] > tensor[[0, 2, 0, 0]]);
    }

    #[test]
    fn test_normalization_range_and_monotonicity() {
        let image = RgbaImage::from_fn(256, 1, |x, _| {
            let v = x as u8;
            Rgba([v, v, v, 255])
        });
        let tensor = TensorPacker::pack(&image);

        let mut previous = f32::NEG_INFINITY;
        for x in 0..256 {
            for c in 0..3 {
                let value = tensor[[0, c, 0, x]];
                assert!((-127.0 / 128.0..=1.0).contains(&value), "byte {x}: {value}");
            }
            let value = tensor[[0, 0, 0, x]];
            assert!(value > previous);
            previous = value;
        }

        assert!((TensorPacker::normalize(0) + 127.0 / 128.0).abs() < f32::EPSILON);
        assert!((TensorPacker::normalize(255) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_pack_ignores_alpha() {
        let opaque = RgbaImage::from_pixel(2, 2, Rgba([40, 80, 120, 255]));
        let transparent = RgbaImage::from_pixel(2, 2, Rgba([40, 80, 120, 0]));
        assert_eq!(TensorPacker::pack(&opaque), TensorPacker::pack(&transparent));
    }
}
