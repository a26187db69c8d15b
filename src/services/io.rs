//! Image I/O operations service
//!
//! Decoding and PNG encoding live here so the pipeline itself only ever sees
//! decoded RGBA rasters.

use crate::error::{BgRemovalError, Result};
use image::{ImageFormat, RgbaImage};
use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;

/// What happens to color data under fully transparent pixels when encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransparentColorMode {
    /// Keep the original color values
    Preserve,
    /// Zero red, green and blue wherever alpha is 0
    #[default]
    Clear,
}

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image file as RGBA
    ///
    /// The format is guessed from the extension first and from the content if
    /// that fails.
    ///
    /// # Errors
    /// `Io` when the file is missing or unreadable, `Image` when it cannot be decoded.
    pub fn load_rgba<P: AsRef<Path>>(path: P) -> Result<RgbaImage> {
        let path_ref = path.as_ref();

        if !path_ref.is_file() {
            return Err(BgRemovalError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{}: file does not exist", path_ref.display()),
            )));
        }

        match image::open(path_ref) {
            Ok(img) => Ok(img.to_rgba8()),
            Err(e) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                );
                let data = std::fs::read(path_ref)?;
                Self::decode_rgba(&data)
            },
        }
    }

    /// Decode an encoded image held in memory as RGBA
    ///
    /// # Errors
    /// `Image` when the format is unknown or the data is corrupt.
    pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage> {
        Ok(image::load_from_memory(bytes)?.to_rgba8())
    }

    /// Write `image` as an RGBA PNG, creating parent directories as needed
    ///
    /// # Errors
    /// `Io` when the directory or file cannot be written, `Image` when encoding fails.
    pub fn save_png<P: AsRef<Path>>(
        image: &RgbaImage,
        path: P,
        mode: TransparentColorMode,
    ) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        Self::prepare(image, mode).save_with_format(path_ref, ImageFormat::Png)?;
        log::debug!("Saved {}x{} PNG to {}", image.width(), image.height(), path_ref.display());
        Ok(())
    }

    /// Encode `image` as an RGBA PNG in memory
    ///
    /// # Errors
    /// `Image` when encoding fails.
    pub fn encode_png(image: &RgbaImage, mode: TransparentColorMode) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        Self::prepare(image, mode).write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
        Ok(buffer)
    }

    /// Zero the color channels of every fully transparent pixel
    pub fn clear_transparent_color(image: &mut RgbaImage) {
        for pixel in image.pixels_mut() {
            if pixel.0[3] == 0 {
                pixel.0 = [0, 0, 0, 0];
            }
        }
    }

    /// Check if a file path has a supported image extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        let Some(extension) = path.as_ref().extension().and_then(|e| e.to_str()) else {
            return false;
        };
        match extension.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "tiff" | "tif" => true,
            "webp" => cfg!(feature = "webp-support"),
            _ => false,
        }
    }

    fn prepare(image: &RgbaImage, mode: TransparentColorMode) -> Cow<'_, RgbaImage> {
        match mode {
            TransparentColorMode::Preserve => Cow::Borrowed(image),
            TransparentColorMode::Clear => {
                let mut cleared = image.clone();
                Self::clear_transparent_color(&mut cleared);
                Cow::Owned(cleared)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::tempdir;

    fn half_transparent() -> RgbaImage {
        RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([200, 100, 50, 0])
            } else {
                Rgba([200, 100, 50, 255])
            }
        })
    }

    #[test]
    fn test_is_supported_format() {
        assert!(ImageIOService::is_supported_format("test.jpg"));
        assert!(ImageIOService::is_supported_format("test.JPEG"));
        assert!(ImageIOService::is_supported_format("test.png"));
        assert!(ImageIOService::is_supported_format("test.tif"));
        assert_eq!(
            ImageIOService::is_supported_format("test.webp"),
            cfg!(feature = "webp-support")
        );

        assert!(!ImageIOService::is_supported_format("test.txt"));
        assert!(!ImageIOService::is_supported_format("test"));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let err = ImageIOService::load_rgba("nonexistent.jpg").unwrap_err();
        assert!(matches!(err, BgRemovalError::Io(_)));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_decode_invalid_bytes() {
        let err = ImageIOService::decode_rgba(b"not an image").unwrap_err();
        assert!(matches!(err, BgRemovalError::Image(_)));
        assert!(ImageIOService::decode_rgba(&[]).is_err());
    }

    #[test]
    fn test_clear_transparent_color() {
        let mut image = half_transparent();
        ImageIOService::clear_transparent_color(&mut image);
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(image.get_pixel(1, 0).0, [200, 100, 50, 255]);
    }

    #[test]
    fn test_encode_png_modes() {
        let image = half_transparent();

        let preserved = ImageIOService::encode_png(&image, TransparentColorMode::Preserve).unwrap();
        let decoded = ImageIOService::decode_rgba(&preserved).unwrap();
        assert_eq!(decoded, image);

        let cleared = ImageIOService::encode_png(&image, TransparentColorMode::Clear).unwrap();
        let decoded = ImageIOService::decode_rgba(&cleared).unwrap();
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(decoded.get_pixel(1, 0).0, [200, 100, 50, 255]);

        // Caller's image is left alone
        assert_eq!(image.get_pixel(0, 0).0, [200, 100, 50, 0]);
    }

    #[test]
    fn test_save_png_creates_directory() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("out.png");

        ImageIOService::save_png(&half_transparent(), &path, TransparentColorMode::Clear).unwrap();

        let loaded = ImageIOService::load_rgba(&path).unwrap();
        assert_eq!(loaded.dimensions(), (2, 1));
        assert_eq!(loaded.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_load_by_content_when_extension_lies() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("actually_png.jpg");
        let bytes = ImageIOService::encode_png(&half_transparent(), TransparentColorMode::Preserve)
            .unwrap();
        std::fs::write(&path, bytes).unwrap();

        let loaded = ImageIOService::load_rgba(&path).unwrap();
        assert_eq!(loaded, half_transparent());
    }
}
