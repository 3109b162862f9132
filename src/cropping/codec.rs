use std::path::Path;

use image::{DynamicImage, ExtendedColorType, ImageFormat};

use crate::cropping::PixelBuffer;
use crate::error::CropError;

/// Pixel formats this tool can read and write, keyed off file extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpg,
    Bmp,
}

impl OutputFormat {
    /// Map an extension (with or without leading dot, any case) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "png" => Some(OutputFormat::Png),
            "jpg" | "jpeg" => Some(OutputFormat::Jpg),
            "bmp" => Some(OutputFormat::Bmp),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(OutputFormat::from_extension)
    }

    fn to_image_format(self) -> ImageFormat {
        match self {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Jpg => ImageFormat::Jpeg,
            OutputFormat::Bmp => ImageFormat::Bmp,
        }
    }
}

/// Decode an image file into a [`PixelBuffer`].
///
/// With `force_channels` set, the pixels are converted to that channel count
/// (1 = gray, 2 = gray+alpha, 3 = RGB, anything else = RGBA); otherwise the
/// image's own channel count is kept, reduced to 8 bits per channel.
pub fn decode(path: &Path, force_channels: Option<u8>) -> Result<PixelBuffer, CropError> {
    let img = image::open(path).map_err(|source| CropError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    match force_channels.unwrap_or_else(|| native_channels(&img)) {
        1 => {
            let pixels = img.into_luma8();
            let (width, height) = pixels.dimensions();
            PixelBuffer::from_raw(width, height, 1, pixels.into_raw())
        }
        2 => {
            let pixels = img.into_luma_alpha8();
            let (width, height) = pixels.dimensions();
            PixelBuffer::from_raw(width, height, 2, pixels.into_raw())
        }
        3 => {
            let pixels = img.into_rgb8();
            let (width, height) = pixels.dimensions();
            PixelBuffer::from_raw(width, height, 3, pixels.into_raw())
        }
        _ => {
            let pixels = img.into_rgba8();
            let (width, height) = pixels.dimensions();
            PixelBuffer::from_raw(width, height, 4, pixels.into_raw())
        }
    }
}

/// Encode a buffer to the format named by the path's extension.
pub fn encode(buffer: &PixelBuffer, path: &Path) -> Result<(), CropError> {
    let format = OutputFormat::from_path(path).ok_or_else(|| {
        CropError::UnsupportedExtension(
            path.extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or("")
                .to_string(),
        )
    })?;

    let color = match buffer.channels() {
        1 => ExtendedColorType::L8,
        2 => ExtendedColorType::La8,
        3 => ExtendedColorType::Rgb8,
        _ => ExtendedColorType::Rgba8,
    };

    image::save_buffer_with_format(
        path,
        buffer.as_bytes(),
        buffer.width(),
        buffer.height(),
        color,
        format.to_image_format(),
    )
    .map_err(|source| CropError::Encode {
        path: path.to_path_buf(),
        source,
    })
}

fn native_channels(img: &DynamicImage) -> u8 {
    use image::ColorType;
    match img.color() {
        ColorType::L8 | ColorType::L16 => 1,
        ColorType::La8 | ColorType::La16 => 2,
        ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => 3,
        _ => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn gradient_buffer(width: u32, height: u32) -> PixelBuffer {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push((x % 256) as u8);
                data.push((y % 256) as u8);
                data.push(((x + y) % 256) as u8);
            }
        }
        PixelBuffer::from_raw(width, height, 3, data).unwrap()
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(OutputFormat::from_extension("png"), Some(OutputFormat::Png));
        assert_eq!(
            OutputFormat::from_extension(".PNG"),
            Some(OutputFormat::Png)
        );
        assert_eq!(OutputFormat::from_extension("jpg"), Some(OutputFormat::Jpg));
        assert_eq!(
            OutputFormat::from_extension("jpeg"),
            Some(OutputFormat::Jpg)
        );
        assert_eq!(
            OutputFormat::from_extension(".bmp"),
            Some(OutputFormat::Bmp)
        );
        assert_eq!(OutputFormat::from_extension("webp"), None);
        assert_eq!(OutputFormat::from_extension(""), None);
    }

    #[test]
    fn test_png_round_trip_preserves_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gradient.png");

        let original = gradient_buffer(16, 12);
        encode(&original, &path).unwrap();

        let decoded = decode(&path, None).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_decode_with_forced_channels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gray.png");

        encode(&gradient_buffer(8, 8), &path).unwrap();

        let gray = decode(&path, Some(1)).unwrap();
        assert_eq!(gray.channels(), 1);
        assert_eq!(gray.as_bytes().len(), 64);

        let rgba = decode(&path, Some(4)).unwrap();
        assert_eq!(rgba.channels(), 4);
        assert_eq!(rgba.as_bytes().len(), 256);
    }

    #[test]
    fn test_encode_rejects_unknown_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crop.tiff");
        let result = encode(&gradient_buffer(4, 4), &path);
        assert!(matches!(
            result,
            Err(CropError::UnsupportedExtension(ext)) if ext == "tiff"
        ));
    }

    #[test]
    fn test_decode_missing_file_fails() {
        let result = decode(Path::new("/nonexistent/missing.png"), None);
        assert!(matches!(result, Err(CropError::Decode { .. })));
    }
}
