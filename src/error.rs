use std::path::PathBuf;
use thiserror::Error;

/// The main error type for cropping operations.
#[derive(Debug, Error)]
pub enum CropError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode image {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to parse annotation {path} at line {line}: {message}")]
    AnnotationParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Unsupported image extension: '{0}'")]
    UnsupportedExtension(String),

    #[error(
        "Background is {background_width}x{background_height}x{background_channels}, \
         but the output canvas needs {canvas_width}x{canvas_height}x{channels}"
    )]
    BackgroundMismatch {
        background_width: u32,
        background_height: u32,
        background_channels: u8,
        canvas_width: u32,
        canvas_height: u32,
        channels: u8,
    },

    #[error("Pixel data is {actual} bytes, expected {expected} for {width}x{height}x{channels}")]
    BufferSize {
        width: u32,
        height: u32,
        channels: u8,
        expected: usize,
        actual: usize,
    },
}
