// Library exports for reuse by integration tests and other tools
pub mod cli;
pub mod config_file;
pub mod cropping;
pub mod error;
pub mod pool;
pub mod utils;

// Re-export commonly used types
pub use cli::{Args, ShapeArg};
pub use cropping::{
    BatchSummary, CropConfig, CropEngine, CropShape, Detection, ImageOutcome, OutputFormat,
    PixelBuffer,
};
pub use error::CropError;
pub use pool::{TaskHandle, WorkerPool};
