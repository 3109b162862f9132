use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ShapeArg {
    /// Rectangular crop sized to the shorter side of the padded box
    #[value(name = "square")]
    Square,
    /// Rectangular crop sized to the padded box (requires --size)
    #[value(name = "rectangle")]
    Rectangle,
    /// Elliptical crop sized to the shorter side of the padded box
    #[value(name = "circle")]
    Circle,
    /// Elliptical crop sized to the padded box
    #[value(name = "ellipse")]
    Ellipse,
}

#[derive(Parser, Debug)]
#[command(
    name = "yolo-crop",
    version,
    about = "Parallel batch cropper for YOLO-annotated image folders",
    long_about = "
YOLO Crop - Batch Object Cropper

Cuts per-object training crops out of a folder of images, driven by detector
output files (one '<class> <cx> <cy> <w> <h> <confidence>' line per box,
normalized coordinates, same base name as the image with a .txt extension).
Each image is processed on its own worker thread; crops can be filtered by
class, confidence and object size, shaped (square/rectangle/circle/ellipse),
padded, and composited onto a background image.

Example Usage:
  # Crop every annotated object, annotations next to the images
  yolo-crop -i ./frames -o ./crops

  # Square crops on a fixed 128x128 canvas, five workers
  yolo-crop -i ./frames -o ./crops --shape square -s 128 -j 5

  # Circular crops composited onto the center of a background image
  yolo-crop -i ./frames -o ./crops --shape circle -s 256x256 -b felt.png

  # Only class 3 at confidence 0.8+, skip objects smaller than 64px
  yolo-crop -i ./frames -o ./crops --class 3 --confidence 0.8 --min-size 64

  # Stop collecting after 1000 crops, discard boxes poking past the edges
  yolo-crop -i ./frames -o ./crops --quota 1000 --lock

  # Annotations in a separate folder, 12px padding all around
  yolo-crop -i ./frames -a ./labels -o ./crops -p 12"
)]
pub struct Args {
    /// Input directory containing the source images
    #[arg(
        short = 'i',
        long = "input",
        value_name = "DIR",
        required_unless_present = "config_file"
    )]
    pub input_dir: Option<PathBuf>,

    /// Output directory for cropped images (created if missing)
    #[arg(
        short = 'o',
        long = "output",
        value_name = "DIR",
        required_unless_present = "config_file"
    )]
    pub output_dir: Option<PathBuf>,

    /// Annotation directory (defaults to the input directory)
    #[arg(short = 'a', long = "annotations", value_name = "DIR")]
    pub annotations_dir: Option<PathBuf>,

    /// Image extension to process and write (png, jpg, jpeg or bmp)
    #[arg(short = 'e', long = "extension", default_value = ".png", value_name = "EXT")]
    pub extension: String,

    /// Number of worker threads (0 = auto-detect CPU cores)
    #[arg(short = 'j', long = "jobs", default_value = "0", value_name = "N")]
    pub jobs: usize,

    /// Target output canvas size (WIDTHxHEIGHT, or one number for a square)
    #[arg(short = 's', long = "size", value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Padding added on every side of each box (HxV, or one number for both)
    #[arg(short = 'p', long = "padding", value_name = "HxV")]
    pub padding: Option<String>,

    /// Crop shape (omit to crop the plain padded box)
    #[arg(long = "shape", value_name = "SHAPE")]
    pub shape: Option<ShapeArg>,

    /// Background image composited behind each crop
    #[arg(short = 'b', long = "background", value_name = "FILE")]
    pub background: Option<PathBuf>,

    /// Keep only detections with this class id
    #[arg(long = "class", value_name = "ID")]
    pub class_id: Option<i32>,

    /// Minimum detection confidence (0.0-1.0)
    #[arg(long = "confidence", default_value = "0.5", value_name = "THRESHOLD")]
    pub confidence: f64,

    /// Skip objects whose padded box is smaller than this many pixels
    #[arg(long = "min-size", value_name = "PIXELS")]
    pub min_size: Option<u32>,

    /// Skip objects whose padded box is larger than this many pixels
    #[arg(long = "max-size", value_name = "PIXELS")]
    pub max_size: Option<u32>,

    /// Discard detections whose crop window would poke past the image bounds
    #[arg(long = "lock")]
    pub lock: bool,

    /// Stop collecting results once this many crops have been created
    #[arg(long = "quota", value_name = "N")]
    pub quota: Option<usize>,

    /// JSON file supplying defaults for flags not given on the command line
    #[arg(long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Enable verbose output with per-image details
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Args {
    /// Parse the target size into width and height.
    ///
    /// Accepts "WIDTHxHEIGHT" or a single number for a square canvas.
    pub fn parse_size(&self) -> Result<Option<(u32, u32)>, String> {
        let Some(size) = &self.size else {
            return Ok(None);
        };
        let (width, height) = parse_dimension_pair(size)
            .map_err(|_| format!("Invalid size '{}'. Use WIDTHxHEIGHT (e.g. 128x128) or a single number", size))?;

        if width == 0 || height == 0 {
            return Err("Width and height must be greater than 0".to_string());
        }
        if width > 16384 || height > 16384 {
            return Err("Width and height must be at most 16384 pixels".to_string());
        }

        Ok(Some((width, height)))
    }

    /// Parse the padding into horizontal and vertical pixel counts.
    pub fn parse_padding(&self) -> Result<(u32, u32), String> {
        let Some(padding) = &self.padding else {
            return Ok((0, 0));
        };
        parse_dimension_pair(padding).map_err(|_| {
            format!("Invalid padding '{}'. Use HxV (e.g. 10x4) or a single number", padding)
        })
    }

    /// The extension in canonical form: lowercase with a leading dot.
    pub fn normalized_extension(&self) -> String {
        format!(".{}", self.extension.trim().trim_start_matches('.').to_lowercase())
    }
}

fn parse_dimension_pair(value: &str) -> Result<(u32, u32), ()> {
    let parts: Vec<&str> = value.trim().split('x').collect();
    match parts.as_slice() {
        [single] => {
            let n = single.trim().parse::<u32>().map_err(|_| ())?;
            Ok((n, n))
        }
        [first, second] => {
            let a = first.trim().parse::<u32>().map_err(|_| ())?;
            let b = second.trim().parse::<u32>().map_err(|_| ())?;
            Ok((a, b))
        }
        _ => Err(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        let args = Args {
            size: Some("128x96".to_string()),
            ..Default::default()
        };
        assert_eq!(args.parse_size().unwrap(), Some((128, 96)));

        let args = Args {
            size: Some("256".to_string()),
            ..Default::default()
        };
        assert_eq!(args.parse_size().unwrap(), Some((256, 256)));

        let args = Args::default();
        assert_eq!(args.parse_size().unwrap(), None);
    }

    #[test]
    fn test_parse_size_invalid() {
        for bad in ["invalid", "128x", "x128", "12x34x56", "0x128", "128x0"] {
            let args = Args {
                size: Some(bad.to_string()),
                ..Default::default()
            };
            assert!(args.parse_size().is_err(), "expected '{}' to be rejected", bad);
        }
    }

    #[test]
    fn test_parse_padding() {
        let args = Args::default();
        assert_eq!(args.parse_padding().unwrap(), (0, 0));

        let args = Args {
            padding: Some("10x4".to_string()),
            ..Default::default()
        };
        assert_eq!(args.parse_padding().unwrap(), (10, 4));

        let args = Args {
            padding: Some("12".to_string()),
            ..Default::default()
        };
        assert_eq!(args.parse_padding().unwrap(), (12, 12));

        let args = Args {
            padding: Some("wide".to_string()),
            ..Default::default()
        };
        assert!(args.parse_padding().is_err());
    }

    #[test]
    fn test_normalized_extension() {
        let args = Args {
            extension: "PNG".to_string(),
            ..Default::default()
        };
        assert_eq!(args.normalized_extension(), ".png");

        let args = Args {
            extension: ".Jpg".to_string(),
            ..Default::default()
        };
        assert_eq!(args.normalized_extension(), ".jpg");
    }

    #[test]
    fn test_shape_flag_is_single_valued() {
        let result = Args::try_parse_from([
            "yolo-crop", "-i", "in", "-o", "out", "--shape", "square", "--shape", "circle",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_shape_is_rejected() {
        let result = Args::try_parse_from([
            "yolo-crop", "-i", "in", "-o", "out", "--shape", "triangle",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_input_required_without_config_file() {
        assert!(Args::try_parse_from(["yolo-crop", "-o", "out"]).is_err());
        assert!(Args::try_parse_from(["yolo-crop", "--config", "run.json"]).is_ok());
    }
}

// Default implementation for tests
#[cfg(test)]
impl Default for Args {
    fn default() -> Self {
        Self {
            input_dir: None,
            output_dir: None,
            annotations_dir: None,
            extension: ".png".to_string(),
            jobs: 0,
            size: None,
            padding: None,
            shape: None,
            background: None,
            class_id: None,
            confidence: 0.5,
            min_size: None,
            max_size: None,
            lock: false,
            quota: None,
            config_file: None,
            verbose: false,
        }
    }
}
