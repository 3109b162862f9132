use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use crate::cli::{Args, ShapeArg};
use crate::cropping::OutputFormat;

/// Create a styled progress bar
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.blue} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg} ({eta})",
        )
        .unwrap()
        .progress_chars("#>-"),
    );
    pb
}

/// Format duration in a human-readable way
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 60 {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        format!("{}m {}s", mins, secs)
    } else if total_secs > 0 {
        format!("{}.{:03}s", total_secs, millis)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Validate command line arguments
pub fn validate_inputs(args: &Args) -> Result<()> {
    // Validate input directory
    let input_dir = args.input_dir.as_ref().ok_or_else(|| {
        anyhow::anyhow!("No input directory specified (use --input or a config file)")
    })?;
    if !input_dir.is_dir() {
        return Err(anyhow::anyhow!(
            "Input directory does not exist: {}",
            input_dir.display()
        ));
    }

    if args.output_dir.is_none() {
        return Err(anyhow::anyhow!(
            "No output directory specified (use --output or a config file)"
        ));
    }

    // Validate annotation directory when given; it defaults to the input
    if let Some(annotations_dir) = &args.annotations_dir {
        if !annotations_dir.is_dir() {
            return Err(anyhow::anyhow!(
                "Annotation directory does not exist: {}",
                annotations_dir.display()
            ));
        }
    }

    // Validate extension
    if OutputFormat::from_extension(&args.extension).is_none() {
        return Err(anyhow::anyhow!(
            "Unsupported image extension '{}'. Supported: png, jpg, jpeg, bmp",
            args.extension
        ));
    }

    // Validate job count
    if args.jobs > 32 {
        return Err(anyhow::anyhow!(
            "Job count too high (max 32), got: {}",
            args.jobs
        ));
    }

    // Validate confidence threshold
    if !(0.0..=1.0).contains(&args.confidence) {
        return Err(anyhow::anyhow!(
            "Confidence threshold must be between 0.0 and 1.0, got: {}",
            args.confidence
        ));
    }

    // Validate size and padding formats
    let target_size = args.parse_size().map_err(|e| anyhow::anyhow!(e))?;
    let padding = args.parse_padding().map_err(|e| anyhow::anyhow!(e))?;

    // Validate size filter bounds
    if let (Some(min), Some(max)) = (args.min_size, args.max_size) {
        if min > max {
            return Err(anyhow::anyhow!(
                "--min-size ({}) cannot exceed --max-size ({})",
                min,
                max
            ));
        }
    }

    // Rectangle crops take their dimensions from the target size
    if args.shape == Some(ShapeArg::Rectangle) && target_size.is_none() {
        return Err(anyhow::anyhow!(
            "--shape rectangle requires a target size (--size)"
        ));
    }

    // Validate background image and reject setups where it can never show
    if let Some(background) = &args.background {
        if !background.is_file() {
            return Err(anyhow::anyhow!(
                "Background image does not exist: {}",
                background.display()
            ));
        }
        if OutputFormat::from_path(background).is_none() {
            return Err(anyhow::anyhow!(
                "Background image has an unsupported extension: {}",
                background.display()
            ));
        }
        // With --lock and no shape the source always covers the whole canvas
        if args.lock && args.shape.is_none() {
            return Err(anyhow::anyhow!(
                "A background image is never visible with --lock and no shape"
            ));
        }
        // Same for rectangular crops that are never inflated beyond the box
        let rectangular = matches!(
            args.shape,
            None | Some(ShapeArg::Square) | Some(ShapeArg::Rectangle)
        );
        if rectangular && target_size.is_none() && padding == (0, 0) {
            return Err(anyhow::anyhow!(
                "A background image is never visible without a target size, padding, or an elliptical shape"
            ));
        }
    }

    Ok(())
}

/// Get file extension in lowercase
pub fn get_file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Check if a file has the configured extension (leading dot optional)
pub fn has_extension(path: &Path, extension: &str) -> bool {
    if let Some(ext) = get_file_extension(path) {
        ext == extension.trim_start_matches('.').to_lowercase()
    } else {
        false
    }
}

/// Print verbose information if verbose mode is enabled
pub fn verbose_println(verbose: bool, message: &str) {
    if verbose {
        println!("{} {}", style("[VERBOSE]").dim(), message);
    }
}

/// Print warning message
pub fn warn_println(message: &str) {
    println!("{} {}", style("[WARNING]").yellow().bold(), message);
}

/// Print error message
#[allow(dead_code)]
pub fn error_println(message: &str) {
    eprintln!("{} {}", style("[ERROR]").red().bold(), message);
}
