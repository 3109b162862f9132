use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::time::Instant;

mod cli;
mod config_file;
mod cropping;
mod error;
mod pool;
mod utils;

use cli::{Args, ShapeArg};
use cropping::{CropConfig, CropEngine, CropShape};
use utils::{create_progress_bar, format_duration, validate_inputs, warn_println};

impl From<ShapeArg> for CropShape {
    fn from(shape: ShapeArg) -> Self {
        match shape {
            ShapeArg::Square => CropShape::Square,
            ShapeArg::Rectangle => CropShape::Rectangle,
            ShapeArg::Circle => CropShape::Circle,
            ShapeArg::Ellipse => CropShape::Ellipse,
        }
    }
}

fn main() -> Result<()> {
    let start_time = Instant::now();
    let mut args = Args::parse();

    // Print banner
    println!(
        "{}",
        style(format!(
            "YOLO Crop v{} - Batch Object Cropper",
            env!("CARGO_PKG_VERSION")
        ))
        .bold()
        .blue()
    );
    println!(
        "{}",
        style("Annotation-driven training crop extraction").dim()
    );
    println!();

    // Config file values fill in flags not given on the command line
    args.load_and_merge_config()?;

    // Validate inputs
    validate_inputs(&args)?;

    let input_dir = args
        .input_dir
        .clone()
        .context("No input directory specified")?;
    let output_dir = args
        .output_dir
        .clone()
        .context("No output directory specified")?;
    let target_size = args.parse_size().map_err(|e| anyhow::anyhow!(e))?;
    let (padding_h, padding_v) = args.parse_padding().map_err(|e| anyhow::anyhow!(e))?;

    // Create crop configuration
    let config = CropConfig {
        annotations_dir: args
            .annotations_dir
            .clone()
            .unwrap_or_else(|| input_dir.clone()),
        input_dir,
        output_dir: output_dir.clone(),
        extension: args.normalized_extension(),
        jobs: if args.jobs == 0 {
            num_cpus::get()
        } else {
            args.jobs
        },
        shape: args.shape.map(CropShape::from),
        background: args.background.clone(),
        class_filter: args.class_id,
        min_confidence: args.confidence,
        padding_h,
        padding_v,
        min_object_size: args.min_size,
        max_object_size: args.max_size,
        target_size,
        lock: args.lock,
        quota: args.quota,
        verbose: args.verbose,
    };

    if config.verbose {
        println!("{}", style("Configuration:").bold());
        println!("  Input directory: {}", config.input_dir.display());
        println!(
            "  Annotation directory: {}",
            config.annotations_dir.display()
        );
        println!("  Output directory: {}", config.output_dir.display());
        println!("  Extension: {}", config.extension);
        println!("  Parallel jobs: {}", config.jobs);
        match config.target_size {
            Some((width, height)) => println!("  Target size: {}x{}", width, height),
            None => println!("  Target size: from object box"),
        }
        println!("  Shape: {:?}", config.shape);
        println!("  Padding: {}x{}", config.padding_h, config.padding_v);
        println!("  Confidence threshold: {}", config.min_confidence);
        if let Some(class) = config.class_filter {
            println!("  Class filter: {}", class);
        }
        if let Some(min) = config.min_object_size {
            println!("  Minimum object size: {}px", min);
        }
        if let Some(max) = config.max_object_size {
            println!("  Maximum object size: {}px", max);
        }
        if let Some(background) = &config.background {
            println!("  Background: {}", background.display());
        }
        println!("  Lock to image bounds: {}", config.lock);
        if let Some(quota) = config.quota {
            println!("  Crop quota: {}", quota);
        }
        println!();
    }

    // Create output directory
    std::fs::create_dir_all(&output_dir).context("Failed to create output directory")?;

    let engine = CropEngine::new(config);

    // Discover all images
    let image_files = engine.discover_images()?;
    if image_files.is_empty() {
        println!(
            "{}",
            style("No images found with the configured extension").red()
        );
        return Ok(());
    }
    println!(
        "Found {} images to process",
        style(image_files.len()).bold()
    );
    println!();

    // Process images
    let progress = create_progress_bar(image_files.len() as u64);
    progress.set_message("Cropping");

    let verbose = args.verbose;
    let mut failures: Vec<(String, Vec<String>)> = Vec::new();
    let summary = engine.run(&image_files, |outcome| {
        progress.inc(1);

        let filename = outcome
            .image
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("unknown")
            .to_string();

        if verbose {
            progress.println(format!(
                "[{}] {}: {} crops",
                outcome.index, filename, outcome.saved
            ));
        }

        if outcome.is_failed() {
            let mut lines = Vec::new();
            if let Some(fatal) = &outcome.fatal {
                lines.push(fatal.to_string());
            }
            lines.extend(outcome.record_errors.iter().cloned());
            failures.push((filename, lines));
        }
    })?;

    progress.finish_with_message("✓ Cropping complete");
    println!();

    let total_time = start_time.elapsed();

    // Print results summary
    println!("{}", style("Results Summary:").bold().green());
    println!(
        "  Crops created: {}",
        style(summary.crops_saved).bold().green()
    );
    println!(
        "  Images processed: {}",
        style(format!(
            "{}/{}",
            summary.images_collected, summary.images_total
        ))
        .bold()
    );
    if summary.images_failed > 0 {
        println!(
            "  Images with errors: {}",
            style(summary.images_failed).bold().red()
        );
    }
    if summary.record_errors > 0 {
        println!(
            "  Failed crops: {}",
            style(summary.record_errors).bold().red()
        );
    }
    if summary.quota_reached {
        println!(
            "  Quota: {}",
            style("reached, collection stopped early").bold().yellow()
        );
    }

    if let Some(quota) = args.quota {
        if summary.crops_saved < quota {
            println!();
            warn_println(&format!(
                "Only {} of the requested {} crops were created",
                summary.crops_saved, quota
            ));
        }
    }

    if !failures.is_empty() {
        println!();
        println!("{}", style("Errors encountered:").bold().red());
        for (i, (filename, lines)) in failures.iter().enumerate() {
            println!(
                "  {}: {}",
                style(format!("#{}", i + 1)).dim(),
                style(filename).bold().red()
            );
            for line in lines {
                println!("     {}", line);
            }
        }

        println!();
        println!(
            "{}",
            style(format!(
                "⚠ {} images had errors during cropping",
                failures.len()
            ))
            .bold()
            .yellow()
        );
        println!("  Check the annotation files and try again with --verbose for more details");
    }

    println!();
    println!("{}", style("Performance:").bold().blue());
    println!(
        "  Total processing time: {}",
        style(format_duration(total_time)).bold()
    );
    if summary.images_collected > 0 {
        println!(
            "  Average time per image: {}",
            style(format_duration(total_time / summary.images_collected as u32)).dim()
        );
    }

    println!();
    println!("{}", style("Output files:").bold().green());
    println!("  All files: {}", output_dir.display());

    Ok(())
}
