pub mod annotation;
pub mod buffer;
pub mod codec;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::error::CropError;
use crate::pool::WorkerPool;
use crate::utils::{has_extension, verbose_println};

pub use annotation::Detection;
pub use buffer::PixelBuffer;
pub use codec::OutputFormat;

/// Crop-boundary policy. `None` in [`CropConfig::shape`] crops the plain
/// padded bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropShape {
    /// Rectangular window sized to the shorter box side.
    Square,
    /// Rectangular window sized to the padded box.
    Rectangle,
    /// Elliptical window sized to the shorter box side.
    Circle,
    /// Elliptical window sized to the padded box.
    Ellipse,
}

/// Immutable job configuration, cloned into every per-image task.
#[derive(Debug, Clone)]
pub struct CropConfig {
    pub input_dir: PathBuf,
    pub annotations_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Normalized extension with leading dot, e.g. ".png"; filters input
    /// discovery and names and encodes outputs.
    pub extension: String,
    pub jobs: usize,
    pub shape: Option<CropShape>,
    pub background: Option<PathBuf>,
    pub class_filter: Option<i32>,
    pub min_confidence: f64,
    pub padding_h: u32,
    pub padding_v: u32,
    pub min_object_size: Option<u32>,
    pub max_object_size: Option<u32>,
    pub target_size: Option<(u32, u32)>,
    pub lock: bool,
    pub quota: Option<usize>,
    pub verbose: bool,
}

/// What happened to one source image.
#[derive(Debug)]
pub struct ImageOutcome {
    pub image: PathBuf,
    pub index: usize,
    /// Crops written to disk.
    pub saved: usize,
    /// Per-record failures (crop or encode); the record loop continued past
    /// these.
    pub record_errors: Vec<String>,
    /// Error that abandoned the whole image (decode failure, unreadable or
    /// malformed annotation file).
    pub fatal: Option<CropError>,
}

impl ImageOutcome {
    pub fn is_failed(&self) -> bool {
        self.fatal.is_some() || !self.record_errors.is_empty()
    }
}

/// Aggregate tallies for one batch run.
#[derive(Debug)]
pub struct BatchSummary {
    pub images_total: usize,
    /// Outcomes collected before the quota cut the run short.
    pub images_collected: usize,
    pub crops_saved: usize,
    pub images_failed: usize,
    pub record_errors: usize,
    pub quota_reached: bool,
}

pub struct CropEngine {
    config: CropConfig,
}

impl CropEngine {
    pub fn new(config: CropConfig) -> Self {
        Self { config }
    }

    /// Discover the image files to process, sorted so the per-image index is
    /// deterministic across runs.
    pub fn discover_images(&self) -> Result<Vec<PathBuf>> {
        verbose_println(
            self.config.verbose,
            &format!("Scanning directory: {}", self.config.input_dir.display()),
        );

        let mut image_files = Vec::new();
        let walker = WalkDir::new(&self.config.input_dir)
            .follow_links(false)
            .max_depth(1);

        for entry in walker {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() && has_extension(path, &self.config.extension) {
                image_files.push(path.to_path_buf());
            }
        }

        image_files.sort();

        verbose_println(
            self.config.verbose,
            &format!("Found {} image files", image_files.len()),
        );
        Ok(image_files)
    }

    /// Crop every image, calling `on_outcome` as each per-image result is
    /// collected (in submission order).
    ///
    /// With a quota configured, collection stops once the tallied crop count
    /// meets it; tasks already dispatched still run to completion and their
    /// writes land on disk, but their counts are no longer tallied.
    pub fn run<F>(&self, images: &[PathBuf], mut on_outcome: F) -> Result<BatchSummary>
    where
        F: FnMut(&ImageOutcome),
    {
        let background = match &self.config.background {
            Some(path) => {
                let buffer = codec::decode(path, None).with_context(|| {
                    format!("Failed to load background image {}", path.display())
                })?;
                verbose_println(
                    self.config.verbose,
                    &format!(
                        "Background image: {}x{}x{}",
                        buffer.width(),
                        buffer.height(),
                        buffer.channels()
                    ),
                );
                Some(Arc::new(buffer))
            }
            None => None,
        };

        let pool = WorkerPool::new(self.config.jobs.max(1));
        verbose_println(
            self.config.verbose,
            &format!("Dispatching {} worker threads", pool.worker_count()),
        );

        let mut handles = Vec::with_capacity(images.len());
        for (index, image_path) in images.iter().enumerate() {
            let config = self.config.clone();
            let image_path = image_path.clone();
            let annotation_path = self.annotation_path_for(&image_path);
            let background = background.clone();

            handles.push(pool.submit(move || {
                process_image(
                    &config,
                    &image_path,
                    &annotation_path,
                    background.as_deref(),
                    index,
                )
            }));
        }

        let mut summary = BatchSummary {
            images_total: images.len(),
            images_collected: 0,
            crops_saved: 0,
            images_failed: 0,
            record_errors: 0,
            quota_reached: false,
        };

        for handle in handles {
            let Some(outcome) = handle.wait() else {
                break;
            };

            summary.images_collected += 1;
            summary.crops_saved += outcome.saved;
            summary.record_errors += outcome.record_errors.len();
            if outcome.is_failed() {
                summary.images_failed += 1;
            }
            on_outcome(&outcome);

            if let Some(quota) = self.config.quota {
                if summary.crops_saved >= quota {
                    summary.quota_reached = true;
                    break;
                }
            }
        }

        // Remaining dispatched tasks finish before the workers are joined.
        pool.shutdown();

        Ok(summary)
    }

    fn annotation_path_for(&self, image_path: &Path) -> PathBuf {
        let stem = image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image");
        self.config.annotations_dir.join(format!("{}.txt", stem))
    }
}

/// One image's task: decode, parse annotations, crop and write each accepted
/// record. Never panics or propagates across the pool boundary; everything is
/// reported through the returned outcome.
fn process_image(
    config: &CropConfig,
    image_path: &Path,
    annotation_path: &Path,
    background: Option<&PixelBuffer>,
    index: usize,
) -> ImageOutcome {
    let mut outcome = ImageOutcome {
        image: image_path.to_path_buf(),
        index,
        saved: 0,
        record_errors: Vec::new(),
        fatal: None,
    };

    // A configured background sets the channel count; the source decode is
    // forced to match it.
    let source = match codec::decode(image_path, background.map(|bg| bg.channels())) {
        Ok(buffer) => buffer,
        Err(err) => {
            outcome.fatal = Some(err);
            return outcome;
        }
    };

    let contents = match std::fs::read_to_string(annotation_path) {
        Ok(contents) => contents,
        Err(err) => {
            outcome.fatal = Some(CropError::Io(err));
            return outcome;
        }
    };

    let stem = image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");

    for (line_idx, line) in contents.lines().enumerate() {
        let detection = match annotation::parse_detection_line(line, annotation_path, line_idx + 1)
        {
            Ok(Some(detection)) => detection,
            Ok(None) => continue,
            Err(err) => {
                // Malformed line: the remainder of this file is abandoned.
                outcome.fatal = Some(err);
                return outcome;
            }
        };

        if let Some(class) = config.class_filter {
            if detection.class_id != class {
                continue;
            }
        }
        if detection.confidence < config.min_confidence {
            continue;
        }

        let Some(window) = resolve_window(&detection, source.width(), source.height(), config)
        else {
            continue;
        };

        match crop_record(&source, &window, background, config) {
            Ok(crop) => {
                let name = format!(
                    "{}_{}_{}_{}_{}_{}{}",
                    stem,
                    detection.class_id,
                    window.center_x,
                    window.center_y,
                    outcome.saved,
                    index,
                    config.extension
                );
                match codec::encode(&crop, &config.output_dir.join(name)) {
                    Ok(()) => outcome.saved += 1,
                    Err(err) => outcome.record_errors.push(err.to_string()),
                }
            }
            Err(err) => outcome.record_errors.push(err.to_string()),
        }
    }

    outcome
}

/// The extraction window resolved from one detection.
#[derive(Debug, PartialEq, Eq)]
struct CropWindow {
    x: i64,
    y: i64,
    width: u32,
    height: u32,
    elliptical: bool,
    center_x: i64,
    center_y: i64,
}

/// Resolve a detection into pixel-space geometry, or `None` when a size
/// filter or the lock flag discards it.
fn resolve_window(
    detection: &Detection,
    src_w: u32,
    src_h: u32,
    config: &CropConfig,
) -> Option<CropWindow> {
    let center_x = (detection.cx * src_w as f64).round() as i64;
    let center_y = (detection.cy * src_h as f64).round() as i64;

    let pad_h = config.padding_h as i64;
    let pad_v = config.padding_v as i64;
    let object_w = (detection.width * src_w as f64).round() as i64 + 2 * pad_h;
    let object_h = (detection.height * src_h as f64).round() as i64 + 2 * pad_v;
    let min_side = object_w.min(object_h);

    // Size filters measure the padded object on both ends.
    if let Some(min_size) = config.min_object_size {
        if min_side < min_size as i64 + 2 * pad_h.min(pad_v) {
            return None;
        }
    }
    if let Some(max_size) = config.max_object_size {
        if object_w.max(object_h) > max_size as i64 + 2 * pad_h.max(pad_v) {
            return None;
        }
    }

    let (width, height, elliptical) = match config.shape {
        None => match config.target_size {
            Some((tw, th)) => (tw as i64, th as i64, false),
            None => (object_w, object_h, false),
        },
        Some(CropShape::Square) => (min_side, min_side, false),
        Some(CropShape::Rectangle) => (object_w, object_h, false),
        Some(CropShape::Circle) => (min_side, min_side, true),
        Some(CropShape::Ellipse) => (object_w, object_h, true),
    };

    // Degenerate boxes resolve to an empty window rather than wrapping.
    let width = width.clamp(0, u32::MAX as i64);
    let height = height.clamp(0, u32::MAX as i64);
    let x = center_x - width / 2;
    let y = center_y - height / 2;

    if config.lock && (x < 0 || y < 0 || x + width > src_w as i64 || y + height > src_h as i64) {
        return None;
    }

    Some(CropWindow {
        x,
        y,
        width: width as u32,
        height: height as u32,
        elliptical,
        center_x,
        center_y,
    })
}

fn crop_record(
    source: &PixelBuffer,
    window: &CropWindow,
    background: Option<&PixelBuffer>,
    config: &CropConfig,
) -> Result<PixelBuffer, CropError> {
    let canvas = config.target_size;
    let (canvas_w, canvas_h) = canvas.unwrap_or((window.width, window.height));

    // Each record composites into its own canvas-sized cut from the center of
    // the shared background; the shared buffer itself is never written to.
    let background = match background {
        Some(shared) => Some(shared.crop_rect(
            shared.width() as i64 / 2 - canvas_w as i64 / 2,
            shared.height() as i64 / 2 - canvas_h as i64 / 2,
            canvas_w,
            canvas_h,
            None,
            None,
        )?),
        None => None,
    };

    if window.elliptical {
        source.crop_ellipse(
            window.x,
            window.y,
            window.width,
            window.height,
            background,
            canvas,
        )
    } else {
        source.crop_rect(
            window.x,
            window.y,
            window.width,
            window.height,
            background,
            canvas,
        )
    }
}
