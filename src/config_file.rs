use crate::cli::{Args, ShapeArg};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// JSON run configuration, mirroring the command line flags
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub input_dir: Option<String>,
    pub output_dir: Option<String>,
    pub annotations_dir: Option<String>,
    pub extension: Option<String>,
    pub jobs: Option<usize>,
    pub size: Option<String>,
    pub padding: Option<String>,
    pub shape: Option<String>,
    pub background: Option<String>,
    pub class: Option<i32>,
    pub confidence: Option<f64>,
    pub min_size: Option<u32>,
    pub max_size: Option<u32>,
    pub lock: Option<bool>,
    pub quota: Option<usize>,
    pub verbose: Option<bool>,
}

impl Args {
    /// Load configuration from a JSON file and merge with command-line arguments
    /// Command-line arguments take precedence over config file values
    pub fn load_and_merge_config(&mut self) -> Result<()> {
        if let Some(config_path) = self.config_file.clone() {
            let contents = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

            let config: ConfigFile = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

            self.merge_from_config(config);

            if self.verbose {
                eprintln!("Loaded configuration from: {:?}", config_path);
            }
        }
        Ok(())
    }

    fn merge_from_config(&mut self, config: ConfigFile) {
        // We check if arguments were explicitly provided on the command line
        let args_from_cli = std::env::args().collect::<Vec<_>>();

        // Path arguments - only apply if not specified on CLI
        if self.input_dir.is_none() {
            if let Some(input) = config.input_dir {
                self.input_dir = Some(PathBuf::from(input));
            }
        }

        if self.output_dir.is_none() {
            if let Some(output) = config.output_dir {
                self.output_dir = Some(PathBuf::from(output));
            }
        }

        if self.annotations_dir.is_none() {
            if let Some(annotations) = config.annotations_dir {
                self.annotations_dir = Some(PathBuf::from(annotations));
            }
        }

        if self.background.is_none() {
            if let Some(background) = config.background {
                self.background = Some(PathBuf::from(background));
            }
        }

        // String parameters with defaults - only apply if not given on CLI
        if !args_from_cli.iter().any(|a| a == "-e" || a == "--extension") {
            if let Some(extension) = config.extension {
                self.extension = extension;
            }
        }

        if !args_from_cli.iter().any(|a| a == "--confidence") {
            if let Some(confidence) = config.confidence {
                self.confidence = confidence;
            }
        }

        // Crop geometry
        if self.size.is_none() {
            self.size = config.size;
        }

        if self.padding.is_none() {
            self.padding = config.padding;
        }

        if self.shape.is_none() {
            if let Some(shape) = config.shape {
                self.shape = match shape.as_str() {
                    "square" => Some(ShapeArg::Square),
                    "rectangle" | "rect" => Some(ShapeArg::Rectangle),
                    "circle" => Some(ShapeArg::Circle),
                    "ellipse" => Some(ShapeArg::Ellipse),
                    _ => None,
                };
            }
        }

        // Filters and limits
        if self.class_id.is_none() {
            self.class_id = config.class;
        }

        if self.min_size.is_none() {
            self.min_size = config.min_size;
        }

        if self.max_size.is_none() {
            self.max_size = config.max_size;
        }

        if self.quota.is_none() {
            self.quota = config.quota;
        }

        if self.jobs == 0 {
            if let Some(jobs) = config.jobs {
                self.jobs = jobs;
            }
        }

        // Boolean flags - only apply if currently false (default)
        if !self.lock {
            self.lock = config.lock.unwrap_or(false);
        }

        if !self.verbose {
            self.verbose = config.verbose.unwrap_or(false);
        }
    }
}
