//! Command-line arguments.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use meshgen_core::config::{
    BatchConfig, DEFAULT_MAX_IMAGE_DIMENSION, DEFAULT_MAX_WAIT_SECS, DEFAULT_POLL_INTERVAL_SECS,
};

/// Default ComfyUI REST endpoint.
pub const DEFAULT_COMFYUI_URL: &str = "http://127.0.0.1:8188/";

/// Default workflow template, relative to the working directory.
pub const DEFAULT_WORKFLOW: &str = "workflow/assets3d.json";

#[derive(Debug, Clone, Parser)]
#[command(name = "meshgen")]
#[command(version)]
#[command(about = "Convert every image in a folder to 3D meshes (GLB) through ComfyUI Trellis2")]
pub struct Cli {
    /// Folder containing input images
    #[arg(short, long, default_value = "input")]
    pub input_dir: PathBuf,

    /// Folder for output GLB files
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Path to the Trellis2 workflow JSON (API format)
    #[arg(long, default_value = DEFAULT_WORKFLOW)]
    pub workflow: PathBuf,

    /// ComfyUI API base URL
    #[arg(long, env = "COMFYUI_BASE_URL", default_value = DEFAULT_COMFYUI_URL)]
    pub comfyui_url: String,

    /// ComfyUI installation used when no ../ComfyUI sibling exists
    #[arg(long, env = "COMFYUI_DIR")]
    pub comfyui_dir: Option<PathBuf>,

    /// Override the folder staged images are written to
    #[arg(long)]
    pub comfyui_input_dir: Option<PathBuf>,

    /// Override the folder ComfyUI writes meshes to
    #[arg(long)]
    pub comfyui_output_dir: Option<PathBuf>,

    /// Regenerate all meshes, ignoring completed ones
    #[arg(short, long)]
    pub force: bool,

    /// Discard the existing checkpoint and start fresh
    #[arg(long)]
    pub force_start: bool,

    /// List completed item ids and exit
    #[arg(short, long)]
    pub list_completed: bool,

    /// Run without reading or writing a checkpoint
    #[arg(long)]
    pub no_resume: bool,

    /// Seconds to wait for one job before harvesting anyway
    #[arg(long, env = "MESHGEN_MAX_WAIT_SECS", default_value_t = DEFAULT_MAX_WAIT_SECS)]
    pub max_wait_secs: u64,

    /// Seconds between history polls
    #[arg(
        long,
        env = "MESHGEN_POLL_INTERVAL_SECS",
        default_value_t = DEFAULT_POLL_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval_secs: u64,

    /// Longest image side in pixels; larger images are scaled down
    #[arg(long, env = "MESHGEN_MAX_IMAGE_SIZE", default_value_t = DEFAULT_MAX_IMAGE_DIMENSION)]
    pub max_image_size: u32,

    /// Delete the checkpoint file after a run that produced results
    #[arg(long)]
    pub cleanup_tracking: bool,
}

impl Cli {
    /// Tunables for the batch, with the remaining fields at their defaults.
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            max_wait: Duration::from_secs(self.max_wait_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            max_image_dimension: self.max_image_size,
            keep_checkpoint: !self.cleanup_tracking,
            ..BatchConfig::default()
        }
    }

    /// Resolve `path` against `base` unless it is already absolute.
    pub fn absolute(base: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    }
}
