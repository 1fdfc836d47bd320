//! Per-item pipeline errors.
//!
//! None of these abort a batch: the coordinator logs them against the
//! item and moves on.

use std::path::PathBuf;

use meshgen_comfyui::api::ComfyUIApiError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source has no usable file name: {0}")]
    InvalidSource(PathBuf),

    #[error(transparent)]
    Api(#[from] ComfyUIApiError),

    #[error("Backend returned no job id: {0}")]
    NoJobId(String),

    #[error("No .{extension} artifacts for '{item_id}' in {dir}")]
    NoArtifacts {
        item_id: String,
        extension: String,
        dir: PathBuf,
    },

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
