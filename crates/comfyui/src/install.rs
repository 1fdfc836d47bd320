//! Location of a local ComfyUI installation.
//!
//! Staged inputs go to `{comfyui}/input` and generated artifacts appear
//! under `{comfyui}/output`. The installation is looked up next to the
//! working directory first, then through `COMFYUI_DIR`.

use std::path::{Path, PathBuf};

/// Environment variable naming an alternative ComfyUI installation.
pub const COMFYUI_DIR_ENV: &str = "COMFYUI_DIR";

/// File whose presence marks a directory as a ComfyUI installation.
const MARKER_FILE: &str = "main.py";

/// Input and output folders of a ComfyUI installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComfyUIDirs {
    /// Where staged source images are written.
    pub input: PathBuf,
    /// Where the backend writes generated artifacts.
    pub output: PathBuf,
}

impl ComfyUIDirs {
    /// Folders beneath an installation root.
    pub fn under(root: &Path) -> Self {
        Self {
            input: root.join("input"),
            output: root.join("output"),
        }
    }
}

fn is_installation(dir: &Path) -> bool {
    dir.join(MARKER_FILE).is_file()
}

/// Resolve the installation root.
///
/// Order: `{base_dir}/../ComfyUI` when it holds `main.py`, then
/// `alternative` (usually `$COMFYUI_DIR`) when it holds `main.py`, and
/// finally the sibling candidate even though it does not look like an
/// installation.
pub fn resolve_comfyui_dir(base_dir: &Path, alternative: Option<&Path>) -> PathBuf {
    let candidate = base_dir
        .parent()
        .map(|parent| parent.join("ComfyUI"))
        .unwrap_or_else(|| base_dir.join("ComfyUI"));
    if is_installation(&candidate) {
        return candidate;
    }
    if let Some(alt) = alternative.filter(|alt| is_installation(alt)) {
        return alt.to_path_buf();
    }
    tracing::debug!(
        candidate = %candidate.display(),
        "No ComfyUI installation found, using sibling candidate",
    );
    candidate
}
