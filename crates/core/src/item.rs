//! Work-item discovery.
//!
//! A work item is one source image in a flat input directory. Its
//! identifier is the filename stem, which also becomes the output
//! prefix the backend tags its artifacts with.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// Image extensions (lowercase, without the dot) accepted as input.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "tga"];

/// One unit of work: a source image and the identifier derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Filename stem, unique within a run.
    pub id: String,
    /// Absolute or caller-relative path of the source image.
    pub source: PathBuf,
}

impl WorkItem {
    pub fn new(id: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
        }
    }
}

/// Whether a path carries one of the [`IMAGE_EXTENSIONS`] (case-insensitive).
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// List the image files directly inside `input_dir`, sorted by filename.
///
/// The directory is not searched recursively. A missing directory yields
/// an empty list. When two files share a stem (`a.png`, `a.jpg`) the first
/// in filename order wins and the rest are skipped with a warning.
pub fn discover_items(input_dir: &Path) -> Result<Vec<WorkItem>, CoreError> {
    if !input_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    let entries = std::fs::read_dir(input_dir).map_err(|e| CoreError::io(input_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| CoreError::io(input_dir, e))?;
        let path = entry.path();
        if path.is_file() && is_image_file(&path) {
            names.push(entry.file_name());
        }
    }
    names.sort();

    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(names.len());
    for name in names {
        let source = input_dir.join(&name);
        let Some(stem) = source.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            tracing::warn!(path = %source.display(), "Skipping image with non UTF-8 name");
            continue;
        };
        if !seen.insert(stem.clone()) {
            tracing::warn!(
                item_id = %stem,
                path = %source.display(),
                "Skipping image whose stem duplicates an earlier file",
            );
            continue;
        }
        items.push(WorkItem::new(stem, source));
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn image_extension_is_case_insensitive() {
        assert!(is_image_file(Path::new("a.PNG")));
        assert!(is_image_file(Path::new("b.JpEg")));
        assert!(is_image_file(Path::new("c.tga")));
        assert!(!is_image_file(Path::new("d.txt")));
        assert!(!is_image_file(Path::new("noext")));
    }

    #[test]
    fn missing_directory_yields_no_items() {
        let tmp = tempfile::tempdir().unwrap();
        let items = discover_items(&tmp.path().join("absent")).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn items_are_sorted_and_filtered() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "c.png");
        touch(tmp.path(), "a.jpg");
        touch(tmp.path(), "b.webp");
        touch(tmp.path(), "notes.txt");
        std::fs::create_dir(tmp.path().join("nested.png")).unwrap();

        let items = discover_items(tmp.path()).unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(items[0].source, tmp.path().join("a.jpg"));
    }

    #[test]
    fn nested_directories_are_not_searched() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        touch(&tmp.path().join("sub"), "deep.png");
        touch(tmp.path(), "top.png");

        let items = discover_items(tmp.path()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "top");
    }

    #[test]
    fn id_is_full_stem_and_source_is_kept() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "scan01.v2.png");

        let items = discover_items(tmp.path()).unwrap();
        assert_eq!(items, vec![WorkItem::new("scan01.v2", tmp.path().join("scan01.v2.png"))]);
    }

    #[test]
    fn duplicate_stems_keep_first_in_filename_order() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "robot.png");
        touch(tmp.path(), "robot.jpg");

        let items = discover_items(tmp.path()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source, tmp.path().join("robot.jpg"));
    }
}
