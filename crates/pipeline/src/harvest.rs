//! Harvesting generated artifacts from the backend output folder.
//!
//! The backend may keep artifacts of many runs and items side by side, in
//! nested folders. For one item the harvester picks the newest file of
//! each logical variant and copies it into the flat output directory
//! under its canonical name.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use meshgen_core::config::{ARTIFACT_EXTENSION, PRIMARY_VARIANT};
use meshgen_core::naming::{logical_variant, matches_item_prefix, output_file_name};

use crate::error::PipelineError;

/// A backend file tagged with an item identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// One copied artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestedArtifact {
    pub variant: String,
    pub path: PathBuf,
}

/// Everything copied for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Harvest {
    /// The item's reported result.
    pub primary: PathBuf,
    /// Every copy made, newest source first.
    pub artifacts: Vec<HarvestedArtifact>,
}

/// Copies an item's artifacts out of the backend output folder.
#[derive(Debug, Clone)]
pub struct Harvester {
    source_dir: PathBuf,
    output_dir: PathBuf,
    extension: String,
    primary_variant: String,
}

impl Harvester {
    pub fn new(source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            extension: ARTIFACT_EXTENSION.to_string(),
            primary_variant: PRIMARY_VARIANT.to_string(),
        }
    }

    /// Override the artifact extension and primary variant.
    pub fn with_naming(mut self, extension: impl Into<String>, primary_variant: impl Into<String>) -> Self {
        self.extension = extension.into();
        self.primary_variant = primary_variant.into();
        self
    }

    /// All artifact files for `item_id`, newest first.
    ///
    /// Ties on modification time are broken by path so the order is stable.
    pub fn candidates(&self, item_id: &str) -> Vec<Candidate> {
        let mut found = Vec::new();
        self.collect(&self.source_dir, item_id, &mut found);
        found.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| a.path.cmp(&b.path))
        });
        found
    }

    /// Copy the newest artifact of every variant for `item_id`.
    pub fn harvest(&self, item_id: &str) -> Result<Harvest, PipelineError> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| PipelineError::io(&self.output_dir, e))?;

        let candidates = self.candidates(item_id);
        tracing::debug!(
            item_id,
            source_dir = %self.source_dir.display(),
            count = candidates.len(),
            "Harvest candidates",
        );
        if candidates.is_empty() {
            return Err(self.no_artifacts(item_id));
        }

        let mut seen = HashSet::new();
        let mut artifacts = Vec::new();
        let mut primary: Option<PathBuf> = None;
        let mut last_error = None;

        for candidate in candidates {
            let Some(stem) = candidate.path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(variant) = logical_variant(stem, item_id, &self.primary_variant) else {
                continue;
            };
            if !seen.insert(variant.to_string()) {
                continue;
            }

            let out_name = output_file_name(item_id, variant, &self.primary_variant, &self.extension);
            let out_path = self.output_dir.join(out_name);
            if let Err(e) = std::fs::copy(&candidate.path, &out_path) {
                tracing::error!(
                    item_id,
                    from = %candidate.path.display(),
                    to = %out_path.display(),
                    error = %e,
                    "Failed to copy artifact",
                );
                last_error = Some(PipelineError::Copy {
                    from: candidate.path.clone(),
                    to: out_path,
                    source: e,
                });
                continue;
            }
            tracing::info!(item_id, variant, path = %out_path.display(), "Copied to output");

            if variant == self.primary_variant || primary.is_none() {
                primary = Some(out_path.clone());
            }
            artifacts.push(HarvestedArtifact {
                variant: variant.to_string(),
                path: out_path,
            });
        }

        match primary {
            Some(primary) => Ok(Harvest { primary, artifacts }),
            None => Err(last_error.unwrap_or_else(|| self.no_artifacts(item_id))),
        }
    }

    // ---- private helpers ----

    fn no_artifacts(&self, item_id: &str) -> PipelineError {
        PipelineError::NoArtifacts {
            item_id: item_id.to_string(),
            extension: self.extension.clone(),
            dir: self.source_dir.clone(),
        }
    }

    fn is_artifact_for(&self, path: &Path, item_id: &str) -> bool {
        let has_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension));
        has_extension
            && path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| matches_item_prefix(stem, item_id))
    }

    /// Recursive walk; unreadable directories and entries are skipped.
    fn collect(&self, dir: &Path, item_id: &str, found: &mut Vec<Candidate>) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                if dir != self.source_dir || e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(dir = %dir.display(), error = %e, "Cannot read output directory");
                }
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                self.collect(&path, item_id, found);
            } else if self.is_artifact_for(&path, item_id) {
                match entry.metadata().and_then(|m| m.modified()) {
                    Ok(modified) => found.push(Candidate { path, modified }),
                    Err(e) => {
                        tracing::debug!(path = %path.display(), error = %e, "Skipping file without mtime");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;

    /// Write `contents` to `dir/name` with an mtime `age_secs` in the past.
    fn backend_file(dir: &Path, name: &str, contents: &str, age_secs: u64) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
        path
    }

    fn setup() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("comfy_output");
        let output = tmp.path().join("output");
        std::fs::create_dir_all(&source).unwrap();
        (tmp, source, output)
    }

    fn names_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn canonical_names_and_primary() {
        let (_tmp, source, output) = setup();
        backend_file(&source, "item_Textured_00002_.glb", "textured", 10);
        backend_file(&source, "item_WhiteMesh_00001_.glb", "white", 30);
        backend_file(&source, "item_Refined_00001_.glb", "refined", 20);

        let harvest = Harvester::new(&source, &output).harvest("item").unwrap();

        assert_eq!(
            names_in(&output),
            vec!["item.glb", "item_Refined.glb", "item_WhiteMesh.glb"]
        );
        assert_eq!(harvest.primary, output.join("item.glb"));
        assert_eq!(harvest.artifacts.len(), 3);
        assert_eq!(std::fs::read_to_string(output.join("item.glb")).unwrap(), "textured");
    }

    #[test]
    fn newest_file_per_variant_wins() {
        let (_tmp, source, output) = setup();
        backend_file(&source, "item_Textured_00001_.glb", "old", 100);
        backend_file(&source, "item_Textured_00002_.glb", "new", 5);

        let harvest = Harvester::new(&source, &output).harvest("item").unwrap();

        assert_eq!(harvest.artifacts.len(), 1);
        assert_eq!(std::fs::read_to_string(output.join("item.glb")).unwrap(), "new");
    }

    #[test]
    fn primary_variant_preferred_even_when_older() {
        let (_tmp, source, output) = setup();
        backend_file(&source, "item_WhiteMesh_00001_.glb", "white", 1);
        backend_file(&source, "item_Textured_00001_.glb", "textured", 50);

        let harvest = Harvester::new(&source, &output).harvest("item").unwrap();

        assert_eq!(harvest.primary, output.join("item.glb"));
    }

    #[test]
    fn without_primary_variant_newest_copy_is_result() {
        let (_tmp, source, output) = setup();
        backend_file(&source, "item_WhiteMesh_00001_.glb", "white", 5);
        backend_file(&source, "item_Refined_00001_.glb", "refined", 50);

        let harvest = Harvester::new(&source, &output).harvest("item").unwrap();

        assert_eq!(harvest.primary, output.join("item_WhiteMesh.glb"));
    }

    #[test]
    fn bare_counter_is_primary() {
        let (_tmp, source, output) = setup();
        backend_file(&source, "item_00001_.glb", "mesh", 5);

        let harvest = Harvester::new(&source, &output).harvest("item").unwrap();

        assert_eq!(harvest.primary, output.join("item.glb"));
    }

    #[test]
    fn nested_folders_are_searched() {
        let (_tmp, source, output) = setup();
        backend_file(&source.join("3d").join("run1"), "item_Textured_00001_.glb", "deep", 5);

        let harvest = Harvester::new(&source, &output).harvest("item").unwrap();

        assert_eq!(std::fs::read_to_string(harvest.primary).unwrap(), "deep");
    }

    #[test]
    fn unrelated_files_ignored() {
        let (_tmp, source, output) = setup();
        backend_file(&source, "item_Textured_00001_.glb", "mine", 50);
        backend_file(&source, "item2_Textured_00001_.glb", "theirs", 1);
        backend_file(&source, "other_Textured_00001_.glb", "theirs", 1);
        backend_file(&source, "item_preview_00001_.png", "png", 1);

        let harvester = Harvester::new(&source, &output);
        let candidates = harvester.candidates("item");
        assert_eq!(candidates.len(), 1);

        harvester.harvest("item").unwrap();
        assert_eq!(names_in(&output), vec!["item.glb"]);
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let (_tmp, source, output) = setup();
        backend_file(&source, "item_Textured_00001_.GLB", "upper", 5);

        let harvest = Harvester::new(&source, &output).harvest("item").unwrap();

        assert_eq!(harvest.primary, output.join("item.glb"));
    }

    #[test]
    fn no_match_is_an_error() {
        let (_tmp, source, output) = setup();
        backend_file(&source, "other_Textured_00001_.glb", "x", 5);

        let err = Harvester::new(&source, &output).harvest("item").unwrap_err();

        assert_matches!(err, PipelineError::NoArtifacts { ref item_id, .. } if item_id == "item");
    }

    #[test]
    fn missing_source_dir_is_no_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Harvester::new(tmp.path().join("absent"), tmp.path().join("out"))
            .harvest("item")
            .unwrap_err();
        assert_matches!(err, PipelineError::NoArtifacts { .. });
    }

    #[test]
    fn custom_naming() {
        let (_tmp, source, output) = setup();
        backend_file(&source, "item_Mesh_00001_.obj", "obj", 5);

        let harvest = Harvester::new(&source, &output)
            .with_naming("obj", "Mesh")
            .harvest("item")
            .unwrap();

        assert_eq!(harvest.primary, output.join("item.obj"));
    }
}
