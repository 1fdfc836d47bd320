//! Persisted completion checkpoint for resumable batch runs.
//!
//! The checkpoint is a single JSON document rewritten in full after every
//! mutation:
//!
//! ```json
//! { "meshes": { "completed": ["a", "b"], "results": { "a": { "path": "/out/a.glb" } } } }
//! ```
//!
//! An entry only counts as complete while its recorded output file still
//! exists. Read failures and corrupt documents degrade to an empty
//! checkpoint, and write failures are logged rather than raised, so the
//! store can never abort a batch.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Top-level checkpoint document. Unknown keys are kept on rewrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointDocument {
    #[serde(default)]
    pub meshes: MeshCheckpoint,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Completion records for generated meshes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshCheckpoint {
    /// Completed identifiers in completion order.
    #[serde(default)]
    pub completed: Vec<String>,
    /// Identifier -> recorded result.
    #[serde(default)]
    pub results: BTreeMap<String, CheckpointEntry>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One completed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    /// Output path of the item's primary artifact.
    #[serde(default)]
    pub path: String,
    /// When the item was recorded. Absent in documents from older runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// File-backed checkpoint store. Single process, single writer.
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    document: CheckpointDocument,
}

impl CheckpointStore {
    /// Path of the checkpoint document named `name` inside `dir`.
    pub fn state_file(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.state.json"))
    }

    /// Create `dir` if needed, honour a fresh-start request and load the
    /// document.
    ///
    /// Only failing to create the directory is an error.
    pub fn open(dir: &Path, name: &str, fresh_start: bool) -> Result<Self, CoreError> {
        std::fs::create_dir_all(dir).map_err(|e| CoreError::io(dir, e))?;
        let path = Self::state_file(dir, name);
        Self::reset_if_requested(&path, fresh_start);
        Ok(Self::load(path))
    }

    /// Load the document at `path`, falling back to an empty one when the
    /// file is missing, unreadable or corrupt.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let document = match read_document(&path) {
            Ok(Some(document)) => document,
            Ok(None) => CheckpointDocument::default(),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load checkpoint, starting from an empty one",
                );
                CheckpointDocument::default()
            }
        };
        Self { path, document }
    }

    /// Delete the persisted document at `path` when `requested` is set.
    ///
    /// Returns whether a document was removed. Absent files are fine.
    pub fn reset_if_requested(path: &Path, requested: bool) -> bool {
        if !requested {
            return false;
        }
        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Force start: removed existing checkpoint");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to remove checkpoint for force start",
                );
                false
            }
        }
    }

    /// Location of the persisted document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the document currently exists on disk.
    pub fn exists_on_disk(&self) -> bool {
        self.path.exists()
    }

    /// Completed identifiers in completion order.
    pub fn completed(&self) -> &[String] {
        &self.document.meshes.completed
    }

    /// The recorded output path for `id`, if any.
    pub fn recorded_path(&self, id: &str) -> Option<&Path> {
        self.document
            .meshes
            .results
            .get(id)
            .map(|entry| entry.path.as_str())
            .filter(|path| !path.is_empty())
            .map(Path::new)
    }

    /// True iff `id` has an entry whose output file currently exists.
    pub fn is_complete(&self, id: &str) -> bool {
        self.recorded_path(id).is_some_and(Path::exists)
    }

    /// Record `id` as completed with its primary output at `output`, then
    /// persist.
    pub fn record_success(&mut self, id: &str, output: &Path) {
        let meshes = &mut self.document.meshes;
        let path = output.to_string_lossy().into_owned();
        let completed_at = Some(Utc::now());

        meshes
            .results
            .entry(id.to_string())
            .and_modify(|entry| {
                entry.path = path.clone();
                entry.completed_at = completed_at;
            })
            .or_insert_with(|| CheckpointEntry {
                path: path.clone(),
                completed_at,
                extra: serde_json::Map::new(),
            });

        if !meshes.completed.iter().any(|c| c == id) {
            meshes.completed.push(id.to_string());
        }

        self.persist();
    }

    /// Evict every entry whose output file no longer exists.
    ///
    /// Results missing from the completed list are re-added to it. The
    /// document is persisted only if something changed. Returns the number
    /// of evicted identifiers.
    pub fn reconcile(&mut self, output_dir: &Path) -> usize {
        let stale: BTreeSet<String> = self
            .document
            .meshes
            .completed
            .iter()
            .chain(self.document.meshes.results.keys())
            .filter(|id| !self.is_complete(id))
            .cloned()
            .collect();

        let meshes = &mut self.document.meshes;
        for id in &stale {
            tracing::info!(item_id = %id, "Evicting stale checkpoint entry");
        }
        meshes.completed.retain(|id| !stale.contains(id));
        meshes.results.retain(|id, _| !stale.contains(id));

        let mut repaired = false;
        for id in meshes.results.keys() {
            if !meshes.completed.contains(id) {
                meshes.completed.push(id.clone());
                repaired = true;
            }
        }

        if !stale.is_empty() || repaired {
            self.persist();
        }
        if !stale.is_empty() {
            tracing::info!(
                removed = stale.len(),
                output_dir = %output_dir.display(),
                "Removed checkpoint entries whose output is missing",
            );
        }
        stale.len()
    }

    /// One-line progress summary.
    pub fn summary(&self) -> String {
        format!("Progress: Meshes completed {}", self.document.meshes.completed.len())
    }

    /// End-of-run housekeeping: delete the document unless `keep_file`.
    pub fn finalize(&self, keep_file: bool) {
        if keep_file || !self.path.exists() {
            tracing::info!(path = %self.path.display(), "All operations completed, tracking file preserved");
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "All operations completed, tracking file removed");
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove tracking file");
            }
        }
    }

    // ---- private helpers ----

    /// Write the document, logging instead of failing.
    fn persist(&self) {
        if let Err(e) = self.write_document() {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to save checkpoint");
        }
    }

    /// Full rewrite through a temporary sibling and an atomic rename.
    fn write_document(&self) -> Result<(), CoreError> {
        let json = serde_json::to_vec_pretty(&self.document).map_err(|e| CoreError::Json {
            path: self.path.clone(),
            source: e,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        let mut file = std::fs::File::create(&tmp).map_err(|e| CoreError::io(&tmp, e))?;
        file.write_all(&json).map_err(|e| CoreError::io(&tmp, e))?;
        file.sync_all().map_err(|e| CoreError::io(&tmp, e))?;
        drop(file);

        std::fs::rename(&tmp, &self.path).map_err(|e| CoreError::io(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), "Checkpoint saved");
        Ok(())
    }
}

/// Read and parse the document; `Ok(None)` when the file does not exist.
fn read_document(path: &Path) -> Result<Option<CheckpointDocument>, CoreError> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CoreError::io(path, e)),
    };
    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(|e| CoreError::Json {
            path: path.to_path_buf(),
            source: e,
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
