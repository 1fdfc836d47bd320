//! Batch coordinator.
//!
//! Splits the work list into already-completed and pending items using
//! the checkpoint store, processes the pending ones strictly in order and
//! records each success before moving on. A failed item is logged and
//! skipped; it never stops the batch.

use std::collections::BTreeMap;
use std::path::PathBuf;

use meshgen_core::checkpoint::CheckpointStore;
use meshgen_core::item::WorkItem;

use crate::item::{ItemOutcome, ProcessItem};

/// What a batch run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Every item with a usable output: processed this run or reused.
    pub results: BTreeMap<String, PathBuf>,
    /// Items processed successfully during this run, in order.
    pub generated: Vec<String>,
    /// Previously completed items carried into `results`.
    pub reused: Vec<String>,
    /// Items that failed during this run, in order.
    pub failed: Vec<String>,
}

impl RunReport {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Final summary line.
    pub fn summary(&self) -> String {
        format!(
            "{} meshes ready ({} generated, {} already completed, {} failed)",
            self.results.len(),
            self.generated.len(),
            self.reused.len(),
            self.failed.len(),
        )
    }

    /// Carry items the store already completed, and whose output still
    /// exists, into `results`. Items already in `results` are left alone.
    pub fn add_reused(&mut self, items: &[WorkItem], store: &CheckpointStore) {
        for item in items {
            if self.results.contains_key(&item.id) {
                continue;
            }
            if let Some(path) = store.recorded_path(&item.id).filter(|p| p.exists()) {
                self.reused.push(item.id.clone());
                self.results.insert(item.id.clone(), path.to_path_buf());
            }
        }
    }
}

/// Items a run would hand to the processor, in input order.
///
/// With `force_all` or without a store that is every item.
pub fn pending_items<'a>(
    items: &'a [WorkItem],
    store: Option<&CheckpointStore>,
    force_all: bool,
) -> Vec<&'a WorkItem> {
    items
        .iter()
        .filter(|item| force_all || !store.is_some_and(|s| s.is_complete(&item.id)))
        .collect()
}

/// Drives a [`ProcessItem`] over a list of work items.
pub struct BatchCoordinator<P> {
    processor: P,
    output_dir: PathBuf,
}

impl<P: ProcessItem> BatchCoordinator<P> {
    pub fn new(processor: P, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            processor,
            output_dir: output_dir.into(),
        }
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    /// Process every item the store does not consider complete.
    ///
    /// With `force_all` every item is processed. Without a store every item
    /// is pending and nothing is recorded.
    pub async fn run(
        &self,
        items: &[WorkItem],
        mut store: Option<&mut CheckpointStore>,
        force_all: bool,
    ) -> RunReport {
        if let Some(store) = store.as_deref_mut() {
            store.reconcile(&self.output_dir);
        }

        let pending = pending_items(items, store.as_deref(), force_all);
        let skipped = items.len() - pending.len();
        if skipped > 0 {
            tracing::info!(count = skipped, "Skipping items already completed");
        }
        tracing::info!(count = pending.len(), "Items to process");

        let mut report = RunReport::default();
        let total = pending.len();

        for (index, item) in pending.into_iter().enumerate() {
            tracing::info!(
                item_id = %item.id,
                position = index + 1,
                total,
                "Processing item",
            );
            match self.processor.process(item).await {
                ItemOutcome::Success(path) => {
                    if let Some(store) = store.as_deref_mut() {
                        store.record_success(&item.id, &path);
                    }
                    tracing::info!(item_id = %item.id, path = %path.display(), "Item completed");
                    report.generated.push(item.id.clone());
                    report.results.insert(item.id.clone(), path);
                }
                ItemOutcome::Failure(reason) => {
                    tracing::error!(item_id = %item.id, error = %reason, "Item failed, continuing");
                    report.failed.push(item.id.clone());
                }
            }
        }

        // Previously completed items, including ones forced through this
        // run whose reprocessing failed but whose old output survives.
        if let Some(store) = store.as_deref() {
            report.add_reused(items, store);
        }

        tracing::info!(
            generated = report.generated.len(),
            reused = report.reused.len(),
            failed = report.failed.len(),
            "Batch finished",
        );
        report
    }
}
