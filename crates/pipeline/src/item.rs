//! Per-item pipeline: stage, submit, wait, harvest.

use std::path::PathBuf;

use async_trait::async_trait;
use meshgen_comfyui::workflow::WorkflowTemplate;
use meshgen_core::item::WorkItem;

use crate::backend::JobBackend;
use crate::error::PipelineError;
use crate::harvest::Harvester;
use crate::poll::{wait_for_completion, PollConfig, WaitOutcome};
use crate::staging::ImageStager;

/// Result of processing one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Path of the primary artifact in the output directory.
    Success(PathBuf),
    /// Human-readable reason, logged by the coordinator.
    Failure(String),
}

impl From<Result<PathBuf, PipelineError>> for ItemOutcome {
    fn from(result: Result<PathBuf, PipelineError>) -> Self {
        match result {
            Ok(path) => Self::Success(path),
            Err(e) => Self::Failure(e.to_string()),
        }
    }
}

/// Something that turns a work item into an output artifact.
///
/// The coordinator only depends on this seam, so tests can drive it with
/// a processor that never touches the backend.
#[async_trait]
pub trait ProcessItem: Send + Sync {
    async fn process(&self, item: &WorkItem) -> ItemOutcome;
}

/// The real per-item pipeline over a [`JobBackend`].
pub struct ItemPipeline<B> {
    backend: B,
    template: WorkflowTemplate,
    stager: ImageStager,
    harvester: Harvester,
    poll: PollConfig,
}

impl<B: JobBackend> ItemPipeline<B> {
    pub fn new(
        backend: B,
        template: WorkflowTemplate,
        stager: ImageStager,
        harvester: Harvester,
        poll: PollConfig,
    ) -> Self {
        Self {
            backend,
            template,
            stager,
            harvester,
            poll,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run every stage for `item`, returning the primary artifact path.
    ///
    /// Submission failures end the item immediately. A wait that times out
    /// or ends with a backend error still proceeds to harvest.
    pub async fn process_one(&self, item: &WorkItem) -> Result<PathBuf, PipelineError> {
        let image_name = self.stager.stage(&item.source)?;
        tracing::debug!(item_id = %item.id, image = %image_name, "Image staged");

        let job = self.template.render(&image_name, &item.id);
        let prompt_id = self.backend.submit(&job).await?;
        tracing::info!(item_id = %item.id, prompt_id = %prompt_id, "Submitted workflow");

        match wait_for_completion(&self.backend, &prompt_id, &self.poll).await {
            WaitOutcome::Completed => {
                tracing::info!(item_id = %item.id, prompt_id = %prompt_id, "Workflow completed");
            }
            WaitOutcome::Failed(reason) => {
                tracing::warn!(
                    item_id = %item.id,
                    prompt_id = %prompt_id,
                    error = %reason,
                    "Workflow reported an error, harvesting whatever was written",
                );
            }
            WaitOutcome::TimedOut => {
                tracing::warn!(
                    item_id = %item.id,
                    prompt_id = %prompt_id,
                    "Workflow did not report completion in time, harvesting anyway",
                );
            }
        }

        let harvest = self.harvester.harvest(&item.id)?;
        Ok(harvest.primary)
    }
}

#[async_trait]
impl<B: JobBackend> ProcessItem for ItemPipeline<B> {
    async fn process(&self, item: &WorkItem) -> ItemOutcome {
        self.process_one(item).await.into()
    }
}
