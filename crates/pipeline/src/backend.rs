//! Job backend abstraction.
//!
//! The pipeline only needs two operations from the generation service:
//! queue a job and ask whether it is done. [`ComfyUIApi`] implements
//! them over HTTP; tests substitute in-process fakes.

use async_trait::async_trait;
use meshgen_comfyui::api::{truncate_body, ComfyUIApi};
use meshgen_comfyui::history::{prompt_state, PromptState};

use crate::error::PipelineError;

/// Completion state of a submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Done,
    Failed(String),
}

impl From<PromptState> for JobStatus {
    fn from(state: PromptState) -> Self {
        match state {
            PromptState::Pending => Self::Pending,
            PromptState::Completed => Self::Done,
            PromptState::Failed(message) => Self::Failed(message),
        }
    }
}

/// An external service that turns job descriptions into artifacts.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Queue `job`, returning the backend's job ID.
    async fn submit(&self, job: &serde_json::Value) -> Result<String, PipelineError>;

    /// Report the current state of `job_id`.
    async fn poll(&self, job_id: &str) -> Result<JobStatus, PipelineError>;
}

#[async_trait]
impl JobBackend for ComfyUIApi {
    async fn submit(&self, job: &serde_json::Value) -> Result<String, PipelineError> {
        let response = self.submit_workflow(job).await?;
        match response.prompt_id {
            Some(prompt_id) if !prompt_id.is_empty() => Ok(prompt_id),
            _ => {
                let detail = response
                    .error
                    .or(response.node_errors)
                    .map(|err| truncate_body(&err.to_string()))
                    .unwrap_or_else(|| "empty response".to_string());
                Err(PipelineError::NoJobId(detail))
            }
        }
    }

    async fn poll(&self, job_id: &str) -> Result<JobStatus, PipelineError> {
        let history = self.get_history(job_id).await?;
        Ok(prompt_state(&history, job_id).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_state_maps_to_job_status() {
        assert_eq!(JobStatus::from(PromptState::Pending), JobStatus::Pending);
        assert_eq!(JobStatus::from(PromptState::Completed), JobStatus::Done);
        assert_eq!(
            JobStatus::from(PromptState::Failed("oom".into())),
            JobStatus::Failed("oom".into())
        );
    }
}
