//! Fixed-interval completion polling.
//!
//! The wait is bounded by [`PollConfig::max_wait`]. Running out of time
//! is not an error: the caller still harvests, because the backend may
//! have written its artifacts even though the completion signal was
//! missed. That leniency can accept partial output.

use std::time::Duration;

use meshgen_core::config::BatchConfig;
use tokio::time::{sleep, Instant};

use crate::backend::{JobBackend, JobStatus};

/// Timing parameters for [`wait_for_completion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_wait: Duration,
    /// Pause after the completion signal before returning.
    pub settle_delay: Duration,
}

impl From<&BatchConfig> for PollConfig {
    fn from(config: &BatchConfig) -> Self {
        Self {
            interval: config.poll_interval,
            max_wait: config.max_wait,
            settle_delay: config.settle_delay,
        }
    }
}

/// How a wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Completed,
    Failed(String),
    TimedOut,
}

/// Poll `job_id` until it completes, fails, or `max_wait` elapses.
///
/// Poll errors are logged and polling continues.
pub async fn wait_for_completion<B: JobBackend + ?Sized>(
    backend: &B,
    job_id: &str,
    config: &PollConfig,
) -> WaitOutcome {
    let start = Instant::now();
    let mut polls = 0u32;

    loop {
        if start.elapsed() >= config.max_wait {
            tracing::warn!(
                prompt_id = job_id,
                max_wait_secs = config.max_wait.as_secs_f64(),
                polls,
                "Max wait reached, proceeding to harvest outputs",
            );
            return WaitOutcome::TimedOut;
        }

        polls += 1;
        match backend.poll(job_id).await {
            Ok(JobStatus::Done) => {
                tracing::debug!(prompt_id = job_id, polls, "Job reported complete");
                sleep(config.settle_delay).await;
                return WaitOutcome::Completed;
            }
            Ok(JobStatus::Failed(message)) => {
                tracing::warn!(prompt_id = job_id, error = %message, "Backend reported job failure");
                return WaitOutcome::Failed(message);
            }
            Ok(JobStatus::Pending) => {}
            Err(e) => {
                tracing::warn!(prompt_id = job_id, error = %e, "History poll error");
            }
        }

        sleep(config.interval).await;
    }
}
