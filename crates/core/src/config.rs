//! Batch tunables and their defaults.
//!
//! Everything the coordinator and per-item pipeline need to know about
//! timing, image limits and checkpoint retention travels in a single
//! [`BatchConfig`] built once at startup.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Longest image side (pixels) sent to the backend.
pub const DEFAULT_MAX_IMAGE_DIMENSION: u32 = 1024;

/// Upper bound on how long a single job is polled.
pub const DEFAULT_MAX_WAIT_SECS: u64 = 3600;

/// Delay between two history polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Pause after the backend reports completion, so output files are flushed.
pub const DEFAULT_SETTLE_DELAY_SECS: u64 = 2;

/// Directory (relative to the output directory) holding checkpoint files.
pub const TRACKING_DIR_NAME: &str = "tracking";

/// Base name of the checkpoint document (`{name}.state.json`).
pub const CHECKPOINT_NAME: &str = "image2mesh";

/// Extension of the artifacts harvested from the backend.
pub const ARTIFACT_EXTENSION: &str = "glb";

/// Variant whose copy is reported as the item's result.
pub const PRIMARY_VARIANT: &str = "Textured";

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Tunables for a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Give up polling a job after this long and harvest anyway.
    pub max_wait: Duration,
    /// Interval between history polls.
    pub poll_interval: Duration,
    /// Pause between a completion signal and harvesting.
    pub settle_delay: Duration,
    /// Longest image side; larger inputs are scaled down before staging.
    pub max_image_dimension: u32,
    /// Keep the checkpoint document after a successful run.
    pub keep_checkpoint: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(DEFAULT_MAX_WAIT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            settle_delay: Duration::from_secs(DEFAULT_SETTLE_DELAY_SECS),
            max_image_dimension: DEFAULT_MAX_IMAGE_DIMENSION,
            keep_checkpoint: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = BatchConfig::default();
        assert_eq!(config.max_wait, Duration::from_secs(3600));
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.settle_delay, Duration::from_secs(2));
        assert_eq!(config.max_image_dimension, 1024);
        assert!(config.keep_checkpoint);
    }

    #[test]
    fn poll_interval_shorter_than_max_wait() {
        let config = BatchConfig::default();
        assert!(config.poll_interval < config.max_wait);
    }
}
