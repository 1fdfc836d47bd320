//! ComfyUI history types and completion detection.
//!
//! `GET /history/{prompt_id}` returns `{}` until the prompt has been
//! picked up, then an object keyed by prompt ID:
//!
//! ```json
//! { "<prompt_id>": { "status": { "status_str": "success", "completed": true,
//!                                "exec_info": { "queue_remaining": 0 } } } }
//! ```
//!
//! This module deserializes that shape and reduces it to a
//! [`PromptState`].

use serde::Deserialize;

/// A single prompt's history record.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub status: HistoryStatus,
}

/// Execution status block of a history record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryStatus {
    /// `"success"` or `"error"` once execution has finished.
    #[serde(default)]
    pub status_str: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub exec_info: Option<ExecInfo>,
    /// `[event_name, payload]` pairs recorded during execution.
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
}

/// Execution queue statistics.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecInfo {
    #[serde(default)]
    pub queue_remaining: Option<i32>,
}

/// What the history says about one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptState {
    /// Not in the history yet, or still has queued work.
    Pending,
    /// Finished (or no queue information left to wait on).
    Completed,
    /// ComfyUI reported an execution error.
    Failed(String),
}

impl HistoryStatus {
    /// The first `exception_message` of an `execution_error` event, if any.
    pub fn error_message(&self) -> Option<String> {
        self.messages
            .iter()
            .filter_map(|message| message.as_array())
            .find(|pair| pair.first().and_then(|e| e.as_str()) == Some("execution_error"))
            .and_then(|pair| pair.get(1))
            .and_then(|payload| payload.get("exception_message"))
            .and_then(|msg| msg.as_str())
            .map(str::to_string)
    }
}

/// Reduce a `/history/{prompt_id}` body to the prompt's state.
///
/// A missing `queue_remaining` counts as zero, so an entry without
/// `exec_info` is complete. Records that fail to deserialize are treated
/// as pending so the caller keeps polling.
pub fn prompt_state(history: &serde_json::Value, prompt_id: &str) -> PromptState {
    let Some(raw) = history.get(prompt_id) else {
        return PromptState::Pending;
    };

    let entry = match HistoryEntry::deserialize(raw) {
        Ok(entry) => entry,
        Err(e) => {
            tracing::warn!(prompt_id, error = %e, "Failed to parse ComfyUI history entry");
            return PromptState::Pending;
        }
    };

    if entry.status.status_str.as_deref() == Some("error") {
        let message = entry
            .status
            .error_message()
            .unwrap_or_else(|| "execution failed".to_string());
        return PromptState::Failed(message);
    }

    let queue_remaining = entry
        .status
        .exec_info
        .and_then(|info| info.queue_remaining)
        .unwrap_or(0);
    if queue_remaining == 0 {
        PromptState::Completed
    } else {
        PromptState::Pending
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_history_is_pending() {
        assert_eq!(prompt_state(&json!({}), "abc"), PromptState::Pending);
    }

    #[test]
    fn other_prompt_is_pending() {
        let history = json!({"other": {"status": {"status_str": "success"}}});
        assert_eq!(prompt_state(&history, "abc"), PromptState::Pending);
    }

    #[test]
    fn zero_queue_remaining_is_completed() {
        let history = json!({"abc": {"status": {"exec_info": {"queue_remaining": 0}}}});
        assert_eq!(prompt_state(&history, "abc"), PromptState::Completed);
    }

    #[test]
    fn queued_work_is_pending() {
        let history = json!({"abc": {"status": {"exec_info": {"queue_remaining": 2}}}});
        assert_eq!(prompt_state(&history, "abc"), PromptState::Pending);
    }

    #[test]
    fn missing_exec_info_is_completed() {
        let history = json!({"abc": {"status": {"status_str": "success", "completed": true}}});
        assert_eq!(prompt_state(&history, "abc"), PromptState::Completed);
    }

    #[test]
    fn missing_status_is_completed() {
        let history = json!({"abc": {"outputs": {}}});
        assert_eq!(prompt_state(&history, "abc"), PromptState::Completed);
    }

    #[test]
    fn error_status_carries_exception_message() {
        let history = json!({"abc": {"status": {
            "status_str": "error",
            "completed": false,
            "messages": [
                ["execution_start", {"prompt_id": "abc"}],
                ["execution_error", {"prompt_id": "abc", "exception_message": "CUDA OOM"}]
            ]
        }}});
        assert_eq!(
            prompt_state(&history, "abc"),
            PromptState::Failed("CUDA OOM".to_string())
        );
    }

    #[test]
    fn error_status_without_message() {
        let history = json!({"abc": {"status": {"status_str": "error"}}});
        assert_eq!(
            prompt_state(&history, "abc"),
            PromptState::Failed("execution failed".to_string())
        );
    }

    #[test]
    fn malformed_entry_is_pending() {
        let history = json!({"abc": {"status": "weird"}});
        assert_eq!(prompt_state(&history, "abc"), PromptState::Pending);
    }
}
