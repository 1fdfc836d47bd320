//! ComfyUI REST client library.
//!
//! Provides the HTTP API wrapper used to queue workflows and read their
//! history, typed history parsing, workflow-template field substitution
//! and resolution of a local ComfyUI installation's input/output folders.

pub mod api;
pub mod history;
pub mod install;
pub mod workflow;
