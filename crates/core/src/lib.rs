//! Domain types for the resumable image-to-mesh batch driver.
//!
//! Nothing in this crate talks to the network: it owns work-item
//! discovery, artifact naming rules, the persisted checkpoint store and
//! the batch tunables shared by the pipeline and the CLI.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod item;
pub mod naming;
