//! Resumable image-to-mesh batch pipeline.
//!
//! [`coordinator::BatchCoordinator`] decides which items still need work
//! and drives each one, strictly in order, through
//! [`item::ItemPipeline`]: stage the image, submit the templated job,
//! poll until done, harvest the artifacts. Every success is recorded in
//! the checkpoint store before the next item starts.

pub mod backend;
pub mod coordinator;
pub mod error;
pub mod harvest;
pub mod item;
pub mod poll;
pub mod staging;
