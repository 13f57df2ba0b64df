// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] turns a segmentation kind into a concrete [`CommandSpec`].
//! - [`task_runner`] runs one command with `tokio::process::Command`,
//!   capturing its output, with an optional timeout.
//! - [`backend`] provides the `SegmentationRunner` trait and the production
//!   `ProcessRunner`, which tests replace with a fake.

pub mod backend;
pub mod command;
pub mod task_runner;

pub use backend::{ProcessRunner, SegmentationRunner};
pub use command::{build_command, CommandSpec, THREADS_ENV};
pub use task_runner::{run_command, ProcessOutcome};
