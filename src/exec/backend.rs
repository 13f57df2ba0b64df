// src/exec/backend.rs

//! Pluggable runner abstraction.
//!
//! The batch driver talks to a `SegmentationRunner` instead of spawning
//! processes itself. Production uses [`ProcessRunner`]; tests provide a fake
//! that records invocations and returns scripted outcomes.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::errors::Result;

use super::command::CommandSpec;
use super::task_runner::{run_command, ProcessOutcome};

/// Trait abstracting how a built command is executed.
pub trait SegmentationRunner: Send {
    /// Run one command to completion.
    ///
    /// `Err` means the command could not be run at all (e.g. the program is
    /// not on `PATH`); a process that ran and failed is an `Ok` outcome.
    fn run(
        &mut self,
        spec: CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessOutcome>> + Send + '_>>;
}

/// Runner that spawns real OS processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl SegmentationRunner for ProcessRunner {
    fn run(
        &mut self,
        spec: CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessOutcome>> + Send + '_>> {
        let timeout = self.timeout;
        Box::pin(async move { Ok(run_command(&spec, timeout).await?) })
    }
}
