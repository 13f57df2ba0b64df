// src/exec/task_runner.rs

//! Runs a single external segmentation process to completion.

use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::exec::command::CommandSpec;

const PIPE_DRAIN_AFTER_KILL: Duration = Duration::from_secs(5);

/// What happened to one external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// `None` when the process was killed by a signal or timed out.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub elapsed: Duration,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Run `spec` and wait for it, capturing stdout and stderr in full.
///
/// With a `timeout`, the tool and every process it started are killed once it
/// elapses, and the outcome is reported with `timed_out = true`. The call only
/// returns after the tool has been reaped. Errors are only returned when the
/// process could not be started at all.
pub async fn run_command(spec: &CommandSpec, timeout: Option<Duration>) -> Result<ProcessOutcome> {
    info!(cmd = %spec, "starting segmentation process");

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // The tools are shell scripts that fork workers; a group of their own
    // lets a timeout take all of them down.
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process '{}'", spec.program))?;

    let started = Instant::now();
    let stdout_reader = tokio::spawn(read_pipe(child.stdout.take()));
    let stderr_reader = tokio::spawn(read_pipe(child.stderr.take()));

    let status = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(res) => Some(res),
            Err(_) => {
                warn!(
                    program = %spec.program,
                    timeout_secs = limit.as_secs(),
                    "segmentation process timed out; killing it"
                );
                terminate(&mut child, &spec.program).await;
                None
            }
        },
        None => Some(child.wait().await),
    };

    let timed_out = status.is_none();
    let status = status
        .transpose()
        .with_context(|| format!("waiting for process '{}'", spec.program))?;

    let stdout = collect_pipe(stdout_reader, timed_out).await;
    let mut stderr = collect_pipe(stderr_reader, timed_out).await;

    for line in stderr.lines() {
        debug!(program = %spec.program, "stderr: {}", line);
    }

    if let Some(limit) = timeout.filter(|_| timed_out) {
        if !stderr.is_empty() && !stderr.ends_with('\n') {
            stderr.push('\n');
        }
        stderr.push_str(&format!("{} timed out after {:?}\n", spec.program, limit));
    }

    let outcome = ProcessOutcome {
        exit_code: status.and_then(|s| s.code()),
        stdout,
        stderr,
        timed_out,
        elapsed: started.elapsed(),
    };

    info!(
        program = %spec.program,
        exit_code = ?outcome.exit_code,
        success = outcome.success(),
        timed_out = outcome.timed_out,
        elapsed_secs = outcome.elapsed.as_secs(),
        "segmentation process exited"
    );

    Ok(outcome)
}

/// Kill the tool's process group, then the tool itself, and reap it.
async fn terminate(child: &mut Child, program: &str) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            let group = format!("-{pid}");
            match Command::new("kill")
                .args(["-KILL", "--", group.as_str()])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await
            {
                Ok(status) if !status.success() => {
                    debug!(program = %program, pgid = pid, "kill on process group reported {}", status)
                }
                Ok(_) => {}
                Err(e) => warn!(program = %program, error = %e, "could not signal process group"),
            }
        }
    }

    if let Err(e) = child.kill().await {
        debug!(program = %program, error = %e, "kill after group kill failed");
    }
    if let Err(e) = child.wait().await {
        warn!(program = %program, error = %e, "failed to reap timed-out process");
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        // A read error just truncates the capture.
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}

/// Join a pipe reader. After a kill, a process that escaped the group may
/// still hold the pipe open, so the wait is bounded.
async fn collect_pipe(reader: JoinHandle<Vec<u8>>, after_kill: bool) -> String {
    let bytes = if after_kill {
        match tokio::time::timeout(PIPE_DRAIN_AFTER_KILL, reader).await {
            Ok(joined) => joined.unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    } else {
        reader.await.unwrap_or_default()
    };
    String::from_utf8_lossy(&bytes).into_owned()
}
