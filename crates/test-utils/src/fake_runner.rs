use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fsseg::errors::{FssegError, Result};
use fsseg::exec::{CommandSpec, ProcessOutcome, SegmentationRunner};
use fsseg::fs::FileSystem;
use fsseg::fs::mock::MockFileSystem;

/// A fake runner that:
/// - records every command it was asked to run
/// - fails (exit code 1) for subjects listed in `failing`
/// - can't start at all for subjects listed in `unspawnable`
/// - optionally writes an output file on success, like the real tool would.
pub struct FakeRunner {
    executed: Arc<Mutex<Vec<CommandSpec>>>,
    failing: HashSet<String>,
    unspawnable: HashSet<String>,
    writes_output: Option<(MockFileSystem, PathBuf)>,
}

impl FakeRunner {
    pub fn new(executed: Arc<Mutex<Vec<CommandSpec>>>) -> Self {
        Self {
            executed,
            failing: HashSet::new(),
            unspawnable: HashSet::new(),
            writes_output: None,
        }
    }

    pub fn failing_for(mut self, subject: &str) -> Self {
        self.failing.insert(subject.to_string());
        self
    }

    pub fn unspawnable_for(mut self, subject: &str) -> Self {
        self.unspawnable.insert(subject.to_string());
        self
    }

    /// On success, create `<subjects_dir>/<subject>/mri/<output_name>` in `fs`.
    pub fn writing_output(mut self, fs: MockFileSystem, subjects_dir: &str, output_name: &str) -> Self {
        let template = PathBuf::from(subjects_dir)
            .join("{}")
            .join("mri")
            .join(output_name);
        self.writes_output = Some((fs, template));
        self
    }

    fn subject_of<'a>(spec: &CommandSpec, candidates: &'a HashSet<String>) -> Option<&'a String> {
        candidates.iter().find(|s| spec.args.iter().any(|a| a == *s))
    }
}

impl SegmentationRunner for FakeRunner {
    fn run(
        &mut self,
        spec: CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessOutcome>> + Send + '_>> {
        Box::pin(async move {
            self.executed.lock().unwrap().push(spec.clone());

            if let Some(subject) = Self::subject_of(&spec, &self.unspawnable) {
                return Err(FssegError::Other(anyhow::anyhow!(
                    "spawning process '{}' for {}: not found",
                    spec.program,
                    subject
                )));
            }

            if let Some(subject) = Self::subject_of(&spec, &self.failing) {
                return Ok(ProcessOutcome {
                    exit_code: Some(1),
                    stdout: String::new(),
                    stderr: format!("simulated failure for {subject}\n"),
                    timed_out: false,
                    elapsed: Duration::from_millis(5),
                });
            }

            if let Some((ref fs, ref template)) = self.writes_output {
                // Subject ID is the first argument for the shell-script tools
                // and follows `--s` for mri_sclimbic_seg.
                let subject = match spec.args.first().map(String::as_str) {
                    Some("--s") => spec.args.get(1),
                    _ => spec.args.first(),
                };
                if let Some(subject) = subject {
                    let path = PathBuf::from(template.to_string_lossy().replace("{}", subject));
                    fs.write(&path, b"mgz").map_err(FssegError::Other)?;
                }
            }

            Ok(ProcessOutcome {
                exit_code: Some(0),
                stdout: "done\n".to_string(),
                stderr: String::new(),
                timed_out: false,
                elapsed: Duration::from_millis(5),
            })
        })
    }
}
