//! Process sandbox for generated code.
//!
//! Each artifact runs as a child process of the configured interpreter in
//! its own working directory under the workspace root, so concurrent runs
//! can never collide on filenames. The child gets a fresh process group;
//! on wall-clock timeout the whole group is killed so stray grandchildren
//! (data loaders, worker pools) die with it. Faults on the sandbox's own
//! side are folded into a `Failed` result rather than escaping into the
//! controller.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::models::{CodeArtifact, ExecutionResult, SandboxConfig};
use crate::domain::ports::ArtifactExecutor;

use super::score::extract_score;

/// Filename the artifact source is written to inside its working dir.
const SOLUTION_FILENAME: &str = "solution.py";

/// Name generated code reads its dataset under, relative to its cwd.
const INPUT_LINK: &str = "input";

/// Sandboxed execution engine backed by an interpreter subprocess.
pub struct ProcessSandbox {
    interpreter: String,
    workspace_root: PathBuf,
    dataset_dir: Option<PathBuf>,
    time_limit: Duration,
}

impl ProcessSandbox {
    /// Create a sandbox rooted at `workspace_root` (created if missing).
    pub fn new(config: &SandboxConfig, workspace_root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let workspace_root = workspace_root.into();
        std::fs::create_dir_all(&workspace_root)?;
        Ok(Self {
            interpreter: config.interpreter.clone(),
            workspace_root,
            dataset_dir: None,
            time_limit: Duration::from_secs(config.exec_timeout_secs),
        })
    }

    /// Expose a read-only dataset directory as `input/` in every working
    /// directory.
    pub fn with_dataset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if dir.as_os_str().is_empty() {
            return self;
        }
        self.dataset_dir = Some(dir);
        self
    }

    /// Link the shared dataset into `dir`. The dataset itself is never
    /// copied; writes stay confined to the artifact directory.
    fn link_dataset(&self, dir: &Path) -> std::io::Result<()> {
        let Some(ref dataset) = self.dataset_dir else {
            return Ok(());
        };
        if !dataset.exists() {
            warn!(dataset = %dataset.display(), "dataset directory missing; running without input/");
            return Ok(());
        }
        let link = dir.join(INPUT_LINK);
        #[cfg(unix)]
        match std::os::unix::fs::symlink(dataset, &link) {
            Err(err) if err.kind() != std::io::ErrorKind::AlreadyExists => return Err(err),
            _ => {}
        }
        #[cfg(not(unix))]
        let _ = link;
        Ok(())
    }

    /// Exclusive working directory for one artifact.
    fn artifact_dir(&self, artifact: &CodeArtifact) -> PathBuf {
        self.workspace_root.join(artifact.id.to_string())
    }

    async fn run(&self, artifact: &CodeArtifact, dir: &Path) -> std::io::Result<ExecutionResult> {
        tokio::fs::create_dir_all(dir).await?;
        self.link_dataset(dir)?;
        let source_path = dir.join(SOLUTION_FILENAME);
        tokio::fs::write(&source_path, &artifact.source).await?;

        let mut command = Command::new(&self.interpreter);
        command
            .arg(SOLUTION_FILENAME)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let started = Instant::now();
        let mut child = command.spawn()?;
        let pid = child.id();

        let stdout_task = drain(child.stdout.take());
        let stderr_task = drain(child.stderr.take());

        match timeout(self.time_limit, child.wait()).await {
            Ok(Ok(status)) => {
                let stdout = stdout_task.await.unwrap_or_default();
                let stderr = stderr_task.await.unwrap_or_default();
                let duration = started.elapsed();
                debug!(
                    artifact_id = %artifact.id,
                    code = status.code(),
                    secs = duration.as_secs_f64(),
                    "sandboxed process exited"
                );
                if status.success() {
                    match extract_score(&stdout) {
                        Some(score) => Ok(ExecutionResult::succeeded(
                            artifact.id,
                            score,
                            stdout,
                            stderr,
                            duration,
                        )),
                        None => Ok(ExecutionResult::unparseable(
                            artifact.id,
                            stdout,
                            stderr,
                            duration,
                        )),
                    }
                } else {
                    let trace = format!(
                        "process exited with {}",
                        status.code().map_or_else(
                            || "signal".to_string(),
                            |c| format!("status {c}")
                        )
                    );
                    Ok(ExecutionResult::failed(
                        artifact.id,
                        trace,
                        stdout,
                        stderr,
                        duration,
                    ))
                }
            }
            Ok(Err(err)) => Err(err),
            Err(_elapsed) => {
                warn!(
                    artifact_id = %artifact.id,
                    limit_secs = self.time_limit.as_secs(),
                    "execution timed out; killing process group"
                );
                kill_group(pid);
                let _ = child.kill().await;
                let _ = child.wait().await;
                let stdout = stdout_task.await.unwrap_or_default();
                let stderr = stderr_task.await.unwrap_or_default();
                Ok(ExecutionResult::timed_out(
                    artifact.id,
                    self.time_limit,
                    stdout,
                    stderr,
                ))
            }
        }
    }
}

#[async_trait]
impl ArtifactExecutor for ProcessSandbox {
    async fn execute(&self, artifact: &CodeArtifact) -> ExecutionResult {
        let dir = self.artifact_dir(artifact);
        match self.run(artifact, &dir).await {
            Ok(result) => result,
            Err(err) => {
                // Sandbox-side fault (workspace I/O, spawn failure): the
                // attempt fails, the search continues.
                warn!(artifact_id = %artifact.id, error = %err, "sandbox infrastructure fault");
                ExecutionResult::failed(
                    artifact.id,
                    format!("sandbox error: {err}"),
                    String::new(),
                    String::new(),
                    Duration::ZERO,
                )
            }
        }
    }
}

/// Read a child pipe to completion on a background task.
fn drain<R>(reader: Option<R>) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = String::new();
        if let Some(mut reader) = reader {
            let _ = reader.read_to_string(&mut buf).await;
        }
        buf
    })
}

/// Kill the child's process group; best-effort.
fn kill_group(pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) {
        if let Err(err) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
            debug!(pid, error = %err, "killpg failed (process likely already gone)");
        }
    }
    #[cfg(not(unix))]
    let _ = pid;
}
