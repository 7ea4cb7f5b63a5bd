// crates/bootstrap-check-core/src/runtime/process.rs
// ============================================================================
// Module: Process Runner
// Description: Tokio-backed invocation runner with timeout and cancellation.
// Purpose: Start one external process, capture its streams, and bound its lifetime.
// Dependencies: tokio, async-trait
// ============================================================================

//! ## Overview
//! [`ProcessRunner`] spawns the program with stdin closed, both output
//! streams piped, and (on Unix) in a process group of its own. Output is
//! drained on separate tasks while the child runs so a chatty child can never
//! block on a full pipe. The wait races the timeout and the cancellation
//! signal; either one kills the whole group and reaps the child before the
//! result is returned. When the child exits but a descendant it left behind
//! still holds a pipe open, the group is killed after a short grace period so
//! the streams close. Children are also marked `kill_on_drop`, so dropping
//! an in-flight run never leaves the direct child behind.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::process::ExitStatus;
use std::process::Stdio;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::process::Child;
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::core::Invocation;
use crate::core::InvocationOutcome;
use crate::core::InvocationResult;
use crate::interfaces::InvocationRunner;
use crate::interfaces::RunLimits;
use crate::interfaces::RunnerError;
use crate::interfaces::SpawnFailureKind;

// ============================================================================
// SECTION: Process Runner
// ============================================================================

/// Time allowed for output streams to close after the child exits.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Stateless runner that executes invocations as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a process runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// How the race between the child and its bounds ended.
enum Race {
    /// The child exited.
    Finished(io::Result<ExitStatus>),
    /// The timeout elapsed first.
    TimedOut,
    /// Cancellation was raised first.
    Cancelled,
}

/// Stream readers running alongside the child.
struct Drains {
    /// Stdout reader.
    stdout: JoinHandle<io::Result<Vec<u8>>>,
    /// Stderr reader.
    stderr: JoinHandle<io::Result<Vec<u8>>>,
}

impl Drains {
    /// Starts draining both streams of `child`.
    fn start(child: &mut Child) -> Self {
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        Self {
            stdout: tokio::spawn(drain(stdout)),
            stderr: tokio::spawn(drain(stderr)),
        }
    }

    /// Collects both streams once the child has exited.
    ///
    /// When the streams are still open after [`DRAIN_GRACE`], descendants of
    /// the child hold them; the process group is killed and the streams get
    /// one more grace period.
    async fn finish(self, group: Option<u32>) -> io::Result<(Vec<u8>, Vec<u8>)> {
        let aborts = [self.stdout.abort_handle(), self.stderr.abort_handle()];
        let mut both = std::pin::pin!(async move { tokio::join!(self.stdout, self.stderr) });
        let (stdout, stderr) = match tokio::time::timeout(DRAIN_GRACE, &mut both).await {
            Ok(done) => done,
            Err(_) => {
                kill_group(group).await;
                if let Ok(done) = tokio::time::timeout(DRAIN_GRACE, &mut both).await {
                    done
                } else {
                    for abort in &aborts {
                        abort.abort();
                    }
                    return Err(io::Error::other(
                        "output streams stayed open after the process exited",
                    ));
                }
            }
        };
        Ok((joined(stdout)?, joined(stderr)?))
    }

    /// Stops both readers.
    fn abort(&self) {
        self.stdout.abort();
        self.stderr.abort();
    }
}

#[async_trait]
impl InvocationRunner for ProcessRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        limits: &RunLimits,
    ) -> Result<InvocationResult, RunnerError> {
        let command_line = invocation.command_line();
        let started = Instant::now();
        let mut child = spawn(invocation).map_err(|err| RunnerError::Spawn {
            command_line: command_line.clone(),
            kind: SpawnFailureKind::from_io(&err),
            message: err.to_string(),
        })?;
        let group = child.id();
        let drains = Drains::start(&mut child);

        let race = tokio::select! {
            status = child.wait() => Race::Finished(status),
            () = tokio::time::sleep(limits.timeout) => Race::TimedOut,
            () = limits.cancel.cancelled() => Race::Cancelled,
        };

        let outcome = match race {
            Race::Finished(Ok(status)) => {
                let (stdout, stderr) =
                    drains.finish(group).await.map_err(|err| RunnerError::Io {
                        command_line: command_line.clone(),
                        message: err.to_string(),
                    })?;
                return Ok(InvocationResult {
                    command_line,
                    outcome: InvocationOutcome::Exited {
                        code: status.code(),
                    },
                    stdout,
                    stderr,
                    duration_ms: elapsed_ms(started),
                });
            }
            Race::Finished(Err(err)) => {
                terminate(&mut child, group).await;
                drains.abort();
                return Err(RunnerError::Io {
                    command_line,
                    message: err.to_string(),
                });
            }
            Race::TimedOut => InvocationOutcome::TimedOut {
                limit_ms: u64::try_from(limits.timeout.as_millis()).unwrap_or(u64::MAX),
            },
            Race::Cancelled => InvocationOutcome::Cancelled,
        };
        terminate(&mut child, group).await;
        drains.abort();
        Ok(InvocationResult {
            command_line,
            outcome,
            stdout: Vec::new(),
            stderr: Vec::new(),
            duration_ms: elapsed_ms(started),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Spawns the child with stdin closed and both output streams piped.
///
/// On Unix the child leads a new process group, so everything it forks can
/// be killed together.
fn spawn(invocation: &Invocation) -> io::Result<Child> {
    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);
    command.spawn()
}

/// Reads a stream to its end; a missing stream yields no bytes.
async fn drain<R>(stream: Option<R>) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buffer).await?;
    }
    Ok(buffer)
}

/// Flattens a reader task result.
fn joined(
    result: Result<io::Result<Vec<u8>>, tokio::task::JoinError>,
) -> io::Result<Vec<u8>> {
    result.map_err(io::Error::other)?
}

/// Kills the child's process group, then the child itself, and reaps it.
/// Errors mean the processes already exited.
async fn terminate(child: &mut Child, group: Option<u32>) {
    kill_group(group).await;
    let _ = child.kill().await;
}

/// Sends `SIGKILL` to the process group led by `group`.
///
/// The workspace forbids `unsafe`, so the signal goes through the `kill`
/// utility instead of `killpg(2)`.
#[cfg(unix)]
async fn kill_group(group: Option<u32>) {
    let Some(group) = group else {
        return;
    };
    let _ = Command::new("kill")
        .arg("-KILL")
        .arg("--")
        .arg(format!("-{group}"))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
}

/// Process groups are a Unix concept; elsewhere only the child is killed.
#[cfg(not(unix))]
async fn kill_group(_group: Option<u32>) {}

/// Milliseconds elapsed since `started`, saturating.
fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
