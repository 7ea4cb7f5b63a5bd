// crates/bootstrap-check-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Scripted runners and fixture builders for core tests.
// Purpose: Drive the orchestrator and evaluator without spawning processes.
// Dependencies: bootstrap-check-core, async-trait, tempfile
// ============================================================================

//! ## Overview
//! [`ScriptedRunner`] answers each invocation with a closure and records every
//! call. Scripts that model a successful compile or link write the output
//! file named after `-o`, because the orchestrator checks that artifacts
//! exist after each step.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::unwrap_in_result,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bootstrap_check_core::Invocation;
use bootstrap_check_core::InvocationOutcome;
use bootstrap_check_core::InvocationResult;
use bootstrap_check_core::InvocationRunner;
use bootstrap_check_core::MemoryEventSink;
use bootstrap_check_core::PipelineOrchestrator;
use bootstrap_check_core::PipelineSettings;
use bootstrap_check_core::RunLimits;
use bootstrap_check_core::RunnerError;

// ============================================================================
// SECTION: Scripted Runner
// ============================================================================

/// Closure answering one invocation.
pub type Script = dyn Fn(&Invocation) -> Result<InvocationResult, RunnerError> + Send + Sync;

/// Runner that answers invocations from a script and records them.
pub struct ScriptedRunner {
    /// Response script.
    script: Box<Script>,
    /// Invocations received, in order.
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new<F>(script: F) -> Arc<Self>
    where
        F: Fn(&Invocation) -> Result<InvocationResult, RunnerError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(Invocation::command_line).collect()
    }
}

#[async_trait]
impl InvocationRunner for ScriptedRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        _limits: &RunLimits,
    ) -> Result<InvocationResult, RunnerError> {
        self.calls.lock().unwrap().push(invocation.clone());
        (self.script)(invocation)
    }
}

// ============================================================================
// SECTION: Result Builders
// ============================================================================

pub fn exited(
    invocation: &Invocation,
    code: i32,
    stdout: &[u8],
    stderr: &[u8],
) -> InvocationResult {
    InvocationResult {
        command_line: invocation.command_line(),
        outcome: InvocationOutcome::Exited {
            code: Some(code),
        },
        stdout: stdout.to_vec(),
        stderr: stderr.to_vec(),
        duration_ms: 0,
    }
}

pub fn ok(invocation: &Invocation) -> Result<InvocationResult, RunnerError> {
    Ok(exited(invocation, 0, b"", b""))
}

/// Returns the argument following `-o`.
pub fn output_path(invocation: &Invocation) -> PathBuf {
    let position = invocation.args.iter().position(|arg| arg == &OsString::from("-o")).unwrap();
    PathBuf::from(&invocation.args[position + 1])
}

/// Writes `contents` to the invocation's `-o` path and reports success.
pub fn write_output(
    invocation: &Invocation,
    contents: &[u8],
) -> Result<InvocationResult, RunnerError> {
    std::fs::write(output_path(invocation), contents).unwrap();
    ok(invocation)
}

/// Copies the first argument to the `-o` path, like a linker that wraps the object.
pub fn copy_first_arg(invocation: &Invocation) -> Result<InvocationResult, RunnerError> {
    let input = std::fs::read(Path::new(&invocation.args[0])).unwrap();
    write_output(invocation, &input)
}

// ============================================================================
// SECTION: Orchestrator Builders
// ============================================================================

pub fn settings(artifact_dir: &Path) -> PipelineSettings {
    let mut settings = PipelineSettings::new(artifact_dir);
    settings.timeout = Duration::from_secs(5);
    settings
}

pub fn orchestrator(
    runner: Arc<ScriptedRunner>,
    settings: PipelineSettings,
) -> (PipelineOrchestrator, Arc<MemoryEventSink>) {
    let sink = Arc::new(MemoryEventSink::new());
    let orchestrator = PipelineOrchestrator::new(runner, sink.clone(), settings);
    (orchestrator, sink)
}
