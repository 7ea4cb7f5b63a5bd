// crates/bootstrap-check-core/src/runtime/pipeline.rs
// ============================================================================
// Module: Pipeline Orchestrator
// Description: Compile -> link -> execute for one (stage, fixture) pair.
// Purpose: Turn three runner calls into one fail-fast, attributable result.
// Dependencies: crate::{core, interfaces}, tokio
// ============================================================================

//! ## Overview
//! The orchestrator runs exactly three steps in order and stops at the first
//! step that does not exit zero. The failing step, its command line, and its
//! stderr are recorded on the [`StageResult`]. There are no retries: every
//! step is deterministic given its inputs.
//!
//! Invariants:
//! - Artifact paths come from [`ArtifactSet::derive`], never a fixed name.
//! - Stale artifacts for the pair are removed before compiling, so an old
//!   object can never stand in for a compile that wrote nothing.
//! - The orchestrator knows nothing about its caller; the same logic runs
//!   for every generation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::core::ArtifactSet;
use crate::core::CompilerStage;
use crate::core::FailureKind;
use crate::core::Fixture;
use crate::core::Generation;
use crate::core::Invocation;
use crate::core::InvocationOutcome;
use crate::core::InvocationResult;
use crate::core::PipelineStep;
use crate::core::StageResult;
use crate::core::StepFailure;
use crate::core::StepRecord;
use crate::interfaces::HarnessEvent;
use crate::interfaces::HarnessEventSink;
use crate::interfaces::InvocationRunner;
use crate::interfaces::RunLimits;
use crate::interfaces::RunnerError;
use crate::runtime::cancel::CancelSignal;
use crate::runtime::template::ArgTemplate;
use crate::runtime::template::TemplatePaths;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Default host toolchain used to link objects.
pub const DEFAULT_TOOLCHAIN: &str = "clang";
/// Default per-invocation timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Inputs shared by every pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Host toolchain program used for the link step.
    pub toolchain: PathBuf,
    /// Compiler-under-test argument template.
    pub compile_args: ArgTemplate,
    /// Host toolchain argument template.
    pub link_args: ArgTemplate,
    /// Directory holding objects and executables.
    pub artifact_dir: PathBuf,
    /// Per-invocation timeout.
    pub timeout: Duration,
    /// Keep artifacts after the run for debugging.
    pub keep_artifacts: bool,
}

impl PipelineSettings {
    /// Creates settings with default templates, toolchain, and timeout.
    #[must_use]
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            toolchain: PathBuf::from(DEFAULT_TOOLCHAIN),
            compile_args: ArgTemplate::default_compile(),
            link_args: ArgTemplate::default_link(),
            artifact_dir: artifact_dir.into(),
            timeout: DEFAULT_TIMEOUT,
            keep_artifacts: true,
        }
    }
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Runs the compile, link, and execute steps for one pair.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    /// Process runner for every step.
    runner: Arc<dyn InvocationRunner>,
    /// Structured event sink.
    sink: Arc<dyn HarnessEventSink>,
    /// Shared settings.
    settings: Arc<PipelineSettings>,
}

impl PipelineOrchestrator {
    /// Creates an orchestrator.
    ///
    /// A relative artifact directory is made absolute so the execute step
    /// never resolves the executable through `PATH`.
    #[must_use]
    pub fn new(
        runner: Arc<dyn InvocationRunner>,
        sink: Arc<dyn HarnessEventSink>,
        mut settings: PipelineSettings,
    ) -> Self {
        if let Ok(absolute) = std::path::absolute(&settings.artifact_dir) {
            settings.artifact_dir = absolute;
        }
        Self {
            runner,
            sink,
            settings: Arc::new(settings),
        }
    }

    /// Returns the shared settings.
    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Returns the event sink.
    #[must_use]
    pub fn sink(&self) -> &Arc<dyn HarnessEventSink> {
        &self.sink
    }

    /// Returns the artifact paths this orchestrator uses for a pair.
    #[must_use]
    pub fn artifacts_for(&self, stage: &CompilerStage, fixture: &Fixture) -> ArtifactSet {
        ArtifactSet::derive(&self.settings.artifact_dir, stage.generation, &fixture.id)
    }

    /// Runs the pipeline for one (stage, fixture) pair.
    pub async fn run(
        &self,
        stage: &CompilerStage,
        fixture: &Fixture,
        cancel: &CancelSignal,
    ) -> StageResult {
        let artifacts = self.artifacts_for(stage, fixture);
        let mut run = PipelineRun::new(stage, fixture);
        let limits = RunLimits {
            timeout: self.settings.timeout,
            cancel: cancel.clone(),
        };

        let failure = self.drive(stage, fixture, &artifacts, &limits, &mut run).await;
        if !self.settings.keep_artifacts {
            remove_artifacts(&artifacts).await;
        }
        let result = run.finish(failure);
        self.record_finished(&result);
        result
    }

    /// Executes the steps in order, returning the first failure.
    async fn drive(
        &self,
        stage: &CompilerStage,
        fixture: &Fixture,
        artifacts: &ArtifactSet,
        limits: &RunLimits,
        run: &mut PipelineRun,
    ) -> Option<StepFailure> {
        let paths = TemplatePaths {
            source: &fixture.source,
            object: &artifacts.object,
            executable: &artifacts.executable,
        };
        let compile = Invocation::new(&stage.binary).args(self.settings.compile_args.render(paths));
        if let Err(err) = prepare_artifacts(&self.settings.artifact_dir, artifacts).await {
            return Some(StepFailure {
                step: PipelineStep::Compile,
                kind: FailureKind::ArtifactIo {
                    message: err.to_string(),
                },
                command_line: compile.command_line(),
                stderr: String::new(),
            });
        }
        let link =
            Invocation::new(&self.settings.toolchain).args(self.settings.link_args.render(paths));
        let execute = Invocation::new(&artifacts.executable);

        let plan = [
            (PipelineStep::Compile, compile, Some(artifacts.object.as_path())),
            (PipelineStep::Link, link, Some(artifacts.executable.as_path())),
            (PipelineStep::Execute, execute, None),
        ];
        for (step, invocation, produces) in plan {
            if limits.cancel.is_cancelled() {
                return Some(StepFailure {
                    step,
                    kind: FailureKind::Cancelled,
                    command_line: invocation.command_line(),
                    stderr: String::new(),
                });
            }
            if let Some(failure) = self.run_step(step, &invocation, produces, limits, run).await {
                return Some(failure);
            }
        }
        None
    }

    /// Runs a single step and checks its produced artifact.
    async fn run_step(
        &self,
        step: PipelineStep,
        invocation: &Invocation,
        produces: Option<&Path>,
        limits: &RunLimits,
        run: &mut PipelineRun,
    ) -> Option<StepFailure> {
        let result = match self.runner.run(invocation, limits).await {
            Ok(result) => result,
            Err(err) => {
                let failure = runner_failure(step, err);
                self.record_step(run, step, failure.kind.as_str(), None);
                return Some(failure);
            }
        };
        let failure = outcome_failure(step, &result);
        let duration_ms = result.duration_ms;
        run.steps.push(StepRecord {
            step,
            result,
        });
        if let Some(failure) = failure {
            self.record_step(run, step, failure.kind.as_str(), Some(duration_ms));
            return Some(failure);
        }
        if let Some(path) = produces
            && !is_file(path).await
        {
            let failure = StepFailure {
                step,
                kind: FailureKind::MissingArtifact {
                    path: path.to_path_buf(),
                },
                command_line: invocation.command_line(),
                stderr: run.last_stderr(),
            };
            self.record_step(run, step, failure.kind.as_str(), Some(duration_ms));
            return Some(failure);
        }
        self.record_step(run, step, "ok", Some(duration_ms));
        None
    }

    /// Emits a `step_finished` event.
    fn record_step(
        &self,
        run: &PipelineRun,
        step: PipelineStep,
        outcome: &str,
        duration_ms: Option<u64>,
    ) {
        let mut event = HarnessEvent::new("step_finished")
            .pair(run.generation, &run.fixture.id)
            .step(step)
            .outcome(outcome);
        event.duration_ms = duration_ms;
        self.sink.record(&event);
    }

    /// Emits a `pipeline_finished` event.
    fn record_finished(&self, result: &StageResult) {
        let outcome = result.failure.as_ref().map_or("ok", |failure| failure.kind.as_str());
        let total: u64 = result.steps.iter().map(|record| record.result.duration_ms).sum();
        let mut event = HarnessEvent::new("pipeline_finished")
            .pair(result.generation, &result.fixture)
            .outcome(outcome)
            .duration_ms(total);
        if let Some(failure) = &result.failure {
            event = event.step(failure.step).detail(failure.command_line.clone());
        }
        self.sink.record(&event);
    }
}

// ============================================================================
// SECTION: Run Accumulator
// ============================================================================

/// Step records accumulated while a pipeline runs.
struct PipelineRun {
    /// Generation under test.
    generation: Generation,
    /// Fixture under test.
    fixture: Fixture,
    /// Steps that have run so far.
    steps: Vec<StepRecord>,
}

impl PipelineRun {
    /// Starts an empty run.
    fn new(stage: &CompilerStage, fixture: &Fixture) -> Self {
        Self {
            generation: stage.generation,
            fixture: fixture.clone(),
            steps: Vec::new(),
        }
    }

    /// Returns the stderr of the last recorded step.
    fn last_stderr(&self) -> String {
        self.steps.last().map(|record| record.result.stderr_text()).unwrap_or_default()
    }

    /// Builds the final result.
    fn finish(self, failure: Option<StepFailure>) -> StageResult {
        let stdout = if failure.is_none() {
            self.steps
                .iter()
                .find(|record| record.step == PipelineStep::Execute)
                .map(|record| record.result.stdout_text())
        } else {
            None
        };
        StageResult {
            generation: self.generation,
            fixture: self.fixture.id,
            steps: self.steps,
            failure,
            stdout,
        }
    }
}

// ============================================================================
// SECTION: Failure Mapping
// ============================================================================

/// Maps a runner error to a step failure.
fn runner_failure(step: PipelineStep, error: RunnerError) -> StepFailure {
    match error {
        RunnerError::Spawn {
            command_line,
            kind,
            message,
        } => StepFailure {
            step,
            kind: FailureKind::SpawnFailed {
                reason: kind.as_str().to_string(),
                message,
            },
            command_line,
            stderr: String::new(),
        },
        RunnerError::Io {
            command_line,
            message,
        } => StepFailure {
            step,
            kind: FailureKind::RunnerIo {
                message,
            },
            command_line,
            stderr: String::new(),
        },
    }
}

/// Maps a non-successful outcome to a step failure.
fn outcome_failure(step: PipelineStep, result: &InvocationResult) -> Option<StepFailure> {
    let kind = match result.outcome {
        InvocationOutcome::Exited {
            code: Some(0),
        } => return None,
        InvocationOutcome::Exited {
            code,
        } => FailureKind::ExitedNonZero {
            code,
        },
        InvocationOutcome::TimedOut {
            limit_ms,
        } => FailureKind::TimedOut {
            limit_ms,
        },
        InvocationOutcome::Cancelled => FailureKind::Cancelled,
    };
    Some(StepFailure {
        step,
        kind,
        command_line: result.command_line.clone(),
        stderr: result.stderr_text(),
    })
}

// ============================================================================
// SECTION: Artifact Helpers
// ============================================================================

/// Creates the artifact directory and removes stale artifacts for the pair.
async fn prepare_artifacts(root: &Path, artifacts: &ArtifactSet) -> io::Result<()> {
    tokio::fs::create_dir_all(root).await?;
    for path in artifacts.paths() {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// Removes the pair's artifacts, ignoring files that were never written.
async fn remove_artifacts(artifacts: &ArtifactSet) {
    for path in artifacts.paths() {
        let _ = tokio::fs::remove_file(path).await;
    }
}

/// Returns true when `path` is an existing regular file.
async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|meta| meta.is_file())
}
