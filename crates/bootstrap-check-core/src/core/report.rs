// crates/bootstrap-check-core/src/core/report.rs
// ============================================================================
// Module: Bootstrap Reports
// Description: Per-pair stage results, equivalence checks, and findings.
// Purpose: Provide the object the harness and its callers assert against.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`StageResult`] records the pipeline steps of one (generation, fixture)
//! pair. A [`BootstrapReport`] maps fixture -> generation -> [`Cell`] and
//! carries the equivalence checks between consecutive generations plus every
//! [`Finding`]. Findings are collected, never short-circuited, so one report
//! shows every broken generation and fixture at once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::core::identifiers::FixtureId;
use crate::core::identifiers::Generation;
use crate::core::invocation::InvocationResult;

// ============================================================================
// SECTION: Pipeline Steps
// ============================================================================

/// Ordered pipeline steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    /// Compile the fixture source to an object file with the stage binary.
    Compile,
    /// Link the object file with the host toolchain.
    Link,
    /// Run the linked executable.
    Execute,
}

impl PipelineStep {
    /// All steps in execution order.
    pub const ALL: [Self; 3] = [Self::Compile, Self::Link, Self::Execute];

    /// Returns a stable label for the step.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Link => "link",
            Self::Execute => "execute",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invocation result tagged with its step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// Step that ran.
    pub step: PipelineStep,
    /// Captured invocation result.
    pub result: InvocationResult,
}

// ============================================================================
// SECTION: Failures
// ============================================================================

/// Classification of a pipeline failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// The step's program could not be started.
    SpawnFailed {
        /// OS error classification (`not_found`, `permission_denied`, `other`).
        reason: String,
        /// OS error message.
        message: String,
    },
    /// The step ran and exited with a non-zero code (or a signal).
    ExitedNonZero {
        /// Exit code when available.
        code: Option<i32>,
    },
    /// The step exceeded its time limit and was killed.
    TimedOut {
        /// Time limit in milliseconds.
        limit_ms: u64,
    },
    /// The run was cancelled while this step was in flight.
    Cancelled,
    /// The step exited zero but did not produce its output file.
    MissingArtifact {
        /// Path that should have been written.
        path: PathBuf,
    },
    /// The runner lost contact with a started child.
    RunnerIo {
        /// I/O error message.
        message: String,
    },
    /// Preparing or inspecting artifacts failed.
    ArtifactIo {
        /// I/O error message.
        message: String,
    },
}

impl FailureKind {
    /// Returns a stable label for the failure kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SpawnFailed {
                ..
            } => "spawn_failed",
            Self::ExitedNonZero {
                ..
            } => "exited_non_zero",
            Self::TimedOut {
                ..
            } => "timed_out",
            Self::Cancelled => "cancelled",
            Self::MissingArtifact {
                ..
            } => "missing_artifact",
            Self::RunnerIo {
                ..
            } => "runner_io",
            Self::ArtifactIo {
                ..
            } => "artifact_io",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpawnFailed {
                reason,
                message,
            } => write!(f, "failed to start ({reason}): {message}"),
            Self::ExitedNonZero {
                code: Some(code),
            } => write!(f, "exited with code {code}"),
            Self::ExitedNonZero {
                code: None,
            } => f.write_str("terminated by signal"),
            Self::TimedOut {
                limit_ms,
            } => write!(f, "timed out after {limit_ms} ms"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::MissingArtifact {
                path,
            } => write!(f, "exited 0 but did not write {}", path.display()),
            Self::RunnerIo {
                message,
            } => write!(f, "runner i/o error: {message}"),
            Self::ArtifactIo {
                message,
            } => write!(f, "artifact i/o error: {message}"),
        }
    }
}

/// Failure attributed to a named pipeline step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    /// Step that failed.
    pub step: PipelineStep,
    /// Failure classification.
    pub kind: FailureKind,
    /// Command line of the failing step.
    pub command_line: String,
    /// Captured stderr of the failing step (lossy UTF-8).
    pub stderr: String,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} step {}: `{}`", self.step, self.kind, self.command_line)
    }
}

// ============================================================================
// SECTION: Stage Result
// ============================================================================

/// Outcome of the compile -> link -> execute pipeline for one pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageResult {
    /// Generation that compiled the fixture.
    pub generation: Generation,
    /// Fixture that was compiled.
    pub fixture: FixtureId,
    /// Steps that ran, in order (fewer than three when the pipeline aborted).
    pub steps: Vec<StepRecord>,
    /// First failure, when the pipeline aborted.
    pub failure: Option<StepFailure>,
    /// Decoded stdout of the executed program when every step succeeded.
    pub stdout: Option<String>,
}

impl StageResult {
    /// Returns true when all three steps succeeded.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.failure.is_none() && self.stdout.is_some()
    }

    /// Returns the record for a step if it ran.
    #[must_use]
    pub fn step(&self, step: PipelineStep) -> Option<&StepRecord> {
        self.steps.iter().find(|record| record.step == step)
    }

    /// Returns the raw stdout bytes of the execute step when every step succeeded.
    #[must_use]
    pub fn stdout_bytes(&self) -> Option<&[u8]> {
        if !self.succeeded() {
            return None;
        }
        self.step(PipelineStep::Execute).map(|record| record.result.stdout.as_slice())
    }
}

// ============================================================================
// SECTION: Report Cells
// ============================================================================

/// Status of a (fixture, generation) entry in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Cell {
    /// The generation binary does not exist yet; nothing was run.
    NotEvaluated {
        /// Path that was probed for the binary.
        expected_path: PathBuf,
    },
    /// The pipeline was not started because the run was cancelled first.
    Skipped,
    /// The pipeline ran.
    Evaluated {
        /// Pipeline result.
        result: Box<StageResult>,
        /// True when every step succeeded and stdout matched the expectation.
        matches_expected: bool,
    },
}

impl Cell {
    /// Returns the stage result when the pair was evaluated.
    #[must_use]
    pub fn result(&self) -> Option<&StageResult> {
        match self {
            Self::Evaluated {
                result,
                ..
            } => Some(result.as_ref()),
            Self::NotEvaluated {
                ..
            }
            | Self::Skipped => None,
        }
    }

    /// Returns true when the pair was not evaluated because the stage is missing.
    #[must_use]
    pub const fn is_not_evaluated(&self) -> bool {
        matches!(
            self,
            Self::NotEvaluated {
                ..
            }
        )
    }
}

// ============================================================================
// SECTION: Equivalence
// ============================================================================

/// Result of comparing one fixture across consecutive generations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EquivalenceStatus {
    /// Both generations produced identical stdout.
    Equivalent,
    /// Both generations succeeded but their stdout differs.
    Diverged {
        /// Stdout of the lower generation (lossy UTF-8).
        lower_stdout: String,
        /// Stdout of the upper generation (lossy UTF-8).
        upper_stdout: String,
    },
    /// At least one side did not complete its pipeline, so no comparison was possible.
    Inconclusive {
        /// Why the comparison could not be made.
        reason: String,
    },
}

/// Equivalence check for one fixture between generations g and g+1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EquivalenceCheck {
    /// Fixture compared.
    pub fixture: FixtureId,
    /// Generation g.
    pub lower: Generation,
    /// Generation g+1.
    pub upper: Generation,
    /// Comparison result.
    pub status: EquivalenceStatus,
}

// ============================================================================
// SECTION: Findings
// ============================================================================

/// Severity classes of reported defects, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingClass {
    /// Consecutive generations disagree: the compiler cannot safely self-host.
    EquivalenceViolation,
    /// A pipeline step could not start or did not succeed.
    PipelineFailure,
    /// The pipeline succeeded but stdout differs from the expectation.
    OutputMismatch,
}

impl FindingClass {
    /// Returns a stable label for the class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EquivalenceViolation => "equivalence_violation",
            Self::PipelineFailure => "pipeline_failure",
            Self::OutputMismatch => "output_mismatch",
        }
    }
}

/// One reported defect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Defect class.
    pub class: FindingClass,
    /// Fixture concerned.
    pub fixture: FixtureId,
    /// Generation concerned (the upper generation for equivalence violations).
    pub generation: Generation,
    /// Human-readable description.
    pub message: String,
}

// ============================================================================
// SECTION: Bootstrap Report
// ============================================================================

/// Aggregate counts for a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    /// Fixtures in the matrix.
    pub fixtures: usize,
    /// Generations probed.
    pub generations: usize,
    /// Pairs whose pipeline ran.
    pub evaluated: usize,
    /// Pairs that succeeded with matching stdout.
    pub passed: usize,
    /// Pairs with a pipeline failure.
    pub pipeline_failures: usize,
    /// Pairs with an output mismatch.
    pub output_mismatches: usize,
    /// Pairs not evaluated because the stage is missing.
    pub not_evaluated: usize,
    /// Pairs skipped because the run was cancelled.
    pub skipped: usize,
    /// Equivalence checks performed.
    pub equivalence_checks: usize,
    /// Equivalence violations found.
    pub equivalence_violations: usize,
}

/// Complete result of a bootstrap matrix run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    /// Fixture -> generation -> cell.
    pub cells: BTreeMap<FixtureId, BTreeMap<Generation, Cell>>,
    /// Equivalence checks between consecutive available generations.
    pub equivalence: Vec<EquivalenceCheck>,
    /// Findings sorted by severity, fixture, then generation.
    pub findings: Vec<Finding>,
    /// True when the run was cancelled before completing.
    pub cancelled: bool,
}

impl BootstrapReport {
    /// Returns the cell for a (fixture, generation) pair.
    #[must_use]
    pub fn cell(&self, fixture: &FixtureId, generation: Generation) -> Option<&Cell> {
        self.cells.get(fixture).and_then(|row| row.get(&generation))
    }

    /// Returns the stage result for a pair when it was evaluated.
    #[must_use]
    pub fn result(&self, fixture: &FixtureId, generation: Generation) -> Option<&StageResult> {
        self.cell(fixture, generation).and_then(Cell::result)
    }

    /// Returns findings of one class.
    pub fn findings_of(&self, class: FindingClass) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |finding| finding.class == class)
    }

    /// Returns true when the run completed without any finding.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        !self.cancelled && self.findings.is_empty()
    }

    /// Computes aggregate counts.
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary {
            fixtures: self.cells.len(),
            generations: self.cells.values().map(BTreeMap::len).max().unwrap_or(0),
            equivalence_checks: self.equivalence.len(),
            ..ReportSummary::default()
        };
        for cell in self.cells.values().flat_map(BTreeMap::values) {
            match cell {
                Cell::NotEvaluated {
                    ..
                } => summary.not_evaluated += 1,
                Cell::Skipped => summary.skipped += 1,
                Cell::Evaluated {
                    result,
                    matches_expected,
                } => {
                    summary.evaluated += 1;
                    if !result.succeeded() {
                        summary.pipeline_failures += 1;
                    } else if *matches_expected {
                        summary.passed += 1;
                    } else {
                        summary.output_mismatches += 1;
                    }
                }
            }
        }
        summary.equivalence_violations = self
            .equivalence
            .iter()
            .filter(|check| matches!(check.status, EquivalenceStatus::Diverged { .. }))
            .count();
        summary
    }
}
