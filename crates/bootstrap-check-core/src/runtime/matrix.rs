// crates/bootstrap-check-core/src/runtime/matrix.rs
// ============================================================================
// Module: Bootstrap Matrix Evaluator
// Description: Run every (available stage, fixture) pair and compare generations.
// Purpose: Prove per-pair correctness and cross-generation convergence.
// Dependencies: crate::{core, interfaces, runtime::pipeline}, tokio
// ============================================================================

//! ## Overview
//! The evaluator fans pipeline runs out over a bounded [`JoinSet`] and places
//! each result by (fixture, generation), so the report never depends on
//! completion order. Once every pair has run it derives findings:
//! - per pair, a pipeline failure or an output mismatch;
//! - per consecutive pair of available generations, an equivalence check.
//!
//! Missing stages become not-evaluated cells and never findings. After
//! cancellation no new pipeline starts; pairs that never started are skipped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::core::BootstrapReport;
use crate::core::Cell;
use crate::core::CompilerStage;
use crate::core::EquivalenceCheck;
use crate::core::EquivalenceStatus;
use crate::core::Finding;
use crate::core::FindingClass;
use crate::core::Fixture;
use crate::core::FixtureId;
use crate::core::Generation;
use crate::core::StageResult;
use crate::core::StageSet;
use crate::core::StageSlot;
use crate::interfaces::HarnessEvent;
use crate::runtime::cancel::CancelSignal;
use crate::runtime::pipeline::PipelineOrchestrator;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Restricts a run to selected fixtures and generations.
///
/// Empty lists select everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatrixFilter {
    /// Fixture ids to run.
    pub fixtures: Vec<FixtureId>,
    /// Generations to run.
    pub generations: Vec<Generation>,
}

impl MatrixFilter {
    /// Returns true when the fixture is selected.
    #[must_use]
    pub fn selects_fixture(&self, id: &FixtureId) -> bool {
        self.fixtures.is_empty() || self.fixtures.contains(id)
    }

    /// Applies the generation filter to a stage set.
    #[must_use]
    pub fn apply_to_stages(&self, stages: &StageSet) -> StageSet {
        if self.generations.is_empty() {
            stages.clone()
        } else {
            stages.retain_generations(&self.generations)
        }
    }
}

// ============================================================================
// SECTION: Evaluator
// ============================================================================

/// Runs the bootstrap matrix.
#[derive(Clone)]
pub struct MatrixEvaluator {
    /// Orchestrator shared by every job.
    orchestrator: PipelineOrchestrator,
    /// Maximum pipelines in flight.
    jobs: usize,
}

/// Result of one spawned job; `None` when the job never started.
type JobOutput = (Generation, FixtureId, Option<StageResult>);

impl MatrixEvaluator {
    /// Creates an evaluator running at most `jobs` pipelines at once.
    #[must_use]
    pub fn new(orchestrator: PipelineOrchestrator, jobs: usize) -> Self {
        Self {
            orchestrator,
            jobs: jobs.max(1),
        }
    }

    /// Returns the parallelism bound.
    #[must_use]
    pub const fn jobs(&self) -> usize {
        self.jobs
    }

    /// Evaluates every selected (stage, fixture) pair and builds the report.
    pub async fn evaluate(
        &self,
        stages: &StageSet,
        fixtures: &[Fixture],
        filter: &MatrixFilter,
        cancel: &CancelSignal,
    ) -> BootstrapReport {
        let stages = filter.apply_to_stages(stages);
        let fixtures: Vec<&Fixture> =
            fixtures.iter().filter(|fixture| filter.selects_fixture(&fixture.id)).collect();
        let sink = Arc::clone(self.orchestrator.sink());
        sink.record(&HarnessEvent::new("matrix_started").detail(format!(
            "fixtures={} generations={} jobs={}",
            fixtures.len(),
            stages.len(),
            self.jobs
        )));

        let mut report = BootstrapReport::default();
        for fixture in &fixtures {
            let row = report.cells.entry(fixture.id.clone()).or_default();
            for (generation, slot) in stages.iter() {
                let cell = match slot {
                    StageSlot::Available {
                        ..
                    } => Cell::Skipped,
                    StageSlot::Missing {
                        expected_path,
                    } => Cell::NotEvaluated {
                        expected_path: expected_path.clone(),
                    },
                };
                row.insert(generation, cell);
            }
        }
        for (generation, slot) in stages.iter() {
            if let StageSlot::Missing {
                expected_path,
            } = slot
            {
                sink.record(
                    &HarnessEvent::new("stage_skipped")
                        .generation(generation)
                        .outcome("missing")
                        .detail(expected_path.display().to_string()),
                );
            }
        }

        let expected: BTreeMap<&FixtureId, &Fixture> =
            fixtures.iter().map(|fixture| (&fixture.id, *fixture)).collect();
        let mut jobs = self.spawn_jobs(&stages, &fixtures, cancel);
        while let Some(joined) = jobs.join_next().await {
            // Jobs that never started or panicked leave their cell skipped.
            let Ok((generation, fixture_id, Some(result))) = joined else {
                continue;
            };
            let matches_expected = result.succeeded()
                && expected.get(&fixture_id).is_some_and(|fixture| {
                    result.stdout_bytes().is_some_and(|stdout| fixture.matches(stdout))
                });
            if let Some(row) = report.cells.get_mut(&fixture_id) {
                row.insert(
                    generation,
                    Cell::Evaluated {
                        result: Box::new(result),
                        matches_expected,
                    },
                );
            }
        }

        report.findings = pair_findings(&report, &expected);
        for check in equivalence_checks(&report, &stages) {
            if let EquivalenceStatus::Diverged {
                lower_stdout,
                upper_stdout,
            } = &check.status
            {
                report.findings.push(Finding {
                    class: FindingClass::EquivalenceViolation,
                    fixture: check.fixture.clone(),
                    generation: check.upper,
                    message: format!(
                        "{} printed `{}` but {} printed `{}`",
                        check.lower,
                        lower_stdout.escape_debug(),
                        check.upper,
                        upper_stdout.escape_debug()
                    ),
                });
            }
            report.equivalence.push(check);
        }
        report.findings.sort_by(|left, right| {
            (left.class, &left.fixture, left.generation).cmp(&(
                right.class,
                &right.fixture,
                right.generation,
            ))
        });
        report.cancelled = cancel.is_cancelled();

        let summary = report.summary();
        let label = if report.cancelled { "matrix_cancelled" } else { "matrix_finished" };
        let outcome = if report.is_clean() { "clean" } else { "findings" };
        sink.record(&HarnessEvent::new(label).outcome(outcome).detail(format!(
            "evaluated={} passed={} pipeline_failures={} output_mismatches={} not_evaluated={} \
             skipped={} equivalence_violations={}",
            summary.evaluated,
            summary.passed,
            summary.pipeline_failures,
            summary.output_mismatches,
            summary.not_evaluated,
            summary.skipped,
            summary.equivalence_violations
        )));
        report
    }

    /// Spawns one job per (available stage, fixture) pair, generation-major.
    fn spawn_jobs(
        &self,
        stages: &StageSet,
        fixtures: &[&Fixture],
        cancel: &CancelSignal,
    ) -> JoinSet<JobOutput> {
        let permits = Arc::new(Semaphore::new(self.jobs));
        let mut jobs = JoinSet::new();
        for stage in stages.available() {
            for fixture in fixtures {
                let job = Job {
                    orchestrator: self.orchestrator.clone(),
                    permits: Arc::clone(&permits),
                    stage: stage.clone(),
                    fixture: (*fixture).clone(),
                    cancel: cancel.clone(),
                };
                jobs.spawn(job.run());
            }
        }
        jobs
    }
}

// ============================================================================
// SECTION: Jobs
// ============================================================================

/// One (stage, fixture) pipeline run waiting for a permit.
struct Job {
    /// Shared orchestrator.
    orchestrator: PipelineOrchestrator,
    /// Parallelism bound.
    permits: Arc<Semaphore>,
    /// Stage under test.
    stage: CompilerStage,
    /// Fixture under test.
    fixture: Fixture,
    /// Run-wide cancellation.
    cancel: CancelSignal,
}

impl Job {
    /// Waits for a permit, then runs the pipeline unless cancelled first.
    async fn run(self) -> JobOutput {
        let generation = self.stage.generation;
        let fixture_id = self.fixture.id.clone();
        let permit = tokio::select! {
            permit = Arc::clone(&self.permits).acquire_owned() => permit.ok(),
            () = self.cancel.cancelled() => None,
        };
        let Some(_permit) = permit else {
            return (generation, fixture_id, None);
        };
        if self.cancel.is_cancelled() {
            return (generation, fixture_id, None);
        }
        let result = self.orchestrator.run(&self.stage, &self.fixture, &self.cancel).await;
        (generation, fixture_id, Some(result))
    }
}

// ============================================================================
// SECTION: Findings
// ============================================================================

/// Collects pipeline failures and output mismatches for evaluated cells.
fn pair_findings(
    report: &BootstrapReport,
    expected: &BTreeMap<&FixtureId, &Fixture>,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (fixture_id, row) in &report.cells {
        for (generation, cell) in row {
            let Cell::Evaluated {
                result,
                matches_expected,
            } = cell
            else {
                continue;
            };
            if let Some(failure) = &result.failure {
                let mut message = failure.to_string();
                if let Some(line) = failure.stderr.lines().find(|line| !line.trim().is_empty()) {
                    message.push_str(": ");
                    message.push_str(line.trim());
                }
                findings.push(Finding {
                    class: FindingClass::PipelineFailure,
                    fixture: fixture_id.clone(),
                    generation: *generation,
                    message,
                });
            } else if !matches_expected {
                let wanted = expected
                    .get(fixture_id)
                    .map(|fixture| String::from_utf8_lossy(&fixture.expected_stdout).into_owned())
                    .unwrap_or_default();
                let got = result.stdout.clone().unwrap_or_default();
                findings.push(Finding {
                    class: FindingClass::OutputMismatch,
                    fixture: fixture_id.clone(),
                    generation: *generation,
                    message: format!(
                        "expected `{}` but got `{}`",
                        wanted.escape_debug(),
                        got.escape_debug()
                    ),
                });
            }
        }
    }
    findings
}

/// Compares every fixture across consecutive available generations.
fn equivalence_checks(report: &BootstrapReport, stages: &StageSet) -> Vec<EquivalenceCheck> {
    let mut checks = Vec::new();
    for (lower, upper) in stages.consecutive_pairs() {
        for fixture_id in report.cells.keys() {
            let status = compare(
                report.result(fixture_id, lower),
                report.result(fixture_id, upper),
                lower,
                upper,
            );
            checks.push(EquivalenceCheck {
                fixture: fixture_id.clone(),
                lower,
                upper,
                status,
            });
        }
    }
    checks
}

/// Compares two stage results for one fixture.
fn compare(
    lower_result: Option<&StageResult>,
    upper_result: Option<&StageResult>,
    lower: Generation,
    upper: Generation,
) -> EquivalenceStatus {
    let (lower_result, upper_result) = match (lower_result, upper_result) {
        (Some(lower_result), Some(upper_result))
            if lower_result.succeeded() && upper_result.succeeded() =>
        {
            (lower_result, upper_result)
        }
        (lower_result, upper_result) => {
            let reason = incomplete_reason(lower, lower_result)
                .or_else(|| incomplete_reason(upper, upper_result))
                .unwrap_or_default();
            return EquivalenceStatus::Inconclusive {
                reason,
            };
        }
    };
    if lower_result.stdout_bytes() == upper_result.stdout_bytes() {
        EquivalenceStatus::Equivalent
    } else {
        EquivalenceStatus::Diverged {
            lower_stdout: lower_result.stdout.clone().unwrap_or_default(),
            upper_stdout: upper_result.stdout.clone().unwrap_or_default(),
        }
    }
}

/// Explains why one side of a comparison has no usable stdout.
fn incomplete_reason(generation: Generation, result: Option<&StageResult>) -> Option<String> {
    match result {
        None => Some(format!("{generation} was not run")),
        Some(result) if !result.succeeded() => {
            Some(format!("{generation} did not complete its pipeline"))
        }
        Some(_) => None,
    }
}
