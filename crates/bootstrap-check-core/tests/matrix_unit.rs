// crates/bootstrap-check-core/tests/matrix_unit.rs
// ============================================================================
// Module: Bootstrap Matrix Unit Tests
// Description: Per-pair correctness, equivalence, missing stages, and cancellation.
// Purpose: Validate report construction against a scripted bootstrap chain.
// ============================================================================

//! Matrix evaluator tests against a scripted three-generation chain.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::path::Path;
use std::sync::Arc;

use bootstrap_check_core::CancelHandle;
use bootstrap_check_core::CancelSignal;
use bootstrap_check_core::Cell;
use bootstrap_check_core::CompilerStage;
use bootstrap_check_core::EquivalenceStatus;
use bootstrap_check_core::FindingClass;
use bootstrap_check_core::Fixture;
use bootstrap_check_core::FixtureId;
use bootstrap_check_core::Generation;
use bootstrap_check_core::Invocation;
use bootstrap_check_core::InvocationResult;
use bootstrap_check_core::MatrixEvaluator;
use bootstrap_check_core::MatrixFilter;
use bootstrap_check_core::MemoryEventSink;
use bootstrap_check_core::RunnerError;
use bootstrap_check_core::StageSet;
use common::ScriptedRunner;
use common::copy_first_arg;
use common::exited;
use common::orchestrator;
use common::settings;
use common::write_output;

// ============================================================================
// SECTION: Scripted Chain
// ============================================================================

fn generation(raw: u32) -> Generation {
    Generation::from_raw(raw).unwrap()
}

fn stage_binary(raw: u32) -> String {
    format!("/build/stage{raw}")
}

fn stages(available: &[u32], missing: &[u32]) -> StageSet {
    let mut set = StageSet::new();
    for raw in available {
        set.insert_available(CompilerStage::new(generation(*raw), stage_binary(*raw)));
    }
    for raw in missing {
        set.insert_missing(generation(*raw), stage_binary(*raw));
    }
    set
}

fn fixtures() -> Vec<Fixture> {
    vec![
        Fixture::new("arith", "/fixtures/arith.c", b"42\n".to_vec()),
        Fixture::new("hello_world", "/fixtures/hello_world.c", b"hello world\n".to_vec()),
    ]
}

/// Stdout each (stage binary, source) combination prints.
type Behavior = fn(&str, &str) -> Result<Vec<u8>, String>;

fn faithful(_stage: &str, source: &str) -> Result<Vec<u8>, String> {
    if source.ends_with("arith.c") {
        Ok(b"42\n".to_vec())
    } else {
        Ok(b"hello world\n".to_vec())
    }
}

/// Compile writes `<stage>|<source>` into the object; link copies it; execute
/// decodes it and asks `behavior` what the program prints.
fn chain(behavior: Behavior) -> impl Fn(&Invocation) -> Result<InvocationResult, RunnerError> {
    move |invocation| {
        let program = invocation.program.to_string_lossy().into_owned();
        if program.starts_with("/build/stage") {
            let source = invocation.args[0].to_string_lossy().into_owned();
            if let Err(stderr) = behavior(&program, &source)
                && stderr.starts_with("compile:")
            {
                return Ok(exited(invocation, 1, b"", stderr.as_bytes()));
            }
            write_output(invocation, format!("{program}|{source}").as_bytes())
        } else if program == "clang" {
            copy_first_arg(invocation)
        } else {
            let contents = std::fs::read_to_string(Path::new(&invocation.program)).unwrap();
            let (stage, source) = contents.split_once('|').unwrap();
            match behavior(stage, source) {
                Ok(stdout) => Ok(exited(invocation, 0, &stdout, b"")),
                Err(stderr) => Ok(exited(invocation, 3, b"", stderr.as_bytes())),
            }
        }
    }
}

async fn evaluate(
    behavior: Behavior,
    stage_set: &StageSet,
    filter: &MatrixFilter,
    jobs: usize,
    cancel: &CancelSignal,
) -> (bootstrap_check_core::BootstrapReport, Arc<MemoryEventSink>) {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new(chain(behavior));
    let (orchestrator, sink) = orchestrator(runner, settings(dir.path()));
    let evaluator = MatrixEvaluator::new(orchestrator, jobs);
    let report = evaluator.evaluate(stage_set, &fixtures(), filter, cancel).await;
    (report, sink)
}

// ============================================================================
// SECTION: Converged Chain
// ============================================================================

#[tokio::test]
async fn converged_chain_is_clean() {
    let (report, sink) = evaluate(
        faithful,
        &stages(&[1, 2, 3], &[]),
        &MatrixFilter::default(),
        1,
        &CancelSignal::never(),
    )
    .await;

    assert!(report.is_clean(), "unexpected findings: {:?}", report.findings);
    let summary = report.summary();
    assert_eq!(summary.fixtures, 2);
    assert_eq!(summary.generations, 3);
    assert_eq!(summary.evaluated, 6);
    assert_eq!(summary.passed, 6);
    assert_eq!(summary.equivalence_checks, 4);
    assert!(report.equivalence.iter().all(|check| check.status == EquivalenceStatus::Equivalent));
    let hello = FixtureId::new("hello_world");
    assert_eq!(
        report.result(&hello, generation(1)).unwrap().stdout.as_deref(),
        Some("hello world\n")
    );
    let labels = sink.labels();
    assert_eq!(labels.first(), Some(&"matrix_started"));
    assert_eq!(labels.last(), Some(&"matrix_finished"));
}

#[tokio::test]
async fn parallel_jobs_produce_the_same_report_layout() {
    let stage_set = stages(&[1, 2, 3], &[]);
    let (serial, _) =
        evaluate(faithful, &stage_set, &MatrixFilter::default(), 1, &CancelSignal::never()).await;
    let (parallel, _) =
        evaluate(faithful, &stage_set, &MatrixFilter::default(), 4, &CancelSignal::never()).await;

    assert_eq!(serial.summary(), parallel.summary());
    assert_eq!(serial.findings, parallel.findings);
    assert_eq!(serial.equivalence, parallel.equivalence);
    let serial_keys: Vec<_> = serial
        .cells
        .iter()
        .flat_map(|(id, row)| row.keys().map(move |g| (id.clone(), *g)))
        .collect();
    let parallel_keys: Vec<_> = parallel
        .cells
        .iter()
        .flat_map(|(id, row)| row.keys().map(move |g| (id.clone(), *g)))
        .collect();
    assert_eq!(serial_keys, parallel_keys);
}

// ============================================================================
// SECTION: Missing Stages
// ============================================================================

#[tokio::test]
async fn missing_stage_two_is_not_evaluated() {
    let (report, sink) = evaluate(
        faithful,
        &stages(&[1, 3], &[2]),
        &MatrixFilter::default(),
        1,
        &CancelSignal::never(),
    )
    .await;

    for fixture in fixtures() {
        assert!(report.cell(&fixture.id, generation(2)).unwrap().is_not_evaluated());
    }
    assert!(report.findings.is_empty());
    assert!(report.equivalence.is_empty(), "no pair may span the missing generation");
    assert_eq!(report.summary().not_evaluated, 2);
    assert!(sink.labels().contains(&"stage_skipped"));
}

// ============================================================================
// SECTION: Defects
// ============================================================================

fn diverging_third(stage: &str, source: &str) -> Result<Vec<u8>, String> {
    if stage.ends_with("stage3") && source.ends_with("arith.c") {
        return Ok(b"41\n".to_vec());
    }
    faithful(stage, source)
}

#[tokio::test]
async fn divergence_is_the_most_severe_finding() {
    let (report, _) = evaluate(
        diverging_third,
        &stages(&[1, 2, 3], &[]),
        &MatrixFilter::default(),
        1,
        &CancelSignal::never(),
    )
    .await;

    let classes: Vec<FindingClass> = report.findings.iter().map(|finding| finding.class).collect();
    assert_eq!(classes, vec![FindingClass::EquivalenceViolation, FindingClass::OutputMismatch]);
    let violation = &report.findings[0];
    assert_eq!(violation.fixture.as_str(), "arith");
    assert_eq!(violation.generation, generation(3));
    let check = report
        .equivalence
        .iter()
        .find(|check| check.fixture.as_str() == "arith" && check.upper == generation(3))
        .unwrap();
    assert_eq!(
        check.status,
        EquivalenceStatus::Diverged {
            lower_stdout: "42\n".to_string(),
            upper_stdout: "41\n".to_string(),
        }
    );
}

fn broken_second(stage: &str, source: &str) -> Result<Vec<u8>, String> {
    if stage.ends_with("stage2") && source.ends_with("hello_world.c") {
        return Err("compile: unsupported construct".to_string());
    }
    faithful(stage, source)
}

#[tokio::test]
async fn step_failure_makes_neighboring_checks_inconclusive() {
    let (report, _) = evaluate(
        broken_second,
        &stages(&[1, 2, 3], &[]),
        &MatrixFilter::default(),
        1,
        &CancelSignal::never(),
    )
    .await;

    let failures: Vec<_> = report.findings_of(FindingClass::PipelineFailure).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].generation, generation(2));
    assert!(failures[0].message.contains("compile step"));
    assert!(failures[0].message.contains("unsupported construct"));
    let hello = FixtureId::new("hello_world");
    let inconclusive = report
        .equivalence
        .iter()
        .filter(|check| check.fixture == hello)
        .all(|check| matches!(check.status, EquivalenceStatus::Inconclusive { .. }));
    assert!(inconclusive);
    assert_eq!(report.summary().equivalence_violations, 0);
}

fn crashing_program(stage: &str, source: &str) -> Result<Vec<u8>, String> {
    if stage.ends_with("stage1") && source.ends_with("arith.c") {
        return Err("segfault".to_string());
    }
    faithful(stage, source)
}

#[tokio::test]
async fn nonzero_program_exit_is_an_execute_failure() {
    let (report, _) = evaluate(
        crashing_program,
        &stages(&[1], &[]),
        &MatrixFilter::default(),
        1,
        &CancelSignal::never(),
    )
    .await;

    let arith = report.result(&FixtureId::new("arith"), generation(1)).unwrap();
    let failure = arith.failure.as_ref().unwrap();
    assert_eq!(failure.step.as_str(), "execute");
    assert_eq!(failure.stderr, "segfault");
    assert_eq!(report.summary().pipeline_failures, 1);
    assert_eq!(report.summary().passed, 1);
}

// ============================================================================
// SECTION: Filters and Cancellation
// ============================================================================

#[tokio::test]
async fn filters_restrict_fixtures_and_generations() {
    let filter = MatrixFilter {
        fixtures: vec![FixtureId::new("hello_world")],
        generations: vec![generation(2), generation(3)],
    };
    let (report, _) =
        evaluate(faithful, &stages(&[1, 2, 3], &[]), &filter, 2, &CancelSignal::never()).await;

    assert_eq!(report.cells.len(), 1);
    let row = &report.cells[&FixtureId::new("hello_world")];
    assert_eq!(row.keys().copied().collect::<Vec<_>>(), vec![generation(2), generation(3)]);
    assert_eq!(report.equivalence.len(), 1);
    assert!(report.is_clean());
}

#[tokio::test]
async fn cancelled_run_skips_every_pair() {
    let (handle, signal) = CancelHandle::new();
    handle.cancel();
    let (report, sink) =
        evaluate(faithful, &stages(&[1, 2], &[3]), &MatrixFilter::default(), 2, &signal).await;

    assert!(report.cancelled);
    assert!(!report.is_clean());
    let summary = report.summary();
    assert_eq!(summary.skipped, 4);
    assert_eq!(summary.not_evaluated, 2);
    assert_eq!(summary.evaluated, 0);
    assert!(report.cells.values().flat_map(|row| row.values()).all(|cell| !matches!(
        cell,
        Cell::Evaluated { .. }
    )));
    assert_eq!(sink.labels().last(), Some(&"matrix_cancelled"));
}
