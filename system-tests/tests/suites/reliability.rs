// system-tests/tests/suites/reliability.rs
// ============================================================================
// Module: Reliability Tests
// Description: Concurrency, failure, timeout, and cancellation checks.
// Purpose: Validate that broken chains surface as findings and runs always terminate.
// Dependencies: system-tests helpers
// ============================================================================

//! ## Overview
//! Reliability scenarios break one part of the scripted chain at a time and
//! check that the report names the defect.

use std::time::Duration;
use std::time::Instant;

use bootstrap_check_core::CancelHandle;
use bootstrap_check_core::CancelSignal;
use bootstrap_check_core::Cell;
use bootstrap_check_core::EquivalenceStatus;
use bootstrap_check_core::FailureKind;
use bootstrap_check_core::FindingClass;
use bootstrap_check_core::FixtureId;
use bootstrap_check_core::Generation;
use bootstrap_check_core::PipelineStep;
use helpers::artifacts::ScenarioRecorder;
use helpers::harness::EvalOptions;
use helpers::harness::default_options;
use helpers::harness::evaluate_tree;
use helpers::harness::process_lock;
use system_tests::toolchain::BuildTree;
use system_tests::toolchain::CompilerScript;
use system_tests::toolchain::LinkerScript;

use crate::helpers;

/// Upper bound for scenarios that must stop a hanging program.
const PROMPT_EXIT: Duration = Duration::from_secs(15);

#[tokio::test(flavor = "multi_thread")]
async fn parallel_jobs_keep_artifacts_apart() -> Result<(), Box<dyn std::error::Error>> {
    let _lock = process_lock().await;
    let mut recorder = ScenarioRecorder::new("parallel_jobs_keep_artifacts_apart")?;
    let tree = BuildTree::create()?;
    tree.install_stage(generation(1)?, CompilerScript::Faithful)?;
    tree.install_stage(generation(2)?, CompilerScript::Faithful)?;
    tree.install_linker(LinkerScript::Wrapping)?;
    let ids = ["one", "two", "three", "nested/four", "nested/five", "six"];
    for id in ids {
        tree.add_fixture(id, &format!("output of {id}"))?;
    }

    let options = EvalOptions {
        jobs: 4,
        ..default_options()?
    };
    let run = evaluate_tree(&tree, &options, &CancelSignal::never()).await?;
    recorder.record(&run.report)?;

    let summary = run.report.summary();
    require(run.report.is_clean(), "parallel run produced findings")?;
    require(summary.passed == 12, format!("expected 12 passes, got {}", summary.passed))?;
    for id in ids {
        for raw in [1, 2] {
            let result = run
                .report
                .result(&FixtureId::new(id), generation(raw)?)
                .ok_or_else(|| format!("missing result for {id}"))?;
            let expected = format!("output of {id}\n");
            require(
                result.stdout.as_deref() == Some(expected.as_str()),
                format!("{id} @ stage{raw} printed another fixture's output"),
            )?;
        }
    }
    let artifacts = std::fs::read_dir(tree.artifact_dir())?.count();
    require(artifacts == 24, format!("expected 24 artifacts, found {artifacts}"))?;

    recorder.finish("pass", vec!["12 pairs ran with 4 jobs".to_string()])?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn diverging_generation_is_flagged() -> Result<(), Box<dyn std::error::Error>> {
    let _lock = process_lock().await;
    let mut recorder = ScenarioRecorder::new("diverging_generation_is_flagged")?;
    let tree = BuildTree::create()?;
    tree.install_stage(generation(1)?, CompilerScript::Faithful)?;
    tree.install_stage(generation(2)?, CompilerScript::Diverging)?;
    tree.install_linker(LinkerScript::Wrapping)?;
    tree.add_fixture("hello_world", "hello world")?;

    let run = evaluate_tree(&tree, &default_options()?, &CancelSignal::never()).await?;
    let report_path = recorder.record(&run.report)?;
    let recorded: serde_json::Value = serde_json::from_slice(&std::fs::read(&report_path)?)?;
    require(
        recorded["findings"].as_array().map(Vec::len) == Some(2),
        "recorded report should carry both findings",
    )?;

    let classes: Vec<FindingClass> =
        run.report.findings.iter().map(|finding| finding.class).collect();
    require(
        classes == [FindingClass::EquivalenceViolation, FindingClass::OutputMismatch],
        "expected an equivalence violation followed by an output mismatch",
    )?;
    let upper = generation(2)?;
    require(
        run.report.findings.iter().all(|finding| finding.generation == upper),
        "findings should name stage2",
    )?;
    let check = run.report.equivalence.first().ok_or("missing equivalence check")?;
    let EquivalenceStatus::Diverged {
        lower_stdout,
        upper_stdout,
    } = &check.status
    else {
        return Err("stage1 and stage2 should diverge".into());
    };
    require(lower_stdout == "hello world\n", "unexpected stage1 stdout")?;
    require(upper_stdout == "hello world\ndrift\n", "unexpected stage2 stdout")?;

    recorder.finish(
        "pass",
        vec!["divergence is reported against the upper generation".to_string()],
    )?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_compiler_stops_the_pipeline() -> Result<(), Box<dyn std::error::Error>> {
    let _lock = process_lock().await;
    let mut recorder = ScenarioRecorder::new("failing_compiler_stops_the_pipeline")?;
    let tree = BuildTree::create()?;
    tree.install_stage(generation(1)?, CompilerScript::Failing)?;
    tree.install_stage(generation(2)?, CompilerScript::Faithful)?;
    tree.install_linker(LinkerScript::Wrapping)?;
    tree.add_fixture("hello_world", "hello world")?;

    let run = evaluate_tree(&tree, &default_options()?, &CancelSignal::never()).await?;
    recorder.record(&run.report)?;

    let result = run
        .report
        .result(&FixtureId::new("hello_world"), generation(1)?)
        .ok_or("missing stage1 result")?;
    let failure = result.failure.as_ref().ok_or("stage1 should fail")?;
    require(failure.step == PipelineStep::Compile, "failure should be in the compile step")?;
    require(
        failure.kind
            == FailureKind::ExitedNonZero {
                code: Some(3),
            },
        "compile should exit with code 3",
    )?;
    require(failure.stderr.contains("internal compiler error"), "stderr not captured")?;
    require(result.steps.len() == 1, "link and execute must not run after a compile failure")?;
    require(result.stdout.is_none(), "a failed pipeline has no stdout")?;

    let check = run.report.equivalence.first().ok_or("missing equivalence check")?;
    require(
        matches!(check.status, EquivalenceStatus::Inconclusive { .. }),
        "equivalence with a failed side is inconclusive",
    )?;
    let stage2 = run
        .report
        .cell(&FixtureId::new("hello_world"), generation(2)?)
        .ok_or("missing stage2 cell")?;
    require(
        matches!(stage2, Cell::Evaluated { matches_expected: true, .. }),
        "stage2 should still pass",
    )?;

    let note = "compile failure is isolated to stage1".to_string();
    recorder.finish("pass", vec![note])?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn hanging_program_times_out() -> Result<(), Box<dyn std::error::Error>> {
    let _lock = process_lock().await;
    let mut recorder = ScenarioRecorder::new("hanging_program_times_out")?;
    let tree = BuildTree::create()?;
    tree.install_stage(generation(1)?, CompilerScript::Faithful)?;
    tree.install_linker(LinkerScript::Hanging)?;
    tree.add_fixture("spin", "never printed")?;

    let options = EvalOptions {
        timeout: Duration::from_secs(1),
        ..EvalOptions::default()
    };
    let started = Instant::now();
    let run = evaluate_tree(&tree, &options, &CancelSignal::never()).await?;
    let elapsed = started.elapsed();
    recorder.record(&run.report)?;

    require(elapsed < PROMPT_EXIT, format!("timeout took {} ms", elapsed.as_millis()))?;
    let result = run
        .report
        .result(&FixtureId::new("spin"), generation(1)?)
        .ok_or("missing stage1 result")?;
    let failure = result.failure.as_ref().ok_or("hanging program should fail")?;
    require(failure.step == PipelineStep::Execute, "timeout should hit the execute step")?;
    require(
        failure.kind
            == FailureKind::TimedOut {
                limit_ms: 1_000,
            },
        "failure should be a timeout",
    )?;
    require(
        run.report.findings_of(FindingClass::PipelineFailure).count() == 1,
        "timeout should be one pipeline failure",
    )?;

    let note = format!("timed out after {} ms", elapsed.as_millis());
    recorder.finish("pass", vec![note])?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_stops_the_run() -> Result<(), Box<dyn std::error::Error>> {
    let _lock = process_lock().await;
    let mut recorder = ScenarioRecorder::new("cancellation_stops_the_run")?;
    let tree = BuildTree::create()?;
    tree.install_stage(generation(1)?, CompilerScript::Faithful)?;
    tree.install_stage(generation(2)?, CompilerScript::Faithful)?;
    tree.install_linker(LinkerScript::Hanging)?;
    for id in ["a", "b", "c"] {
        tree.add_fixture(id, id)?;
    }

    let options = EvalOptions {
        timeout: Duration::from_secs(300),
        ..EvalOptions::default()
    };
    let (handle, signal) = CancelHandle::new();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.cancel();
    });
    let started = Instant::now();
    let run = evaluate_tree(&tree, &options, &signal).await?;
    let elapsed = started.elapsed();
    canceller.await?;
    recorder.record(&run.report)?;

    require(elapsed < PROMPT_EXIT, format!("cancellation took {} ms", elapsed.as_millis()))?;
    require(run.report.cancelled, "report should be marked cancelled")?;
    let summary = run.report.summary();
    require(
        summary.evaluated + summary.skipped == 6,
        "every pair is either evaluated or skipped",
    )?;
    require(summary.passed == 0, "no hanging program can pass")?;
    require(
        run.sink.labels().last() == Some(&"matrix_cancelled"),
        "last event should be matrix_cancelled",
    )?;

    let note = format!("cancelled after {} ms", elapsed.as_millis());
    recorder.finish("pass", vec![note])?;
    Ok(())
}

fn generation(raw: u32) -> Result<Generation, Box<dyn std::error::Error>> {
    Generation::from_raw(raw).ok_or_else(|| format!("invalid generation {raw}").into())
}

fn require(condition: bool, message: impl Into<String>) -> Result<(), Box<dyn std::error::Error>> {
    if condition { Ok(()) } else { Err(message.into().into()) }
}
