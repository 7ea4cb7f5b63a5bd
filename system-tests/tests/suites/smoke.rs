// system-tests/tests/suites/smoke.rs
// ============================================================================
// Module: Smoke Tests
// Description: End-to-end bootstrap matrix runs against a healthy chain.
// Purpose: Validate the happy path, missing stages, and rerun stability.
// Dependencies: system-tests helpers
// ============================================================================

//! ## Overview
//! Smoke scenarios run the full compile, link, and execute pipeline with
//! scripted compiler generations and check the resulting report.

use bootstrap_check_core::CancelSignal;
use bootstrap_check_core::Cell;
use bootstrap_check_core::EquivalenceStatus;
use bootstrap_check_core::FixtureId;
use bootstrap_check_core::Generation;
use helpers::artifacts::ScenarioRecorder;
use helpers::harness::default_options;
use helpers::harness::evaluate_tree;
use helpers::harness::process_lock;
use system_tests::toolchain::BuildTree;
use system_tests::toolchain::CompilerScript;
use system_tests::toolchain::LinkerScript;

use crate::helpers;

#[tokio::test(flavor = "multi_thread")]
async fn healthy_chain_passes() -> Result<(), Box<dyn std::error::Error>> {
    let _lock = process_lock().await;
    let mut recorder = ScenarioRecorder::new("healthy_chain_passes")?;
    let tree = BuildTree::create()?;
    tree.install_stage(generation(1)?, CompilerScript::Faithful)?;
    tree.install_stage(generation(2)?, CompilerScript::Faithful)?;
    tree.install_linker(LinkerScript::Wrapping)?;
    tree.add_fixture("hello_world", "hello world")?;
    tree.add_fixture("nested/greeting", "hi there")?;

    let run = evaluate_tree(&tree, &default_options()?, &CancelSignal::never()).await?;
    let report_path = recorder.record(&run.report)?;
    let recorded: serde_json::Value = serde_json::from_slice(&std::fs::read(&report_path)?)?;
    require(
        recorded["cells"]["nested/greeting"]["2"].is_object(),
        "recorded report should hold the nested/greeting stage2 cell",
    )?;

    let summary = run.report.summary();
    require(run.report.is_clean(), "healthy chain produced findings")?;
    require(summary.passed == 4, format!("expected 4 passes, got {}", summary.passed))?;
    require(summary.not_evaluated == 2, "stage3 should be not evaluated for both fixtures")?;
    require(summary.equivalence_checks == 2, "expected one equivalence check per fixture")?;
    require(
        run.report
            .equivalence
            .iter()
            .all(|check| check.status == EquivalenceStatus::Equivalent),
        "stage1 and stage2 should agree",
    )?;
    let hello = run
        .report
        .result(&FixtureId::new("hello_world"), generation(1)?)
        .ok_or("missing stage1 result for hello_world")?;
    require(hello.stdout.as_deref() == Some("hello world\n"), "hello_world stdout differs")?;

    let labels = run.sink.labels();
    require(labels.first() == Some(&"matrix_started"), "first event should be matrix_started")?;
    require(labels.last() == Some(&"matrix_finished"), "last event should be matrix_finished")?;

    recorder.finish("pass", vec!["two faithful generations agree on every fixture".to_string()])?;
    let summary_path = report_path.with_file_name("summary.json");
    let written: serde_json::Value = serde_json::from_slice(&std::fs::read(summary_path)?)?;
    require(written["matrix"]["passed"] == 4, "summary should carry the matrix counts")?;
    require(written["matrix"]["not_evaluated"] == 2, "summary should count missing stages")?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_stage_is_not_evaluated() -> Result<(), Box<dyn std::error::Error>> {
    let _lock = process_lock().await;
    let mut recorder = ScenarioRecorder::new("missing_stage_is_not_evaluated")?;
    let tree = BuildTree::create()?;
    tree.install_stage(generation(1)?, CompilerScript::Faithful)?;
    tree.install_linker(LinkerScript::Wrapping)?;
    tree.add_fixture("hello_world", "hello world")?;

    let run = evaluate_tree(&tree, &default_options()?, &CancelSignal::never()).await?;
    recorder.record(&run.report)?;

    let id = FixtureId::new("hello_world");
    let Some(Cell::NotEvaluated {
        expected_path,
    }) = run.report.cell(&id, generation(2)?)
    else {
        return Err("stage2 cell should be not evaluated".into());
    };
    require(
        expected_path.ends_with("c.stage2"),
        format!("unexpected probe path {}", expected_path.display()),
    )?;
    require(run.report.is_clean(), "a missing stage is not a finding")?;
    require(run.report.equivalence.is_empty(), "no consecutive pair is available")?;
    require(
        run.sink.labels().iter().filter(|label| **label == "stage_skipped").count() == 2,
        "stage2 and stage3 should be reported as skipped",
    )?;

    let note = "missing generations are reported, not run".to_string();
    recorder.finish("pass", vec![note])?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn rerun_is_stable() -> Result<(), Box<dyn std::error::Error>> {
    let _lock = process_lock().await;
    let mut recorder = ScenarioRecorder::new("rerun_is_stable")?;
    let tree = BuildTree::create()?;
    tree.install_stage(generation(1)?, CompilerScript::Faithful)?;
    tree.install_stage(generation(2)?, CompilerScript::Faithful)?;
    tree.install_linker(LinkerScript::Wrapping)?;
    tree.add_fixture("alpha", "a")?;
    tree.add_fixture("beta", "b")?;

    let options = default_options()?;
    let first = evaluate_tree(&tree, &options, &CancelSignal::never()).await?;
    let second = evaluate_tree(&tree, &options, &CancelSignal::never()).await?;
    recorder.record(&second.report)?;

    require(first.report.summary() == second.report.summary(), "summaries differ across runs")?;
    require(first.report.findings == second.report.findings, "findings differ across runs")?;
    require(first.report.equivalence == second.report.equivalence, "equivalence differs")?;
    for (fixture, row) in &first.report.cells {
        for (generation, cell) in row {
            let before = cell.result().and_then(|result| result.stdout.clone());
            let after = second
                .report
                .result(fixture, *generation)
                .and_then(|result| result.stdout.clone());
            require(before == after, format!("stdout differs for {fixture} @ {generation}"))?;
        }
    }

    recorder.finish("pass", vec!["reruns over kept artifacts agree".to_string()])?;
    Ok(())
}

fn generation(raw: u32) -> Result<Generation, Box<dyn std::error::Error>> {
    Generation::from_raw(raw).ok_or_else(|| format!("invalid generation {raw}").into())
}

fn require(condition: bool, message: impl Into<String>) -> Result<(), Box<dyn std::error::Error>> {
    if condition { Ok(()) } else { Err(message.into().into()) }
}
