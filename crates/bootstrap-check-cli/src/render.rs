// crates/bootstrap-check-cli/src/render.rs
// ============================================================================
// Module: Report Rendering
// Description: Text, Markdown, and canonical JSON renderings of a run.
// Purpose: Turn a bootstrap report into terminal output and report artifacts.
// Dependencies: bootstrap-check-core, serde, serde_jcs
// ============================================================================

//! ## Overview
//! Every rendering iterates the report's ordered maps, so output is
//! byte-identical for identical reports regardless of job scheduling.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use bootstrap_check_core::BootstrapReport;
use bootstrap_check_core::Cell;
use bootstrap_check_core::EquivalenceStatus;
use bootstrap_check_core::Generation;
use bootstrap_check_core::ReportSummary;
use bootstrap_check_core::StageSet;
use bootstrap_check_core::StageSlot;
use serde::Serialize;

// ============================================================================
// SECTION: Documents
// ============================================================================

/// Canonical JSON document emitted by `run`.
#[derive(Debug, Serialize)]
pub(crate) struct RunDocument<'a> {
    /// Overall status label.
    pub status: &'static str,
    /// Aggregate counts.
    pub summary: ReportSummary,
    /// Probed stages.
    pub stages: &'a StageSet,
    /// Full report.
    pub report: &'a BootstrapReport,
}

impl<'a> RunDocument<'a> {
    /// Builds the document for a finished run.
    pub(crate) fn new(stages: &'a StageSet, report: &'a BootstrapReport) -> Self {
        Self {
            status: status_label(report),
            summary: report.summary(),
            stages,
            report,
        }
    }

    /// Serializes the document as RFC 8785 canonical JSON.
    pub(crate) fn to_canonical_json(&self) -> Result<Vec<u8>, String> {
        serde_jcs::to_vec(self).map_err(|err| err.to_string())
    }
}

// ============================================================================
// SECTION: Labels
// ============================================================================

/// Returns `pass`, `fail`, or `cancelled` for a report.
pub(crate) fn status_label(report: &BootstrapReport) -> &'static str {
    if report.cancelled {
        "cancelled"
    } else if is_empty_run(report) {
        "empty"
    } else if report.findings.is_empty() {
        "pass"
    } else {
        "fail"
    }
}

/// Returns true when a finished run compiled no (fixture, generation) pair.
pub(crate) fn is_empty_run(report: &BootstrapReport) -> bool {
    !report.cancelled && report.summary().evaluated == 0
}

/// Warning printed for runs that verified nothing.
const EMPTY_RUN_WARNING: &str =
    "no (fixture, generation) pair was evaluated; check the build directory and filters";

/// Returns a short label for one matrix cell.
pub(crate) fn cell_label(cell: &Cell) -> &'static str {
    match cell {
        Cell::NotEvaluated {
            ..
        } => "not_evaluated",
        Cell::Skipped => "skipped",
        Cell::Evaluated {
            result,
            matches_expected,
        } => match &result.failure {
            Some(failure) => failure.kind.as_str(),
            None if *matches_expected => "pass",
            None => "mismatch",
        },
    }
}

/// Returns a label for a stage slot.
const fn slot_label(slot: &StageSlot) -> &'static str {
    match slot {
        StageSlot::Available {
            ..
        } => "available",
        StageSlot::Missing {
            ..
        } => "missing",
    }
}

/// Returns a label for an equivalence status.
const fn equivalence_label(status: &EquivalenceStatus) -> &'static str {
    match status {
        EquivalenceStatus::Equivalent => "equivalent",
        EquivalenceStatus::Diverged {
            ..
        } => "diverged",
        EquivalenceStatus::Inconclusive {
            ..
        } => "inconclusive",
    }
}

/// Generations that appear in any report row.
fn report_generations(report: &BootstrapReport) -> Vec<Generation> {
    let generations: BTreeSet<Generation> =
        report.cells.values().flat_map(|row| row.keys().copied()).collect();
    generations.into_iter().collect()
}

// ============================================================================
// SECTION: Text
// ============================================================================

/// Renders the stage listing used by `stages` and `run`.
pub(crate) fn render_stages(stages: &StageSet) -> String {
    let mut out = String::new();
    for (generation, slot) in stages.iter() {
        out.push_str(&format!(
            "{:<8} {:<10} {}\n",
            generation.to_string(),
            slot_label(slot),
            slot.path().display()
        ));
    }
    out
}

/// Renders the human-readable run summary.
pub(crate) fn render_text(stages: &StageSet, report: &BootstrapReport) -> String {
    let summary = report.summary();
    let mut out = String::new();
    out.push_str("stages:\n");
    for line in render_stages(stages).lines() {
        out.push_str(&format!("  {line}\n"));
    }

    let generations = report_generations(report);
    if !generations.is_empty() {
        out.push_str("matrix:\n");
        for (fixture, row) in &report.cells {
            let labels: Vec<String> = generations
                .iter()
                .map(|generation| {
                    let label = row.get(generation).map_or("-", cell_label);
                    format!("{generation}={label}")
                })
                .collect();
            out.push_str(&format!("  {fixture}: {}\n", labels.join(" ")));
        }
    }

    if !report.findings.is_empty() {
        out.push_str(&format!("findings ({}):\n", report.findings.len()));
        for finding in &report.findings {
            out.push_str(&format!(
                "  [{}] {} @ {}: {}\n",
                finding.class.as_str(),
                finding.fixture,
                finding.generation,
                finding.message
            ));
        }
    }

    out.push_str(&format!(
        "summary: {} fixtures, {} evaluated, {} passed, {} pipeline failures, {} output \
         mismatches, {} not evaluated, {} skipped\n",
        summary.fixtures,
        summary.evaluated,
        summary.passed,
        summary.pipeline_failures,
        summary.output_mismatches,
        summary.not_evaluated,
        summary.skipped
    ));
    out.push_str(&format!(
        "equivalence: {} checks, {} violations\n",
        summary.equivalence_checks, summary.equivalence_violations
    ));
    if is_empty_run(report) {
        out.push_str(&format!("warning: {EMPTY_RUN_WARNING}\n"));
    }
    out.push_str(&format!("result: {}\n", status_label(report)));
    out
}

// ============================================================================
// SECTION: Markdown
// ============================================================================

/// Renders the Markdown summary written next to the JSON report.
pub(crate) fn render_markdown(stages: &StageSet, report: &BootstrapReport) -> String {
    let summary = report.summary();
    let mut out = String::new();
    out.push_str("# Bootstrap Check Report\n\n");
    out.push_str("## Status\n\n");
    out.push_str(&format!("- Result: {}\n", status_label(report)));
    if is_empty_run(report) {
        out.push_str(&format!("- Warning: {EMPTY_RUN_WARNING}\n"));
    }
    out.push_str(&format!("- Fixtures: {}\n", summary.fixtures));
    out.push_str(&format!("- Evaluated: {}\n", summary.evaluated));
    out.push_str(&format!("- Passed: {}\n", summary.passed));
    out.push_str(&format!("- Pipeline failures: {}\n", summary.pipeline_failures));
    out.push_str(&format!("- Output mismatches: {}\n", summary.output_mismatches));
    out.push_str(&format!("- Not evaluated: {}\n", summary.not_evaluated));
    out.push_str(&format!("- Skipped: {}\n", summary.skipped));
    out.push_str(&format!(
        "- Equivalence violations: {} of {} checks\n",
        summary.equivalence_violations, summary.equivalence_checks
    ));

    out.push_str("\n## Stages\n\n");
    out.push_str("| Generation | Status | Path |\n|---|---|---|\n");
    for (generation, slot) in stages.iter() {
        out.push_str(&format!(
            "| {generation} | {} | `{}` |\n",
            slot_label(slot),
            slot.path().display()
        ));
    }

    let generations = report_generations(report);
    if !generations.is_empty() {
        out.push_str("\n## Matrix\n\n| Fixture |");
        for generation in &generations {
            out.push_str(&format!(" {generation} |"));
        }
        out.push_str("\n|---|");
        out.push_str(&"---|".repeat(generations.len()));
        out.push('\n');
        for (fixture, row) in &report.cells {
            out.push_str(&format!("| `{fixture}` |"));
            for generation in &generations {
                out.push_str(&format!(" {} |", row.get(generation).map_or("-", cell_label)));
            }
            out.push('\n');
        }
    }

    out.push_str("\n## Findings\n\n");
    if report.findings.is_empty() {
        out.push_str("- None\n");
    } else {
        for finding in &report.findings {
            out.push_str(&format!(
                "- **{}** `{}` @ {}: {}\n",
                finding.class.as_str(),
                finding.fixture,
                finding.generation,
                finding.message
            ));
        }
    }

    out.push_str("\n## Equivalence\n\n");
    if report.equivalence.is_empty() {
        out.push_str("- None\n");
    } else {
        for check in &report.equivalence {
            out.push_str(&format!(
                "- `{}` {} -> {}: {}\n",
                check.fixture,
                check.lower,
                check.upper,
                equivalence_label(&check.status)
            ));
        }
    }
    out
}
