// system-tests/tests/helpers/artifacts.rs
// ============================================================================
// Module: Scenario Artifacts
// Description: Per-scenario run roots, bootstrap reports, and summaries.
// Purpose: Leave a reviewable report and matrix tally behind every scenario.
// Dependencies: system-tests, bootstrap-check-core, serde, serde_jcs
// ============================================================================

//! ## Overview
//! Each scenario records into its own run root:
//! - `report.json`: the canonical bootstrap report of the recorded run.
//! - `summary.json` and `summary.md`: status, matrix counts, and findings.
//!
//! An existing root is refused unless overwriting is explicitly allowed. A
//! scenario that panics before finishing still leaves a `panic` summary.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use bootstrap_check_core::BootstrapReport;
use bootstrap_check_core::ReportSummary;
use serde::Serialize;
use system_tests::config::SystemTestConfig;
use system_tests::config::SystemTestEnv;

/// File name of the recorded bootstrap report.
const REPORT_FILE: &str = "report.json";

// ============================================================================
// SECTION: Summary
// ============================================================================

#[derive(Debug, Serialize)]
struct ScenarioSummary {
    scenario: String,
    status: String,
    duration_ms: u128,
    cancelled: bool,
    matrix: Option<ReportSummary>,
    findings: Vec<String>,
    notes: Vec<String>,
    artifacts: Vec<String>,
}

fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

fn scenario_root(scenario: &str) -> io::Result<PathBuf> {
    let config = SystemTestConfig::load().map_err(io::Error::other)?;
    let root = config.run_root.map_or_else(
        || PathBuf::from("target/system-tests").join(format!("run_{}", now_millis())),
        |run_root| run_root,
    );
    let root = root.join(scenario);
    if root.exists() && !config.allow_overwrite {
        return Err(io::Error::other(format!(
            "run root {} already exists; set {} to reuse it",
            root.display(),
            SystemTestEnv::AllowOverwrite.as_str()
        )));
    }
    fs::create_dir_all(&root)?;
    Ok(root)
}

fn write_canonical<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let bytes = serde_jcs::to_vec(value).map_err(|err| io::Error::other(err.to_string()))?;
    fs::write(path, bytes)
}

// ============================================================================
// SECTION: Recorder
// ============================================================================

/// Records one scenario's bootstrap report and final summary.
pub struct ScenarioRecorder {
    root: PathBuf,
    scenario: String,
    started_at_ms: u128,
    cancelled: bool,
    matrix: Option<ReportSummary>,
    findings: Vec<String>,
    artifacts: Vec<String>,
    finalized: bool,
}

impl ScenarioRecorder {
    /// Creates the run root for the named scenario.
    pub fn new(scenario: &str) -> io::Result<Self> {
        Ok(Self {
            root: scenario_root(scenario)?,
            scenario: scenario.to_string(),
            started_at_ms: now_millis(),
            cancelled: false,
            matrix: None,
            findings: Vec::new(),
            artifacts: Vec::new(),
            finalized: false,
        })
    }

    /// Returns the path the recorded report is written to.
    pub fn report_path(&self) -> PathBuf {
        self.root.join(REPORT_FILE)
    }

    /// Writes the report and keeps its counts and findings for the summary.
    ///
    /// Recording again replaces the previous report.
    pub fn record(&mut self, report: &BootstrapReport) -> io::Result<PathBuf> {
        let path = self.report_path();
        write_canonical(&path, report)?;
        self.cancelled = report.cancelled;
        self.matrix = Some(report.summary());
        self.findings = report
            .findings
            .iter()
            .map(|finding| {
                format!(
                    "[{}] {} @ {}: {}",
                    finding.class.as_str(),
                    finding.fixture,
                    finding.generation,
                    finding.message
                )
            })
            .collect();
        if !self.artifacts.iter().any(|name| name == REPORT_FILE) {
            self.artifacts.push(REPORT_FILE.to_string());
        }
        Ok(path)
    }

    /// Writes `summary.json` and `summary.md` for the scenario.
    pub fn finish(&mut self, status: &str, notes: Vec<String>) -> io::Result<()> {
        let mut artifacts = self.artifacts.clone();
        artifacts.extend(["summary.json".to_string(), "summary.md".to_string()]);
        let summary = ScenarioSummary {
            scenario: self.scenario.clone(),
            status: status.to_string(),
            duration_ms: now_millis().saturating_sub(self.started_at_ms),
            cancelled: self.cancelled,
            matrix: self.matrix,
            findings: self.findings.clone(),
            notes,
            artifacts,
        };
        write_canonical(&self.root.join("summary.json"), &summary)?;
        fs::write(self.root.join("summary.md"), summary_markdown(&summary))?;
        self.finalized = true;
        Ok(())
    }
}

impl Drop for ScenarioRecorder {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        let status = if std::thread::panicking() { "panic" } else { "unknown" };
        let _ = self.finish(status, vec!["scenario ended without a summary".to_string()]);
    }
}

// ============================================================================
// SECTION: Markdown
// ============================================================================

fn summary_markdown(summary: &ScenarioSummary) -> String {
    let mut out = String::new();
    out.push_str("# Bootstrap Check Scenario Summary\n\n");
    out.push_str("## Status\n\n");
    let _ = writeln!(out, "- Scenario: {}", summary.scenario);
    let _ = writeln!(out, "- Status: {}", summary.status);
    let _ = writeln!(out, "- Duration (ms): {}", summary.duration_ms);
    let _ = writeln!(out, "- Cancelled: {}", summary.cancelled);

    out.push_str("\n## Matrix\n\n");
    if let Some(matrix) = &summary.matrix {
        out.push_str("| Count | Value |\n|---|---|\n");
        for (label, value) in [
            ("fixtures", matrix.fixtures),
            ("generations", matrix.generations),
            ("evaluated", matrix.evaluated),
            ("passed", matrix.passed),
            ("pipeline failures", matrix.pipeline_failures),
            ("output mismatches", matrix.output_mismatches),
            ("not evaluated", matrix.not_evaluated),
            ("skipped", matrix.skipped),
            ("equivalence checks", matrix.equivalence_checks),
            ("equivalence violations", matrix.equivalence_violations),
        ] {
            let _ = writeln!(out, "| {label} | {value} |");
        }
    } else {
        out.push_str("- No report recorded\n");
    }

    for (heading, lines) in [
        ("Findings", &summary.findings),
        ("Notes", &summary.notes),
        ("Artifacts", &summary.artifacts),
    ] {
        let _ = write!(out, "\n## {heading}\n\n");
        if lines.is_empty() {
            out.push_str("- None\n");
        }
        for line in lines {
            let _ = writeln!(out, "- {line}");
        }
    }
    out
}
