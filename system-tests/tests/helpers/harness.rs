// system-tests/tests/helpers/harness.rs
// ============================================================================
// Module: Evaluator Harness
// Description: Helpers for running the matrix evaluator against scripted build trees.
// Purpose: Provide deterministic evaluator setup and process serialization for tests.
// Dependencies: bootstrap-check-core, system-tests, tokio
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use bootstrap_check_core::BootstrapReport;
use bootstrap_check_core::CancelSignal;
use bootstrap_check_core::FixtureLayout;
use bootstrap_check_core::MatrixEvaluator;
use bootstrap_check_core::MatrixFilter;
use bootstrap_check_core::MemoryEventSink;
use bootstrap_check_core::PipelineOrchestrator;
use bootstrap_check_core::PipelineSettings;
use bootstrap_check_core::ProcessRunner;
use bootstrap_check_core::StageSet;
use bootstrap_check_core::runtime::discover_fixtures;
use bootstrap_check_core::runtime::discovery::DEFAULT_MAX_GENERATION;
use bootstrap_check_core::runtime::discovery::DEFAULT_STAGE_BASE_NAME;
use bootstrap_check_core::runtime::probe_stages;
use system_tests::toolchain::BuildTree;
use tokio::sync::Mutex;
use tokio::sync::MutexGuard;

use super::timeouts::resolve_timeout;

/// Serializes scenarios within a test binary.
///
/// A script written by one scenario must not be held open by a process
/// forked for another, or its exec fails with `ETXTBSY`.
static PROCESS_LOCK: Mutex<()> = Mutex::const_new(());

/// Acquires the process lock for the duration of a scenario.
pub async fn process_lock() -> MutexGuard<'static, ()> {
    PROCESS_LOCK.lock().await
}

/// Options for one evaluation of a build tree.
#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Per-invocation timeout.
    pub timeout: Duration,
    /// Parallel job count.
    pub jobs: usize,
    /// Keep artifacts after the pipeline finishes.
    pub keep_artifacts: bool,
    /// Matrix filter.
    pub filter: MatrixFilter,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            jobs: 1,
            keep_artifacts: true,
            filter: MatrixFilter::default(),
        }
    }
}

/// Evaluation output plus the events it recorded.
pub struct Evaluation {
    /// Stages probed from the build tree.
    pub stages: StageSet,
    /// Final report.
    pub report: BootstrapReport,
    /// Events recorded while evaluating.
    pub sink: Arc<MemoryEventSink>,
}

/// Builds an evaluator for `tree` using real child processes.
pub fn evaluator(
    tree: &BuildTree,
    options: &EvalOptions,
) -> (MatrixEvaluator, Arc<MemoryEventSink>) {
    let mut settings = PipelineSettings::new(tree.artifact_dir());
    settings.toolchain = tree.linker();
    settings.timeout = options.timeout;
    settings.keep_artifacts = options.keep_artifacts;
    let sink = Arc::new(MemoryEventSink::new());
    let orchestrator =
        PipelineOrchestrator::new(Arc::new(ProcessRunner::new()), sink.clone(), settings);
    (MatrixEvaluator::new(orchestrator, options.jobs), sink)
}

/// Probes stages, discovers fixtures, and evaluates the full matrix.
pub async fn evaluate_tree(
    tree: &BuildTree,
    options: &EvalOptions,
    cancel: &CancelSignal,
) -> Result<Evaluation, Box<dyn std::error::Error>> {
    let stages = probe_stages(&tree.build_dir(), DEFAULT_STAGE_BASE_NAME, DEFAULT_MAX_GENERATION);
    let catalog = discover_fixtures(&tree.fixtures_dir(), &FixtureLayout::default())?;
    let (evaluator, sink) = evaluator(tree, options);
    let report = evaluator.evaluate(&stages, &catalog.fixtures, &options.filter, cancel).await;
    Ok(Evaluation {
        stages,
        report,
        sink,
    })
}

/// Options with the system-test timeout override applied.
pub fn default_options() -> Result<EvalOptions, String> {
    let defaults = EvalOptions::default();
    Ok(EvalOptions {
        timeout: resolve_timeout(defaults.timeout)?,
        ..defaults
    })
}
