// crates/bootstrap-check-cli/src/main.rs
// ============================================================================
// Module: Bootstrap Check CLI Entry Point
// Description: Command dispatcher for bootstrap-chain verification runs.
// Purpose: Run the stage x fixture matrix and report findings with exit codes.
// Dependencies: clap, bootstrap-check-config, bootstrap-check-core, tokio
// ============================================================================

//! ## Overview
//! `bootstrap-check` resolves configuration (flags, then environment, then
//! `bootstrap-check.toml`, then defaults), probes the build directory for
//! compiler generations, discovers fixtures, and runs the bootstrap matrix.
//!
//! Exit codes: `0` clean run, `1` findings, `2` usage or configuration
//! errors, `130` interrupted. Ctrl-C cancels the run; every outstanding child
//! process is killed before the report is printed.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod render;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use bootstrap_check_config::EnvOverrides;
use bootstrap_check_config::EventSinkKind;
use bootstrap_check_config::EventsConfig;
use bootstrap_check_config::HarnessConfig;
use bootstrap_check_core::BootstrapReport;
use bootstrap_check_core::CancelHandle;
use bootstrap_check_core::FileEventSink;
use bootstrap_check_core::FixtureCatalog;
use bootstrap_check_core::FixtureId;
use bootstrap_check_core::Generation;
use bootstrap_check_core::HarnessEventSink;
use bootstrap_check_core::MatrixEvaluator;
use bootstrap_check_core::MatrixFilter;
use bootstrap_check_core::NoopEventSink;
use bootstrap_check_core::PipelineOrchestrator;
use bootstrap_check_core::ProcessRunner;
use bootstrap_check_core::StageSet;
use bootstrap_check_core::StderrEventSink;
use bootstrap_check_core::runtime::discover_fixtures;
use bootstrap_check_core::runtime::probe_stages;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use serde::Serialize;
use thiserror::Error;

use crate::render::RunDocument;
use crate::render::is_empty_run;
use crate::render::render_markdown;
use crate::render::render_stages;
use crate::render::render_text;

// ============================================================================
// SECTION: Exit Codes
// ============================================================================

/// Exit status when the run produced at least one finding.
const EXIT_FINDINGS: u8 = 1;
/// Exit status for usage, configuration, and I/O errors.
const EXIT_USAGE: u8 = 2;
/// Exit status when the run was interrupted.
const EXIT_CANCELLED: u8 = 130;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "bootstrap-check",
    version,
    about = "Verify a self-hosting compiler's bootstrap chain",
    disable_help_subcommand = true
)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every fixture through every available generation.
    Run(RunCommand),
    /// List probed compiler generations.
    Stages(StagesCommand),
    /// List discovered fixtures and orphaned sources.
    Fixtures(FixturesCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the effective configuration.
    Validate(ConfigValidateCommand),
}

/// Output formats for structured commands.
#[derive(ValueEnum, Copy, Clone, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// Canonical JSON output.
    Json,
}

/// Config and layout flags shared by every command that reads the build tree.
#[derive(Args, Debug, Default)]
struct LayoutArgs {
    /// Config file path (defaults to bootstrap-check.toml or `BOOTSTRAP_CHECK_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Directory holding the generation binaries.
    #[arg(long, value_name = "DIR")]
    build_dir: Option<PathBuf>,
    /// Directory walked for fixtures.
    #[arg(long, value_name = "DIR")]
    fixtures_dir: Option<PathBuf>,
}

/// Arguments for `run`.
#[derive(Args, Debug, Default)]
struct RunCommand {
    /// Shared config and layout flags.
    #[command(flatten)]
    layout: LayoutArgs,
    /// Host toolchain used for linking (overrides `CC`).
    #[arg(long, value_name = "PATH")]
    toolchain: Option<String>,
    /// Per-invocation timeout in seconds.
    #[arg(long, value_name = "SECONDS")]
    timeout_sec: Option<u64>,
    /// Maximum pipelines run in parallel.
    #[arg(long, value_name = "N")]
    jobs: Option<usize>,
    /// Restrict the run to a fixture id (repeatable).
    #[arg(long = "fixture", value_name = "ID")]
    fixtures: Vec<String>,
    /// Restrict the run to a generation number (repeatable).
    #[arg(long = "generation", value_name = "N")]
    generations: Vec<u32>,
    /// Delete objects and executables after each pipeline.
    #[arg(long)]
    discard_artifacts: bool,
    /// Write the canonical JSON report here, plus a Markdown summary beside it.
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
    /// Stdout format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Arguments for `stages`.
#[derive(Args, Debug)]
struct StagesCommand {
    /// Shared config and layout flags.
    #[command(flatten)]
    layout: LayoutArgs,
    /// Stdout format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Arguments for `fixtures`.
#[derive(Args, Debug)]
struct FixturesCommand {
    /// Shared config and layout flags.
    #[command(flatten)]
    layout: LayoutArgs,
    /// Stdout format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Config file path (defaults to bootstrap-check.toml or `BOOTSTRAP_CHECK_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Print the effective configuration as TOML.
    #[arg(long)]
    print: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(command) => command_run(&command).await,
        Commands::Stages(command) => command_stages(&command),
        Commands::Fixtures(command) => command_fixtures(&command),
        Commands::Config {
            command,
        } => command_config(command),
    }
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes the `run` command.
async fn command_run(command: &RunCommand) -> CliResult<ExitCode> {
    let mut config = load_config(&command.layout)?;
    apply_run_overrides(&mut config, command)?;

    let stages = probe(&config);
    let catalog = discover(&config)?;
    let filter = build_filter(command, &catalog, &stages)?;
    let settings = config
        .pipeline_settings()
        .map_err(|err| CliError::new(format!("invalid configuration: {err}")))?;
    let sink = build_event_sink(&config.events)?;
    let orchestrator = PipelineOrchestrator::new(Arc::new(ProcessRunner::new()), sink, settings);
    let evaluator = MatrixEvaluator::new(orchestrator, config.execution.jobs);

    let (handle, cancel) = CancelHandle::new();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = write_stderr_line("interrupted: terminating outstanding processes");
            handle.cancel();
        }
    });
    let report = evaluator.evaluate(&stages, &catalog.fixtures, &filter, &cancel).await;
    interrupt.abort();

    let document = RunDocument::new(&stages, &report);
    if let Some(path) = &command.report {
        write_report_artifacts(path, &document, &render_markdown(&stages, &report))?;
    }
    match command.format {
        OutputFormat::Text => {
            write_stdout(&render_text(&stages, &report))?;
        }
        OutputFormat::Json => {
            let bytes = document.to_canonical_json().map_err(|err| {
                CliError::new(format!("failed to serialize report: {err}"))
            })?;
            write_stdout_bytes_with_newline(&bytes)?;
        }
    }
    Ok(exit_code_for(&report))
}

/// Applies `run` flags on top of file and environment configuration.
fn apply_run_overrides(config: &mut HarnessConfig, command: &RunCommand) -> CliResult<()> {
    if let Some(program) = &command.toolchain {
        config.toolchain.program.clone_from(program);
    }
    if let Some(timeout_sec) = command.timeout_sec {
        config.execution.timeout_sec = timeout_sec;
    }
    if let Some(jobs) = command.jobs {
        config.execution.jobs = jobs;
    }
    if command.discard_artifacts {
        config.build.keep_artifacts = false;
    }
    config.validate().map_err(|err| CliError::new(format!("invalid configuration: {err}")))
}

/// Builds the matrix filter, rejecting unknown fixtures and generations.
///
/// A generation is unknown when it lies beyond `max_generation`; a
/// missing stage within range is accepted and reported as not evaluated.
fn build_filter(
    command: &RunCommand,
    catalog: &FixtureCatalog,
    stages: &StageSet,
) -> CliResult<MatrixFilter> {
    let mut filter = MatrixFilter::default();
    for raw in &command.fixtures {
        let id = FixtureId::new(raw.as_str());
        if !catalog.fixtures.iter().any(|fixture| fixture.id == id) {
            return Err(CliError::new(format!("unknown fixture `{raw}`")));
        }
        filter.fixtures.push(id);
    }
    for &raw in &command.generations {
        let generation = Generation::from_raw(raw)
            .ok_or_else(|| CliError::new("generation numbers start at 1".to_string()))?;
        if stages.get(generation).is_none() {
            return Err(CliError::new(format!(
                "unknown generation `{raw}`: max_generation is {}",
                stages.len()
            )));
        }
        filter.generations.push(generation);
    }
    Ok(filter)
}

/// Maps a finished report to the process exit code.
fn exit_code_for(report: &BootstrapReport) -> ExitCode {
    if report.cancelled {
        ExitCode::from(EXIT_CANCELLED)
    } else if is_empty_run(report) {
        ExitCode::from(EXIT_USAGE)
    } else if report.findings.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FINDINGS)
    }
}

/// Writes the JSON report and its sibling Markdown summary.
fn write_report_artifacts(
    path: &Path,
    document: &RunDocument<'_>,
    markdown: &str,
) -> CliResult<()> {
    let summary_path = markdown_path(path)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            CliError::new(format!("failed to create {}: {err}", parent.display()))
        })?;
    }
    let bytes = document
        .to_canonical_json()
        .map_err(|err| CliError::new(format!("failed to serialize report: {err}")))?;
    fs::write(path, bytes)
        .map_err(|err| CliError::new(format!("failed to write {}: {err}", path.display())))?;
    fs::write(&summary_path, markdown).map_err(|err| {
        CliError::new(format!("failed to write {}: {err}", summary_path.display()))
    })?;
    Ok(())
}

/// Returns the Markdown summary path for a report path.
fn markdown_path(path: &Path) -> CliResult<PathBuf> {
    if path.extension().is_some_and(|extension| extension == "md") {
        return Err(CliError::new(format!(
            "report path {} would collide with its Markdown summary",
            path.display()
        )));
    }
    Ok(path.with_extension("md"))
}

/// Builds the structured event sink selected by configuration.
fn build_event_sink(events: &EventsConfig) -> CliResult<Arc<dyn HarnessEventSink>> {
    match events.sink {
        EventSinkKind::Stderr => Ok(Arc::new(StderrEventSink)),
        EventSinkKind::None => Ok(Arc::new(NoopEventSink)),
        EventSinkKind::File => {
            let path = events
                .path
                .as_deref()
                .ok_or_else(|| CliError::new("events.path is required".to_string()))?;
            let sink = FileEventSink::new(path).map_err(|err| {
                CliError::new(format!("failed to open event log {}: {err}", path.display()))
            })?;
            Ok(Arc::new(sink))
        }
    }
}

// ============================================================================
// SECTION: Listing Commands
// ============================================================================

/// Executes the `stages` command.
fn command_stages(command: &StagesCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.layout)?;
    let stages = probe(&config);
    match command.format {
        OutputFormat::Text => write_stdout(&render_stages(&stages))?,
        OutputFormat::Json => write_canonical_json(&stages)?,
    }
    Ok(ExitCode::SUCCESS)
}

/// One fixture in the `fixtures` listing.
#[derive(Debug, Serialize)]
struct FixtureEntry<'a> {
    /// Fixture id.
    id: &'a FixtureId,
    /// Source path.
    source: &'a Path,
    /// Expected stdout length in bytes.
    expected_bytes: usize,
}

/// JSON document for the `fixtures` listing.
#[derive(Debug, Serialize)]
struct FixtureListing<'a> {
    /// Paired fixtures.
    fixtures: Vec<FixtureEntry<'a>>,
    /// Sources without an expectation file.
    orphans: &'a [PathBuf],
}

/// Executes the `fixtures` command.
fn command_fixtures(command: &FixturesCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.layout)?;
    let catalog = discover(&config)?;
    match command.format {
        OutputFormat::Text => {
            let mut out = String::new();
            for fixture in &catalog.fixtures {
                out.push_str(&format!("{}\t{}\n", fixture.id, fixture.source.display()));
            }
            for orphan in &catalog.orphans {
                out.push_str(&format!("orphan\t{}\n", orphan.display()));
            }
            write_stdout(&out)?;
        }
        OutputFormat::Json => {
            let listing = FixtureListing {
                fixtures: catalog
                    .fixtures
                    .iter()
                    .map(|fixture| FixtureEntry {
                        id: &fixture.id,
                        source: &fixture.source,
                        expected_bytes: fixture.expected_stdout.len(),
                    })
                    .collect(),
                orphans: &catalog.orphans,
            };
            write_canonical_json(&listing)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Command
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let layout = LayoutArgs {
        config: command.config.clone(),
        ..LayoutArgs::default()
    };
    let config = load_config(&layout)?;
    if command.print {
        let rendered = config
            .to_toml()
            .map_err(|err| CliError::new(format!("failed to render config: {err}")))?;
        write_stdout(&rendered)?;
    } else {
        let origin = config
            .source
            .as_ref()
            .map_or_else(|| "built-in defaults".to_string(), |path| path.display().to_string());
        write_stdout(&format!("config ok ({origin})\n"))?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Shared Helpers
// ============================================================================

/// Loads configuration and applies environment and layout flag overrides.
fn load_config(layout: &LayoutArgs) -> CliResult<HarnessConfig> {
    let mut config = HarnessConfig::load(layout.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let env = EnvOverrides::load()
        .map_err(|err| CliError::new(format!("invalid environment: {err}")))?;
    config
        .apply_env(&env)
        .map_err(|err| CliError::new(format!("invalid configuration: {err}")))?;
    if let Some(dir) = &layout.build_dir {
        config.build.dir.clone_from(dir);
    }
    if let Some(dir) = &layout.fixtures_dir {
        config.fixtures.dir.clone_from(dir);
    }
    config.validate().map_err(|err| CliError::new(format!("invalid configuration: {err}")))?;
    Ok(config)
}

/// Probes the configured build directory.
fn probe(config: &HarnessConfig) -> StageSet {
    probe_stages(&config.build.dir, &config.build.stage_base_name, config.build.max_generation)
}

/// Discovers fixtures under the configured directory.
fn discover(config: &HarnessConfig) -> CliResult<FixtureCatalog> {
    discover_fixtures(&config.fixtures.dir, &config.fixtures.layout())
        .map_err(|err| CliError::new(format!("fixture discovery failed: {err}")))
}

/// Writes canonical JSON to stdout.
fn write_canonical_json<T: Serialize>(value: &T) -> CliResult<()> {
    let bytes = serde_jcs::to_vec(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    write_stdout_bytes_with_newline(&bytes)
}

/// Writes text to stdout as-is.
fn write_stdout(text: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes()).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes raw bytes to stdout with a trailing newline.
fn write_stdout_bytes_with_newline(bytes: &[u8]) -> CliResult<()> {
    let mut buffer = bytes.to_vec();
    buffer.push(b'\n');
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&buffer).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write {stream}: {error}")
}

/// Emits an error message to stderr and returns the usage exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(&format!("bootstrap-check: {message}"));
    ExitCode::from(EXIT_USAGE)
}
