// crates/bootstrap-check-config/src/config.rs
// ============================================================================
// Module: Bootstrap Check Configuration
// Description: Configuration loading and validation for the harness.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: bootstrap-check-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Unknown keys are rejected. The default file is optional: when
//! `bootstrap-check.toml` is absent, built-in defaults apply. An explicitly
//! named file that cannot be read fails closed.
//!
//! Precedence, strongest first: CLI flags (applied by the caller),
//! environment overrides ([`EnvOverrides`]), the config file, defaults.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use bootstrap_check_core::ArgTemplate;
use bootstrap_check_core::FixtureLayout;
use bootstrap_check_core::PipelineSettings;
use bootstrap_check_core::TemplateRole;
use bootstrap_check_core::runtime::discovery::DEFAULT_EXPECTED_EXTENSION;
use bootstrap_check_core::runtime::discovery::DEFAULT_MAX_GENERATION;
use bootstrap_check_core::runtime::discovery::DEFAULT_SOURCE_EXTENSION;
use bootstrap_check_core::runtime::discovery::DEFAULT_STAGE_BASE_NAME;
use bootstrap_check_core::runtime::pipeline::DEFAULT_TOOLCHAIN;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::env::EnvOverrides;
use crate::env::HarnessEnv;
use crate::env::read_env_nonempty;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "bootstrap-check.toml";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default build directory.
const DEFAULT_BUILD_DIR: &str = "build";
/// Default fixtures directory.
const DEFAULT_FIXTURES_DIR: &str = "tests";
/// Artifact subdirectory of the build directory when none is configured.
const DEFAULT_ARTIFACT_SUBDIR: &str = "bootstrap-check";
/// Default per-invocation timeout in seconds.
const DEFAULT_TIMEOUT_SEC: u64 = 60;
/// Maximum per-invocation timeout in seconds.
pub(crate) const MAX_TIMEOUT_SEC: u64 = 86_400;
/// Maximum parallel jobs.
pub(crate) const MAX_JOBS: usize = 256;
/// Maximum generation probed.
pub(crate) const MAX_GENERATION_LIMIT: u32 = 64;
/// Maximum template words per argument list.
const MAX_TEMPLATE_WORDS: usize = 128;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Bootstrap Check configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Build directory layout.
    #[serde(default)]
    pub build: BuildConfig,
    /// Fixture discovery.
    #[serde(default)]
    pub fixtures: FixturesConfig,
    /// Compiler-under-test arguments.
    #[serde(default)]
    pub compiler: CompilerConfig,
    /// Host toolchain used for linking.
    #[serde(default)]
    pub toolchain: ToolchainConfig,
    /// Execution bounds.
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Structured event output.
    #[serde(default)]
    pub events: EventsConfig,
    /// File the configuration was read from, when any (not serialized).
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Build directory layout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Directory holding the generation binaries.
    #[serde(default = "default_build_dir")]
    pub dir: PathBuf,
    /// File name of generation 1; later generations append `.stage<N>`.
    #[serde(default = "default_stage_base_name")]
    pub stage_base_name: String,
    /// Highest generation probed.
    #[serde(default = "default_max_generation")]
    pub max_generation: u32,
    /// Artifact directory (defaults to `<dir>/bootstrap-check`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_dir: Option<PathBuf>,
    /// Keep objects and executables after each run.
    #[serde(default = "default_true")]
    pub keep_artifacts: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            dir: default_build_dir(),
            stage_base_name: default_stage_base_name(),
            max_generation: default_max_generation(),
            artifact_dir: None,
            keep_artifacts: true,
        }
    }
}

impl BuildConfig {
    /// Validates build settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_value("build.dir", &self.dir)?;
        if let Some(artifact_dir) = &self.artifact_dir {
            validate_path_value("build.artifact_dir", artifact_dir)?;
        }
        validate_file_name("build.stage_base_name", &self.stage_base_name)?;
        if !(1 ..= MAX_GENERATION_LIMIT).contains(&self.max_generation) {
            return Err(ConfigError::Invalid(format!(
                "build.max_generation must be between 1 and {MAX_GENERATION_LIMIT}"
            )));
        }
        Ok(())
    }
}

/// Fixture discovery settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FixturesConfig {
    /// Directory walked for fixtures.
    #[serde(default = "default_fixtures_dir")]
    pub dir: PathBuf,
    /// Source file extension without the dot.
    #[serde(default = "default_source_extension")]
    pub source_extension: String,
    /// Expected-output file extension without the dot.
    #[serde(default = "default_expected_extension")]
    pub expected_extension: String,
}

impl Default for FixturesConfig {
    fn default() -> Self {
        Self {
            dir: default_fixtures_dir(),
            source_extension: default_source_extension(),
            expected_extension: default_expected_extension(),
        }
    }
}

impl FixturesConfig {
    /// Validates fixture settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_value("fixtures.dir", &self.dir)?;
        validate_extension("fixtures.source_extension", &self.source_extension)?;
        validate_extension("fixtures.expected_extension", &self.expected_extension)?;
        if self.source_extension == self.expected_extension {
            return Err(ConfigError::Invalid(
                "fixtures.source_extension and fixtures.expected_extension must differ"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the discovery layout.
    #[must_use]
    pub fn layout(&self) -> FixtureLayout {
        FixtureLayout {
            source_extension: self.source_extension.clone(),
            expected_extension: self.expected_extension.clone(),
        }
    }
}

/// Compiler-under-test argument template.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    /// Argument words with `{source}` and `{object}` placeholders.
    #[serde(default = "default_compile_args")]
    pub args: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            args: default_compile_args(),
        }
    }
}

impl CompilerConfig {
    /// Parses the argument template.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the template is malformed.
    pub fn template(&self) -> Result<ArgTemplate, ConfigError> {
        parse_template("compiler.args", TemplateRole::Compile, &self.args)
    }
}

/// Host toolchain settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ToolchainConfig {
    /// Toolchain program (path or name resolved through `PATH`).
    #[serde(default = "default_toolchain")]
    pub program: String,
    /// Argument words with `{object}` and `{executable}` placeholders.
    #[serde(default = "default_link_args")]
    pub args: Vec<String>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            program: default_toolchain(),
            args: default_link_args(),
        }
    }
}

impl ToolchainConfig {
    /// Parses the argument template.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the template is malformed.
    pub fn template(&self) -> Result<ArgTemplate, ConfigError> {
        parse_template("toolchain.args", TemplateRole::Link, &self.args)
    }

    /// Validates toolchain settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_value("toolchain.program", Path::new(&self.program))?;
        self.template().map(|_| ())
    }
}

/// Execution bounds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Per-invocation timeout in seconds.
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: u64,
    /// Maximum pipelines run in parallel.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_sec: default_timeout_sec(),
            jobs: default_jobs(),
        }
    }
}

impl ExecutionConfig {
    /// Validates execution bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1 ..= MAX_TIMEOUT_SEC).contains(&self.timeout_sec) {
            return Err(ConfigError::Invalid(format!(
                "execution.timeout_sec must be between 1 and {MAX_TIMEOUT_SEC}"
            )));
        }
        if !(1 ..= MAX_JOBS).contains(&self.jobs) {
            return Err(ConfigError::Invalid(format!(
                "execution.jobs must be between 1 and {MAX_JOBS}"
            )));
        }
        Ok(())
    }

    /// Returns the per-invocation timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec)
    }
}

/// Where structured events are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSinkKind {
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to `events.path`.
    File,
    /// No event output.
    #[default]
    None,
}

/// Structured event settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EventsConfig {
    /// Event sink selection.
    #[serde(default)]
    pub sink: EventSinkKind,
    /// Event log path, required for the file sink.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl EventsConfig {
    /// Validates event settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (EventSinkKind::File, None) => Err(ConfigError::Invalid(
                "events.path is required when events.sink = \"file\"".to_string(),
            )),
            (_, Some(path)) => validate_path_value("events.path", path),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl HarnessConfig {
    /// Loads configuration using the default resolution rules.
    ///
    /// The path is `path` when given, else `BOOTSTRAP_CHECK_CONFIG`, else
    /// [`DEFAULT_CONFIG_NAME`]. Only the default file may be absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = match fs::read(&resolved) {
            Ok(bytes) => bytes,
            Err(err) if !explicit && err.kind() == io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(err) => {
                return Err(ConfigError::Io(format!("{}: {err}", resolved.display())));
            }
        };
        let mut config = Self::from_bytes(&bytes)?;
        config.source = Some(resolved);
        Ok(config)
    }

    /// Parses and validates configuration from raw file bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bytes are oversized, not UTF-8, not
    /// valid TOML, or fail validation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides, then revalidates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the overridden configuration is invalid.
    pub fn apply_env(&mut self, env: &EnvOverrides) -> Result<(), ConfigError> {
        if let Some(dir) = &env.build_dir {
            self.build.dir.clone_from(dir);
        }
        if let Some(dir) = &env.fixtures_dir {
            self.fixtures.dir.clone_from(dir);
        }
        if let Some(timeout_sec) = env.timeout_sec {
            self.execution.timeout_sec = timeout_sec;
        }
        if let Some(jobs) = env.jobs {
            self.execution.jobs = jobs;
        }
        if let Some(keep) = env.keep_artifacts {
            self.build.keep_artifacts = keep;
        }
        if let Some(program) = &env.toolchain {
            self.toolchain.program.clone_from(program);
        }
        self.validate()
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.build.validate()?;
        self.fixtures.validate()?;
        self.compiler.template()?;
        self.toolchain.validate()?;
        self.execution.validate()?;
        self.events.validate()?;
        Ok(())
    }

    /// Returns the artifact directory, defaulting under the build directory.
    #[must_use]
    pub fn artifact_dir(&self) -> PathBuf {
        self.build
            .artifact_dir
            .clone()
            .unwrap_or_else(|| self.build.dir.join(DEFAULT_ARTIFACT_SUBDIR))
    }

    /// Builds the orchestrator settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an argument template is malformed.
    pub fn pipeline_settings(&self) -> Result<PipelineSettings, ConfigError> {
        let mut settings = PipelineSettings::new(self.artifact_dir());
        settings.toolchain = PathBuf::from(&self.toolchain.program);
        settings.compile_args = self.compiler.template()?;
        settings.link_args = self.toolchain.template()?;
        settings.timeout = self.execution.timeout();
        settings.keep_artifacts = self.build.keep_artifacts;
        Ok(settings)
    }

    /// Renders the effective configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default build directory.
fn default_build_dir() -> PathBuf {
    PathBuf::from(DEFAULT_BUILD_DIR)
}

/// Default stage base name.
fn default_stage_base_name() -> String {
    DEFAULT_STAGE_BASE_NAME.to_string()
}

/// Default highest generation.
const fn default_max_generation() -> u32 {
    DEFAULT_MAX_GENERATION
}

/// Serde default for `true` flags.
const fn default_true() -> bool {
    true
}

/// Default fixtures directory.
fn default_fixtures_dir() -> PathBuf {
    PathBuf::from(DEFAULT_FIXTURES_DIR)
}

/// Default source extension.
fn default_source_extension() -> String {
    DEFAULT_SOURCE_EXTENSION.to_string()
}

/// Default expected-output extension.
fn default_expected_extension() -> String {
    DEFAULT_EXPECTED_EXTENSION.to_string()
}

/// Default compile template words.
fn default_compile_args() -> Vec<String> {
    ArgTemplate::default_compile().words().to_vec()
}

/// Default toolchain program.
fn default_toolchain() -> String {
    DEFAULT_TOOLCHAIN.to_string()
}

/// Default link template words.
fn default_link_args() -> Vec<String> {
    ArgTemplate::default_link().words().to_vec()
}

/// Default timeout in seconds.
const fn default_timeout_sec() -> u64 {
    DEFAULT_TIMEOUT_SEC
}

/// Default job count.
const fn default_jobs() -> usize {
    1
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment; `true` when explicit.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    let env_path = read_env_nonempty(HarnessEnv::ConfigPath.as_str())
        .map_err(ConfigError::Invalid)?;
    if let Some(env_path) = env_path {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path value against emptiness and length limits.
fn validate_path_value(field: &str, path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a bare file name (no separators).
fn validate_file_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if value.contains('/') || value.contains('\\') || value == "." || value == ".." {
        return Err(ConfigError::Invalid(format!("{field} must be a file name")));
    }
    if value.len() > MAX_PATH_COMPONENT_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Ok(())
}

/// Validates an extension (no dot, no separators).
fn validate_extension(field: &str, value: &str) -> Result<(), ConfigError> {
    validate_file_name(field, value)?;
    if value.contains('.') {
        return Err(ConfigError::Invalid(format!("{field} must not contain '.'")));
    }
    Ok(())
}

/// Parses a template, mapping errors to the config field.
fn parse_template(
    field: &str,
    role: TemplateRole,
    words: &[String],
) -> Result<ArgTemplate, ConfigError> {
    if words.len() > MAX_TEMPLATE_WORDS {
        return Err(ConfigError::Invalid(format!(
            "{field} exceeds {MAX_TEMPLATE_WORDS} words"
        )));
    }
    ArgTemplate::parse(role, words.iter().cloned())
        .map_err(|err| ConfigError::Invalid(format!("{field}: {err}")))
}
