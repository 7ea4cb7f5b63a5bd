// crates/bootstrap-check-config/src/env.rs
// ============================================================================
// Module: Bootstrap Check Environment
// Description: Environment-backed overrides for harness configuration.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Environment values sit between CLI flags and the config file in
//! precedence. They are parsed with strict UTF-8 enforcement; an invalid or
//! empty value fails closed instead of silently falling back.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use crate::config::MAX_JOBS;
use crate::config::MAX_TIMEOUT_SEC;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys read by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnv {
    /// Config file path override.
    ConfigPath,
    /// Build directory override.
    BuildDir,
    /// Fixtures directory override.
    FixturesDir,
    /// Per-invocation timeout override in seconds.
    TimeoutSeconds,
    /// Parallel job count override.
    Jobs,
    /// Keep artifacts after each run (`true`/`false` or `1`/`0`).
    KeepArtifacts,
    /// Host toolchain used for linking.
    Toolchain,
}

impl HarnessEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigPath => "BOOTSTRAP_CHECK_CONFIG",
            Self::BuildDir => "BOOTSTRAP_CHECK_BUILD_DIR",
            Self::FixturesDir => "BOOTSTRAP_CHECK_FIXTURES_DIR",
            Self::TimeoutSeconds => "BOOTSTRAP_CHECK_TIMEOUT_SEC",
            Self::Jobs => "BOOTSTRAP_CHECK_JOBS",
            Self::KeepArtifacts => "BOOTSTRAP_CHECK_KEEP_ARTIFACTS",
            Self::Toolchain => "CC",
        }
    }

    /// Returns every key, in documentation order.
    #[must_use]
    pub const fn all() -> [Self; 7] {
        [
            Self::ConfigPath,
            Self::BuildDir,
            Self::FixturesDir,
            Self::TimeoutSeconds,
            Self::Jobs,
            Self::KeepArtifacts,
            Self::Toolchain,
        ]
    }
}

// ============================================================================
// SECTION: Override Types
// ============================================================================

/// Typed configuration overrides read from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvOverrides {
    /// Build directory override.
    pub build_dir: Option<PathBuf>,
    /// Fixtures directory override.
    pub fixtures_dir: Option<PathBuf>,
    /// Timeout override in seconds.
    pub timeout_sec: Option<u64>,
    /// Job count override.
    pub jobs: Option<usize>,
    /// Keep-artifacts override.
    pub keep_artifacts: Option<bool>,
    /// Toolchain program override.
    pub toolchain: Option<String>,
}

impl EnvOverrides {
    /// Loads overrides from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when an environment value is not valid UTF-8, is empty,
    /// or fails validation (for example, an invalid timeout or boolean value).
    pub fn load() -> Result<Self, String> {
        let build_dir = read_env_nonempty(HarnessEnv::BuildDir.as_str())?.map(PathBuf::from);
        let fixtures_dir = read_env_nonempty(HarnessEnv::FixturesDir.as_str())?.map(PathBuf::from);
        let timeout_sec = read_env_nonempty(HarnessEnv::TimeoutSeconds.as_str())?
            .map(|value| {
                parse_bounded(HarnessEnv::TimeoutSeconds.as_str(), &value, MAX_TIMEOUT_SEC)
            })
            .transpose()?;
        let jobs = read_env_nonempty(HarnessEnv::Jobs.as_str())?
            .map(|value| parse_bounded(HarnessEnv::Jobs.as_str(), &value, MAX_JOBS as u64))
            .transpose()?
            .map(|jobs| usize::try_from(jobs).unwrap_or(MAX_JOBS));
        let keep_artifacts = read_env_nonempty(HarnessEnv::KeepArtifacts.as_str())?
            .map(|value| parse_bool(HarnessEnv::KeepArtifacts.as_str(), &value))
            .transpose()?;
        let toolchain = read_env_nonempty(HarnessEnv::Toolchain.as_str())?;
        Ok(Self {
            build_dir,
            fixtures_dir,
            timeout_sec,
            jobs,
            keep_artifacts,
            toolchain,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, String> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| format!("{name} must be valid UTF-8"))
    })
}

/// Reads an environment variable and rejects empty values.
///
/// # Errors
///
/// Returns an error when the variable is set but empty or whitespace.
pub fn read_env_nonempty(name: &str) -> Result<Option<String>, String> {
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => Err(format!("{name} must not be empty")),
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Parses a positive integer no larger than `max`.
///
/// # Errors
///
/// Returns an error when the value is non-numeric, zero, or above `max`.
pub fn parse_bounded(name: &str, raw: &str, max: u64) -> Result<u64, String> {
    let value: u64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("{name} must be a positive integer"))?;
    if value == 0 {
        return Err(format!("{name} must be greater than zero"));
    }
    if value > max {
        return Err(format!("{name} must be at most {max}"));
    }
    Ok(value)
}

/// Parses a boolean literal (`true`/`false` or `1`/`0`).
///
/// # Errors
///
/// Returns an error when the value is not a recognized boolean literal.
pub fn parse_bool(name: &str, raw: &str) -> Result<bool, String> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        return Ok(true);
    }
    if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        return Ok(false);
    }
    Err(format!("{name} must be 1, 0, true, or false"))
}
