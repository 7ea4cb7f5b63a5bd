// system-tests/src/config/env.rs
// ============================================================================
// Module: System Test Environment
// Description: Environment-backed configuration for Bootstrap Check system tests.
// Purpose: Reuse the harness's strict env parsing for test-only knobs.
// Dependencies: bootstrap-check-config
// ============================================================================

//! ## Overview
//! System-test knobs share the harness's parsing rules: values must be
//! valid UTF-8 and non-empty, and invalid values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use bootstrap_check_config::parse_bool;
use bootstrap_check_config::parse_bounded;
use bootstrap_check_config::read_env_nonempty;

pub use bootstrap_check_config::read_env_strict;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Upper bound accepted for the timeout override.
const MAX_TIMEOUT_SECS: u64 = 3_600;

/// Environment keys for system test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTestEnv {
    /// Run root for reports and scratch build trees.
    RunRoot,
    /// Minimum per-invocation timeout in seconds, for slow CI hosts.
    TimeoutSeconds,
    /// Allow reusing an existing run root (`true`/`false` or `1`/`0`).
    AllowOverwrite,
}

impl SystemTestEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RunRoot => "BOOTSTRAP_CHECK_SYSTEM_TEST_RUN_ROOT",
            Self::TimeoutSeconds => "BOOTSTRAP_CHECK_SYSTEM_TEST_TIMEOUT_SEC",
            Self::AllowOverwrite => "BOOTSTRAP_CHECK_SYSTEM_TEST_ALLOW_OVERWRITE",
        }
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Typed system test configuration derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemTestConfig {
    /// Run root override.
    pub run_root: Option<PathBuf>,
    /// Minimum per-invocation timeout.
    pub timeout: Option<Duration>,
    /// Allow reusing an existing run root.
    pub allow_overwrite: bool,
}

impl SystemTestConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when an environment value is not valid UTF-8, is empty,
    /// or fails validation (for example, an invalid timeout or boolean value).
    pub fn load() -> Result<Self, String> {
        let run_root = read_env_nonempty(SystemTestEnv::RunRoot.as_str())?.map(PathBuf::from);
        let timeout = read_env_nonempty(SystemTestEnv::TimeoutSeconds.as_str())?
            .map(|value| {
                parse_bounded(SystemTestEnv::TimeoutSeconds.as_str(), &value, MAX_TIMEOUT_SECS)
            })
            .transpose()?
            .map(Duration::from_secs);
        let allow_overwrite = read_env_nonempty(SystemTestEnv::AllowOverwrite.as_str())?
            .map(|value| parse_bool(SystemTestEnv::AllowOverwrite.as_str(), &value))
            .transpose()?
            .unwrap_or(false);
        Ok(Self {
            run_root,
            timeout,
            allow_overwrite,
        })
    }

    /// Returns the per-invocation timeout, never shorter than `requested`.
    ///
    /// Scenarios that expect a timeout pass their own short limit and do not
    /// call this.
    #[must_use]
    pub fn effective_timeout(&self, requested: Duration) -> Duration {
        self.timeout.map_or(requested, |timeout| timeout.max(requested))
    }
}
