// system-tests/tests/helpers/timeouts.rs
// ============================================================================
// Module: System Test Timeouts
// Description: Centralized timeout configuration with env overrides.
// Purpose: Keep system-test timeouts consistent and configurable across suites.
// ============================================================================

use std::time::Duration;

use system_tests::config::SystemTestConfig;
use system_tests::config::SystemTestEnv;

/// Returns the effective timeout, honoring the system-test timeout override.
/// The override acts as a minimum to avoid shortening explicitly longer test timeouts.
pub fn resolve_timeout(requested: Duration) -> Result<Duration, String> {
    SystemTestConfig::load()
        .map(|config| config.effective_timeout(requested))
        .map_err(|err| format!("{}: {err}", SystemTestEnv::TimeoutSeconds.as_str()))
}
