// crates/bootstrap-check-config/src/lib.rs
// ============================================================================
// Module: Bootstrap Check Config Library
// Description: Configuration model, loader, and environment overrides.
// Purpose: Resolve harness settings from file, environment, and defaults.
// Dependencies: bootstrap-check-core, serde, toml
// ============================================================================

//! ## Overview
//! Bootstrap Check Config turns a `bootstrap-check.toml` file plus
//! `BOOTSTRAP_CHECK_*` environment overrides into a validated
//! [`HarnessConfig`], and from there into core [`PipelineSettings`].
//! Invariants:
//! - Unknown keys are rejected.
//! - Validation runs after every layer is applied.
//!
//! [`PipelineSettings`]: bootstrap_check_core::PipelineSettings

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::BuildConfig;
pub use config::CompilerConfig;
pub use config::ConfigError;
pub use config::DEFAULT_CONFIG_NAME;
pub use config::EventSinkKind;
pub use config::EventsConfig;
pub use config::ExecutionConfig;
pub use config::FixturesConfig;
pub use config::HarnessConfig;
pub use config::ToolchainConfig;
pub use env::EnvOverrides;
pub use env::HarnessEnv;
pub use env::parse_bool;
pub use env::parse_bounded;
pub use env::read_env_nonempty;
pub use env::read_env_strict;
