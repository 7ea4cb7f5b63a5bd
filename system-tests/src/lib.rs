// system-tests/src/lib.rs
// ============================================================================
// Module: Bootstrap Check System Tests Library
// Description: Shared configuration and fake toolchains for system test scenarios.
// Purpose: Provide common utilities for Bootstrap Check system-test binaries.
// Dependencies: bootstrap-check-config, bootstrap-check-core, tempfile
// ============================================================================

//! ## Overview
//! This crate hosts shared configuration and the shell-script build trees
//! used by the Bootstrap Check system-tests binaries in `system-tests/tests`.
//! Scenarios run real child processes, so they are gated behind the
//! `system-tests` feature.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
#[cfg(unix)]
pub mod toolchain;
