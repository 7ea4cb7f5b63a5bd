// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for Bootstrap Check system-tests.
// Purpose: Provide evaluator harnesses, timeouts, and artifact utilities.
// Dependencies: system-tests, bootstrap-check-core
// ============================================================================

//! ## Overview
//! Shared helpers for Bootstrap Check system-tests.
//! Invariants:
//! - Scenarios that spawn processes hold the harness lock for their whole run.
//! - Every scenario writes a summary under its run root.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod artifacts;
pub mod harness;
pub mod timeouts;
