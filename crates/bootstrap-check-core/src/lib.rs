// crates/bootstrap-check-core/src/lib.rs
// ============================================================================
// Module: Bootstrap Check Core Library
// Description: Public API surface for the bootstrap verification harness.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Bootstrap Check verifies a self-hosting compiler's bootstrap chain. Each
//! available generation compiles, links, and runs every fixture; results are
//! checked against the fixture's expected stdout and against the neighboring
//! generation. Process execution and event logging sit behind explicit
//! interfaces so the same engine runs against real binaries or scripted
//! runners.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::HarnessEvent;
pub use interfaces::HarnessEventSink;
pub use interfaces::InvocationRunner;
pub use interfaces::RunLimits;
pub use interfaces::RunnerError;
pub use interfaces::SpawnFailureKind;
pub use runtime::ArgTemplate;
pub use runtime::CancelHandle;
pub use runtime::CancelSignal;
pub use runtime::DiscoveryError;
pub use runtime::FileEventSink;
pub use runtime::FixtureCatalog;
pub use runtime::FixtureLayout;
pub use runtime::MatrixEvaluator;
pub use runtime::MatrixFilter;
pub use runtime::MemoryEventSink;
pub use runtime::NoopEventSink;
pub use runtime::PipelineOrchestrator;
pub use runtime::PipelineSettings;
pub use runtime::ProcessRunner;
pub use runtime::StderrEventSink;
pub use runtime::TemplateError;
pub use runtime::TemplateRole;
