// crates/bootstrap-check-core/src/core/mod.rs
// ============================================================================
// Module: Bootstrap Check Core Types
// Description: Canonical data model for bootstrap verification runs.
// Purpose: Provide stable, serializable types for stages, fixtures, and reports.
// Dependencies: serde, sha2
// ============================================================================

//! ## Overview
//! Core types describe compiler generations, fixtures, per-pair artifacts,
//! invocation results, and the aggregate bootstrap report. None of these types
//! are mutated after construction; runs produce new values.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod artifacts;
pub mod fixture;
pub mod identifiers;
pub mod invocation;
pub mod report;
pub mod stage;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use artifacts::ArtifactSet;
pub use artifacts::artifact_stem;
pub use fixture::Fixture;
pub use identifiers::FixtureId;
pub use identifiers::Generation;
pub use invocation::Invocation;
pub use invocation::InvocationOutcome;
pub use invocation::InvocationResult;
pub use report::BootstrapReport;
pub use report::Cell;
pub use report::EquivalenceCheck;
pub use report::EquivalenceStatus;
pub use report::FailureKind;
pub use report::Finding;
pub use report::FindingClass;
pub use report::PipelineStep;
pub use report::ReportSummary;
pub use report::StageResult;
pub use report::StepFailure;
pub use report::StepRecord;
pub use stage::CompilerStage;
pub use stage::StageSet;
pub use stage::StageSlot;
