// crates/bootstrap-check-core/src/runtime/mod.rs
// ============================================================================
// Module: Bootstrap Check Runtime
// Description: Process runner, pipeline orchestrator, and matrix evaluator.
// Purpose: Execute bootstrap verification runs against real or scripted runners.
// Dependencies: crate::{core, interfaces}, tokio
// ============================================================================

//! ## Overview
//! Runtime modules implement the three harness layers, leaf to root: the
//! process runner, the compile -> link -> execute orchestrator, and the
//! bootstrap matrix evaluator. Discovery, cancellation, argument templates,
//! and event sinks support them. Data flows strictly downward.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod cancel;
pub mod discovery;
pub mod events;
pub mod matrix;
pub mod pipeline;
pub mod process;
pub mod template;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cancel::CancelHandle;
pub use cancel::CancelSignal;
pub use discovery::DiscoveryError;
pub use discovery::FixtureCatalog;
pub use discovery::FixtureLayout;
pub use discovery::discover_fixtures;
pub use discovery::probe_stages;
pub use discovery::stage_path;
pub use events::FileEventSink;
pub use events::MemoryEventSink;
pub use events::NoopEventSink;
pub use events::StderrEventSink;
pub use matrix::MatrixEvaluator;
pub use matrix::MatrixFilter;
pub use pipeline::PipelineOrchestrator;
pub use pipeline::PipelineSettings;
pub use process::ProcessRunner;
pub use template::ArgTemplate;
pub use template::TemplateError;
pub use template::TemplatePaths;
pub use template::TemplateRole;
