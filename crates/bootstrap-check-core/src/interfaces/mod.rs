// crates/bootstrap-check-core/src/interfaces/mod.rs
// ============================================================================
// Module: Bootstrap Check Interfaces
// Description: Seams for process execution and structured event logging.
// Purpose: Define the contract surfaces used by the pipeline and matrix runtime.
// Dependencies: crate::core, crate::runtime::cancel, async-trait, serde, thiserror
// ============================================================================

//! ## Overview
//! The orchestrator never spawns processes directly; it calls an
//! [`InvocationRunner`]. Runtime progress is reported through a
//! [`HarnessEventSink`] so deployments can route events to stderr, a file, or
//! nowhere without touching the pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::core::FixtureId;
use crate::core::Generation;
use crate::core::Invocation;
use crate::core::InvocationResult;
use crate::core::PipelineStep;
use crate::runtime::cancel::CancelSignal;

// ============================================================================
// SECTION: Invocation Runner
// ============================================================================

/// Execution bounds applied to a single invocation.
#[derive(Debug, Clone)]
pub struct RunLimits {
    /// Maximum wall-clock time before the process is killed.
    pub timeout: Duration,
    /// Cancellation signal; when raised the process is killed.
    pub cancel: CancelSignal,
}

/// Classification of a process start failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnFailureKind {
    /// The program does not exist.
    NotFound,
    /// The program exists but may not be executed.
    PermissionDenied,
    /// Any other start failure.
    Other,
}

impl SpawnFailureKind {
    /// Classifies an OS error raised while spawning.
    #[must_use]
    pub fn from_io(error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Other,
        }
    }

    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::PermissionDenied => "permission_denied",
            Self::Other => "other",
        }
    }
}

/// Errors raised when an invocation could not be carried out at all.
///
/// # Invariants
/// - A process that started and exited non-zero is never an error; it is an
///   [`InvocationResult`].
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The process could not be started.
    #[error("failed to start `{command_line}` ({}): {message}", kind.as_str())]
    Spawn {
        /// Rendered command line.
        command_line: String,
        /// Start failure classification.
        kind: SpawnFailureKind,
        /// OS error message.
        message: String,
    },
    /// Waiting for the process or reading its streams failed.
    #[error("i/o error while running `{command_line}`: {message}")]
    Io {
        /// Rendered command line.
        command_line: String,
        /// Error message.
        message: String,
    },
}

/// Executes one external process and captures its result.
#[async_trait]
pub trait InvocationRunner: Send + Sync {
    /// Runs the invocation to completion, timeout, or cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] when the process cannot be started or its
    /// streams cannot be collected.
    async fn run(
        &self,
        invocation: &Invocation,
        limits: &RunLimits,
    ) -> Result<InvocationResult, RunnerError>;
}

// ============================================================================
// SECTION: Event Sink
// ============================================================================

/// Structured harness event (one JSON line per event).
///
/// # Invariants
/// - Captured program output is never included; it belongs to the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarnessEvent {
    /// Stable event label.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Generation concerned, when any.
    pub generation: Option<Generation>,
    /// Fixture concerned, when any.
    pub fixture: Option<FixtureId>,
    /// Pipeline step concerned, when any.
    pub step: Option<PipelineStep>,
    /// Outcome label, when any.
    pub outcome: Option<String>,
    /// Duration in milliseconds, when measured.
    pub duration_ms: Option<u64>,
    /// Free-form detail (command line, counts, paths).
    pub detail: Option<String>,
}

impl HarnessEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(event: &'static str) -> Self {
        Self {
            event,
            timestamp_ms: now_millis(),
            generation: None,
            fixture: None,
            step: None,
            outcome: None,
            duration_ms: None,
            detail: None,
        }
    }

    /// Attaches the (generation, fixture) pair.
    #[must_use]
    pub fn pair(mut self, generation: Generation, fixture: &FixtureId) -> Self {
        self.generation = Some(generation);
        self.fixture = Some(fixture.clone());
        self
    }

    /// Attaches a generation.
    #[must_use]
    pub const fn generation(mut self, generation: Generation) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Attaches a pipeline step.
    #[must_use]
    pub const fn step(mut self, step: PipelineStep) -> Self {
        self.step = Some(step);
        self
    }

    /// Attaches an outcome label.
    #[must_use]
    pub fn outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }

    /// Attaches a duration.
    #[must_use]
    pub const fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Attaches a detail string.
    #[must_use]
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Sink for structured harness events.
pub trait HarnessEventSink: Send + Sync {
    /// Record an event.
    fn record(&self, event: &HarnessEvent);
}

/// Returns the current time in milliseconds since the Unix epoch.
fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}
