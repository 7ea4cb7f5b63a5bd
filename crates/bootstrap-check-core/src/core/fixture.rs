// crates/bootstrap-check-core/src/core/fixture.rs
// ============================================================================
// Module: Test Fixtures
// Description: Source programs paired with their expected standard output.
// Purpose: Describe the immutable inputs every generation is evaluated on.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A fixture is a source file plus the exact bytes the linked program must
//! write to stdout. Expectations are compared byte for byte.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use serde::Serialize;

use crate::core::identifiers::FixtureId;
use crate::core::invocation::serialize_lossy;

// ============================================================================
// SECTION: Fixture
// ============================================================================

/// Test program with its expected stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fixture {
    /// Identifier derived from the relative source path.
    pub id: FixtureId,
    /// Path to the source file.
    pub source: PathBuf,
    /// Exact expected stdout bytes.
    #[serde(serialize_with = "serialize_lossy")]
    pub expected_stdout: Vec<u8>,
}

impl Fixture {
    /// Creates a fixture.
    #[must_use]
    pub fn new(
        id: impl Into<FixtureId>,
        source: impl Into<PathBuf>,
        expected_stdout: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            expected_stdout: expected_stdout.into(),
        }
    }

    /// Returns true when `stdout` matches the expectation exactly.
    #[must_use]
    pub fn matches(&self, stdout: &[u8]) -> bool {
        self.expected_stdout == stdout
    }
}
