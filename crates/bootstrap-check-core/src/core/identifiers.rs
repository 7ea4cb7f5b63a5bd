// crates/bootstrap-check-core/src/core/identifiers.rs
// ============================================================================
// Module: Bootstrap Check Identifiers
// Description: Generation numbers and fixture identifiers.
// Purpose: Provide strongly typed, serializable keys for the bootstrap matrix.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Generations are 1-based compiler generation numbers and serialize as plain
//! integers. Fixture identifiers are relative paths (without extension) using
//! `/` separators so they are stable across hosts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU32;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Compiler generation in the bootstrap chain.
///
/// # Invariants
/// - Always >= 1 (generation 1 is built by the outer toolchain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(NonZeroU32);

impl Generation {
    /// The first generation, built by the outer toolchain.
    pub const FIRST: Self = Self(NonZeroU32::MIN);

    /// Creates a generation from a non-zero value.
    #[must_use]
    pub const fn new(value: NonZeroU32) -> Self {
        Self(value)
    }

    /// Creates a generation from a raw value (returns `None` if zero).
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// Returns the raw generation number (always >= 1).
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Returns the generation this one is expected to produce.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// Returns true when `other` directly follows this generation.
    #[must_use]
    pub fn precedes(self, other: Self) -> bool {
        self.next() == Some(other)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage{}", self.0.get())
    }
}

/// Fixture identifier derived from the fixture's relative path.
///
/// # Invariants
/// - Uses `/` as the separator and carries no file extension.
/// - Ordering is lexicographic, which keeps report output deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixtureId(String);

impl FixtureId {
    /// Creates a new fixture identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FixtureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FixtureId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FixtureId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
