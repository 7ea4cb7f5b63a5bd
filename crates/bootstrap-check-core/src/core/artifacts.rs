// crates/bootstrap-check-core/src/core/artifacts.rs
// ============================================================================
// Module: Artifact Naming
// Description: Collision-free object and executable paths per (stage, fixture).
// Purpose: Let independent pipeline jobs share one artifact directory safely.
// Dependencies: serde, sha2
// ============================================================================

//! ## Overview
//! Every (generation, fixture) pair owns a distinct object path and executable
//! path inside the artifact directory. Names are a pure function of the pair,
//! so a rerun of the same pair overwrites its own artifacts and nothing else.
//!
//! File names take the form `<sanitized-id>-<digest8>.stage<N>.o`. The
//! sanitized id keeps names readable; the digest prefix (SHA-256 over the raw
//! fixture id) separates ids that sanitize to the same text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

use crate::core::identifiers::FixtureId;
use crate::core::identifiers::Generation;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of hex characters of the fixture digest kept in artifact names.
const DIGEST_PREFIX_LEN: usize = 8;
/// Extension used for object files.
const OBJECT_EXTENSION: &str = "o";
/// Extension used for linked executables.
const EXECUTABLE_EXTENSION: &str = "exe";

// ============================================================================
// SECTION: Artifact Set
// ============================================================================

/// Transient filesystem paths produced by one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSet {
    /// Object file written by the compile step.
    pub object: PathBuf,
    /// Executable written by the link step.
    pub executable: PathBuf,
}

impl ArtifactSet {
    /// Derives the artifact paths for a (generation, fixture) pair.
    #[must_use]
    pub fn derive(root: &Path, generation: Generation, fixture: &FixtureId) -> Self {
        let stem = artifact_stem(generation, fixture);
        Self {
            object: root.join(format!("{stem}.{OBJECT_EXTENSION}")),
            executable: root.join(format!("{stem}.{EXECUTABLE_EXTENSION}")),
        }
    }

    /// Returns both paths in pipeline order.
    #[must_use]
    pub fn paths(&self) -> [&Path; 2] {
        [self.object.as_path(), self.executable.as_path()]
    }
}

/// Returns the shared file stem for a (generation, fixture) pair.
#[must_use]
pub fn artifact_stem(generation: Generation, fixture: &FixtureId) -> String {
    let sanitized = sanitize(fixture.as_str());
    let digest = fixture_digest(fixture);
    format!("{sanitized}-{}.{generation}", &digest[..DIGEST_PREFIX_LEN])
}

/// Maps characters outside `[A-Za-z0-9_-]` to `_`.
fn sanitize(raw: &str) -> String {
    let mapped: String = raw
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' { ch } else { '_' })
        .collect();
    if mapped.is_empty() { "_".to_string() } else { mapped }
}

/// Computes the lowercase hex SHA-256 digest of a fixture id.
fn fixture_digest(fixture: &FixtureId) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fixture.as_str().as_bytes());
    hex_encode(&hasher.finalize())
}

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[usize::from(byte >> 4)] as char);
        out.push(HEX[usize::from(byte & 0x0f)] as char);
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
