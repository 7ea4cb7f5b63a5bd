// crates/bootstrap-check-core/src/runtime/discovery.rs
// ============================================================================
// Module: Stage and Fixture Discovery
// Description: Probe the build directory for generations and pair fixtures.
// Purpose: Build the stage map and fixture list a matrix run consumes.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Stage discovery never fails: a generation whose binary is absent becomes a
//! missing slot, which the matrix reports as not evaluated. Fixture discovery
//! walks the fixtures directory in sorted order so ids and report layout are
//! deterministic. Sources without an expectation file are orphans.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::CompilerStage;
use crate::core::Fixture;
use crate::core::FixtureId;
use crate::core::Generation;
use crate::core::StageSet;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default stage binary base name.
pub const DEFAULT_STAGE_BASE_NAME: &str = "c";
/// Default highest generation probed.
pub const DEFAULT_MAX_GENERATION: u32 = 3;
/// Default fixture source extension.
pub const DEFAULT_SOURCE_EXTENSION: &str = "c";
/// Default expected-output extension.
pub const DEFAULT_EXPECTED_EXTENSION: &str = "expected";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fixture discovery errors.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A directory or expectation file could not be read.
    #[error("failed to read {}: {message}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// I/O error message.
        message: String,
    },
    /// The fixtures directory contains no paired fixture.
    #[error("no fixtures found under {}", dir.display())]
    NoFixtures {
        /// Fixtures directory searched.
        dir: PathBuf,
    },
}

impl DiscoveryError {
    /// Wraps an I/O error with its path.
    fn io(path: &Path, error: &io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            message: error.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Stage Discovery
// ============================================================================

/// Returns the path probed for a generation's binary.
///
/// Generation 1 is `<build_dir>/<base>`; generation N >= 2 is
/// `<build_dir>/<base>.stage<N>`.
#[must_use]
pub fn stage_path(build_dir: &Path, base_name: &str, generation: Generation) -> PathBuf {
    if generation == Generation::FIRST {
        build_dir.join(base_name)
    } else {
        build_dir.join(format!("{base_name}.{generation}"))
    }
}

/// Probes generations `1..=max_generation` in the build directory.
#[must_use]
pub fn probe_stages(build_dir: &Path, base_name: &str, max_generation: u32) -> StageSet {
    let mut stages = StageSet::new();
    for generation in (1..=max_generation).filter_map(Generation::from_raw) {
        let path = stage_path(build_dir, base_name, generation);
        if is_executable_file(&path) {
            stages.insert_available(CompilerStage::new(generation, path));
        } else {
            stages.insert_missing(generation, path);
        }
    }
    stages
}

/// Returns true when `path` is a regular file that may be executed.
fn is_executable_file(path: &Path) -> bool {
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

// ============================================================================
// SECTION: Fixture Discovery
// ============================================================================

/// Fixture file naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureLayout {
    /// Source extension without the dot.
    pub source_extension: String,
    /// Expected-output extension without the dot.
    pub expected_extension: String,
}

impl Default for FixtureLayout {
    fn default() -> Self {
        Self {
            source_extension: DEFAULT_SOURCE_EXTENSION.to_string(),
            expected_extension: DEFAULT_EXPECTED_EXTENSION.to_string(),
        }
    }
}

/// Discovered fixtures plus sources lacking an expectation file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureCatalog {
    /// Paired fixtures sorted by id.
    pub fixtures: Vec<Fixture>,
    /// Sources without a sibling expectation file, sorted.
    pub orphans: Vec<PathBuf>,
}

/// Discovers fixtures under `dir`.
///
/// # Errors
///
/// Returns [`DiscoveryError`] when a directory or expectation file cannot be
/// read, or when no fixture is found.
pub fn discover_fixtures(
    dir: &Path,
    layout: &FixtureLayout,
) -> Result<FixtureCatalog, DiscoveryError> {
    let mut sources = Vec::new();
    collect_sources(dir, &layout.source_extension, &mut sources)?;
    sources.sort();

    let mut catalog = FixtureCatalog::default();
    for source in sources {
        let expected_path = source.with_extension(&layout.expected_extension);
        if !expected_path.is_file() {
            catalog.orphans.push(source);
            continue;
        }
        let expected =
            fs::read(&expected_path).map_err(|err| DiscoveryError::io(&expected_path, &err))?;
        let id = fixture_id(dir, &source);
        catalog.fixtures.push(Fixture::new(id, source, expected));
    }
    if catalog.fixtures.is_empty() {
        return Err(DiscoveryError::NoFixtures {
            dir: dir.to_path_buf(),
        });
    }
    catalog.fixtures.sort_by(|left, right| left.id.cmp(&right.id));
    Ok(catalog)
}

/// Collects source files recursively.
fn collect_sources(
    dir: &Path,
    extension: &str,
    sources: &mut Vec<PathBuf>,
) -> Result<(), DiscoveryError> {
    let entries = fs::read_dir(dir).map_err(|err| DiscoveryError::io(dir, &err))?;
    for entry in entries {
        let entry = entry.map_err(|err| DiscoveryError::io(dir, &err))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|err| DiscoveryError::io(&path, &err))?;
        if file_type.is_dir() {
            collect_sources(&path, extension, sources)?;
        } else if path.extension().is_some_and(|ext| ext == extension) {
            sources.push(path);
        }
    }
    Ok(())
}

/// Derives a fixture id: relative path without extension, `/`-separated.
fn fixture_id(root: &Path, source: &Path) -> FixtureId {
    let relative = source.strip_prefix(root).unwrap_or(source).with_extension("");
    let parts: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    FixtureId::new(parts.join("/"))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
