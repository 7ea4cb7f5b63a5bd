// crates/bootstrap-check-core/src/core/stage.rs
// ============================================================================
// Module: Compiler Stages
// Description: Compiler generations and the probed generation -> stage mapping.
// Purpose: Model an open, filesystem-discovered set of bootstrap generations.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`StageSet`] maps each probed generation to a [`StageSlot`]. Slots are
//! either available (the binary exists) or missing (the chain has not been
//! bootstrapped that far yet). Missing slots are a build-ordering condition,
//! never a correctness defect.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;

use crate::core::identifiers::Generation;

// ============================================================================
// SECTION: Stage Types
// ============================================================================

/// One generation's compiler binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilerStage {
    /// Generation number of this binary.
    pub generation: Generation,
    /// Path to the compiler executable.
    pub binary: PathBuf,
}

impl CompilerStage {
    /// Creates a compiler stage descriptor.
    #[must_use]
    pub fn new(generation: Generation, binary: impl Into<PathBuf>) -> Self {
        Self {
            generation,
            binary: binary.into(),
        }
    }
}

/// Probe result for a single generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageSlot {
    /// The generation binary exists and can be evaluated.
    Available {
        /// Discovered stage.
        stage: CompilerStage,
    },
    /// The generation binary was not found at the probed path.
    Missing {
        /// Path that was probed.
        expected_path: PathBuf,
    },
}

impl StageSlot {
    /// Returns the stage when available.
    #[must_use]
    pub const fn stage(&self) -> Option<&CompilerStage> {
        match self {
            Self::Available {
                stage,
            } => Some(stage),
            Self::Missing {
                ..
            } => None,
        }
    }

    /// Returns the path that backs this slot.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Available {
                stage,
            } => &stage.binary,
            Self::Missing {
                expected_path,
            } => expected_path,
        }
    }
}

/// Ordered mapping from generation to stage slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StageSet {
    /// Slots keyed by generation.
    slots: BTreeMap<Generation, StageSlot>,
}

impl StageSet {
    /// Creates an empty stage set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }

    /// Records an available stage, replacing any previous slot.
    pub fn insert_available(&mut self, stage: CompilerStage) {
        self.slots.insert(
            stage.generation,
            StageSlot::Available {
                stage,
            },
        );
    }

    /// Records a missing stage, replacing any previous slot.
    pub fn insert_missing(&mut self, generation: Generation, expected_path: impl Into<PathBuf>) {
        self.slots.insert(
            generation,
            StageSlot::Missing {
                expected_path: expected_path.into(),
            },
        );
    }

    /// Returns the slot for a generation.
    #[must_use]
    pub fn get(&self, generation: Generation) -> Option<&StageSlot> {
        self.slots.get(&generation)
    }

    /// Iterates slots in generation order.
    pub fn iter(&self) -> impl Iterator<Item = (Generation, &StageSlot)> {
        self.slots.iter().map(|(generation, slot)| (*generation, slot))
    }

    /// Iterates available stages in generation order.
    pub fn available(&self) -> impl Iterator<Item = &CompilerStage> {
        self.slots.values().filter_map(StageSlot::stage)
    }

    /// Returns the number of probed generations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true when no generation was probed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns a copy restricted to the given generations.
    #[must_use]
    pub fn retain_generations(&self, generations: &[Generation]) -> Self {
        let slots = self
            .slots
            .iter()
            .filter(|(generation, _)| generations.contains(generation))
            .map(|(generation, slot)| (*generation, slot.clone()))
            .collect();
        Self {
            slots,
        }
    }

    /// Returns consecutive pairs of available generations (g, g+1).
    ///
    /// A missing generation breaks the chain, so no pair spans it.
    #[must_use]
    pub fn consecutive_pairs(&self) -> Vec<(Generation, Generation)> {
        let available: Vec<Generation> = self.available().map(|stage| stage.generation).collect();
        available
            .windows(2)
            .filter_map(|window| match window {
                [lower, upper] if lower.precedes(*upper) => Some((*lower, *upper)),
                _ => None,
            })
            .collect()
    }
}
