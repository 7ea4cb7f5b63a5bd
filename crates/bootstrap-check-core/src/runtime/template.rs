// crates/bootstrap-check-core/src/runtime/template.rs
// ============================================================================
// Module: Argument Templates
// Description: Placeholder-based argument lists for compile and link steps.
// Purpose: Let one harness target compilers whose accepted flags evolve.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! An [`ArgTemplate`] is an ordered list of words. Words may embed the
//! placeholders `{source}`, `{object}` and `{executable}`; rendering replaces
//! them with the pair's paths. Templates are validated once: each role
//! requires its placeholders and unknown placeholders fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::path::Path;

use thiserror::Error;

// ============================================================================
// SECTION: Placeholders
// ============================================================================

/// Placeholder for the fixture source path.
pub const SOURCE_PLACEHOLDER: &str = "{source}";
/// Placeholder for the object file path.
pub const OBJECT_PLACEHOLDER: &str = "{object}";
/// Placeholder for the linked executable path.
pub const EXECUTABLE_PLACEHOLDER: &str = "{executable}";

/// Every recognized placeholder.
const KNOWN_PLACEHOLDERS: [&str; 3] =
    [SOURCE_PLACEHOLDER, OBJECT_PLACEHOLDER, EXECUTABLE_PLACEHOLDER];

/// Step a template renders arguments for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateRole {
    /// Compiler-under-test arguments.
    Compile,
    /// Host toolchain arguments.
    Link,
}

impl TemplateRole {
    /// Placeholders the role must contain.
    const fn required(self) -> &'static [&'static str] {
        match self {
            Self::Compile => &[SOURCE_PLACEHOLDER, OBJECT_PLACEHOLDER],
            Self::Link => &[OBJECT_PLACEHOLDER, EXECUTABLE_PLACEHOLDER],
        }
    }

    /// Returns a stable label for error messages.
    const fn as_str(self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Link => "link",
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Template validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A required placeholder is absent.
    #[error("{role} template must contain {placeholder}")]
    MissingPlaceholder {
        /// Template role label.
        role: &'static str,
        /// Missing placeholder.
        placeholder: &'static str,
    },
    /// A word contains an unrecognized `{...}` placeholder.
    #[error("{role} template contains unknown placeholder in `{word}`")]
    UnknownPlaceholder {
        /// Template role label.
        role: &'static str,
        /// Offending word.
        word: String,
    },
}

// ============================================================================
// SECTION: Template
// ============================================================================

/// Validated argument template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgTemplate {
    /// Template words in order.
    words: Vec<String>,
}

/// Paths substituted into a template.
#[derive(Debug, Clone, Copy)]
pub struct TemplatePaths<'a> {
    /// Fixture source path.
    pub source: &'a Path,
    /// Object file path.
    pub object: &'a Path,
    /// Executable path.
    pub executable: &'a Path,
}

impl ArgTemplate {
    /// Default compiler template: `{source} -o {object}`.
    #[must_use]
    pub fn default_compile() -> Self {
        Self {
            words: vec![
                SOURCE_PLACEHOLDER.to_string(),
                "-o".to_string(),
                OBJECT_PLACEHOLDER.to_string(),
            ],
        }
    }

    /// Default toolchain template: `{object} -o {executable}`.
    #[must_use]
    pub fn default_link() -> Self {
        Self {
            words: vec![
                OBJECT_PLACEHOLDER.to_string(),
                "-o".to_string(),
                EXECUTABLE_PLACEHOLDER.to_string(),
            ],
        }
    }

    /// Parses and validates a template for a role.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] when a required placeholder is missing or an
    /// unknown placeholder is present.
    pub fn parse<I, S>(role: TemplateRole, words: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words: Vec<String> = words.into_iter().map(Into::into).collect();
        for word in &words {
            if has_unknown_placeholder(word) {
                return Err(TemplateError::UnknownPlaceholder {
                    role: role.as_str(),
                    word: word.clone(),
                });
            }
        }
        for &placeholder in role.required() {
            if !words.iter().any(|word| word.contains(placeholder)) {
                return Err(TemplateError::MissingPlaceholder {
                    role: role.as_str(),
                    placeholder,
                });
            }
        }
        Ok(Self {
            words,
        })
    }

    /// Returns the template words.
    #[must_use]
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Renders the template into concrete arguments.
    #[must_use]
    pub fn render(&self, paths: TemplatePaths<'_>) -> Vec<OsString> {
        self.words.iter().map(|word| render_word(word, paths)).collect()
    }
}

/// Renders one word. Whole-word placeholders keep non-UTF-8 paths intact.
fn render_word(word: &str, paths: TemplatePaths<'_>) -> OsString {
    match word {
        SOURCE_PLACEHOLDER => return paths.source.as_os_str().to_owned(),
        OBJECT_PLACEHOLDER => return paths.object.as_os_str().to_owned(),
        EXECUTABLE_PLACEHOLDER => return paths.executable.as_os_str().to_owned(),
        _ => {}
    }
    OsString::from(
        word.replace(SOURCE_PLACEHOLDER, &paths.source.to_string_lossy())
            .replace(OBJECT_PLACEHOLDER, &paths.object.to_string_lossy())
            .replace(EXECUTABLE_PLACEHOLDER, &paths.executable.to_string_lossy()),
    )
}

/// Returns true when a `{...}` group is not a known placeholder.
fn has_unknown_placeholder(word: &str) -> bool {
    let mut rest = word;
    while let Some(open) = rest.find('{') {
        let tail = &rest[open..];
        let Some(close) = tail.find('}') else {
            return false;
        };
        let candidate = &tail[..=close];
        if !KNOWN_PLACEHOLDERS.contains(&candidate) {
            return true;
        }
        rest = &tail[close + 1..];
    }
    false
}

// ============================================================================
// SECTION: Tests
// ============================================================================
