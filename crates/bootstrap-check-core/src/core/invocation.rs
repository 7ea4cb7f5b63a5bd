// crates/bootstrap-check-core/src/core/invocation.rs
// ============================================================================
// Module: Invocation Records
// Description: External process commands and their captured results.
// Purpose: Carry exit status, streams, and the exact command line per step.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An [`Invocation`] is a program path plus ordered arguments. Running it
//! yields an [`InvocationResult`] whose outcome separates a clean exit from a
//! timeout kill or a cancellation kill. Failing to start the process at all
//! is not an outcome; runners report it as an error instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::path::PathBuf;

use serde::Serialize;
use serde::Serializer;

// ============================================================================
// SECTION: Invocation
// ============================================================================

/// External command to run: program plus ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program path or name resolved through `PATH`.
    pub program: PathBuf,
    /// Ordered arguments.
    pub args: Vec<OsString>,
}

impl Invocation {
    /// Creates an invocation with no arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Renders the command line for reports, quoting arguments with whitespace.
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut rendered = quote(&self.program.to_string_lossy());
        for arg in &self.args {
            rendered.push(' ');
            rendered.push_str(&quote(&arg.to_string_lossy()));
        }
        rendered
    }
}

/// Quotes a single command-line word when it is empty or contains whitespace or quotes.
fn quote(word: &str) -> String {
    if !word.is_empty() && !word.chars().any(|ch| ch.is_whitespace() || ch == '\'' || ch == '"') {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r"'\''"))
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvocationOutcome {
    /// The process exited on its own. `code` is `None` when a signal ended it.
    Exited {
        /// Exit code when available.
        code: Option<i32>,
    },
    /// The process exceeded its time limit and was killed.
    TimedOut {
        /// Time limit in milliseconds.
        limit_ms: u64,
    },
    /// The run was cancelled and the process was killed.
    Cancelled,
}

impl InvocationOutcome {
    /// Returns true for a clean zero exit.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(
            self,
            Self::Exited {
                code: Some(0)
            }
        )
    }
}

/// Captured result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationResult {
    /// Exact command line that produced this result.
    pub command_line: String,
    /// Exit classification.
    pub outcome: InvocationOutcome,
    /// Captured standard output.
    #[serde(serialize_with = "serialize_lossy")]
    pub stdout: Vec<u8>,
    /// Captured standard error.
    #[serde(serialize_with = "serialize_lossy")]
    pub stderr: Vec<u8>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl InvocationResult {
    /// Returns true for a clean zero exit.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.outcome.is_success()
    }

    /// Returns stdout decoded as UTF-8 (lossy).
    #[must_use]
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Returns stderr decoded as UTF-8 (lossy).
    #[must_use]
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

// ============================================================================
// SECTION: Serialization Helpers
// ============================================================================

/// Serializes captured bytes as a lossy UTF-8 string.
pub(crate) fn serialize_lossy<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
