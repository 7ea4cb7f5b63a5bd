// system-tests/src/toolchain.rs
// ============================================================================
// Module: Scripted Build Trees
// Description: Throwaway build trees with shell-script compiler generations.
// Purpose: Give system tests a real process pipeline without a real compiler.
// Dependencies: bootstrap-check-core, tempfile
// ============================================================================

//! ## Overview
//! A [`BuildTree`] lays out a build directory, a fixtures directory, and a
//! linker script inside a temporary directory. Compiler generations are
//! small `sh` scripts that turn every `puts("...")` call in a fixture into
//! the line it would print; the linker wraps that text in an executable
//! script that prints it. The result behaves like a working bootstrap chain
//! and can be broken one generation at a time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::path::PathBuf;

use bootstrap_check_core::Generation;
use bootstrap_check_core::runtime::discovery::DEFAULT_STAGE_BASE_NAME;
use bootstrap_check_core::runtime::stage_path;
use tempfile::TempDir;

// ============================================================================
// SECTION: Scripts
// ============================================================================

/// Extracts `puts("...")` payloads from `$1` into `$3`.
const EXTRACT_PUTS: &str = "sed -n 's/^.*puts(\"\\(.*\\)\").*$/\\1/p' \"$1\" > \"$3\"\n";

/// Compiler generation behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerScript {
    /// Produces exactly what the fixture prints.
    Faithful,
    /// Appends a stray line to every program.
    Diverging,
    /// Rejects every input with a diagnostic.
    Failing,
}

impl CompilerScript {
    /// Returns the script body.
    fn body(self) -> String {
        match self {
            Self::Faithful => format!("#!/bin/sh\n{EXTRACT_PUTS}"),
            Self::Diverging => format!("#!/bin/sh\n{EXTRACT_PUTS}echo drift >> \"$3\"\n"),
            Self::Failing => {
                "#!/bin/sh\necho \"$1: internal compiler error\" >&2\nexit 3\n".to_string()
            }
        }
    }
}

/// Linker behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkerScript {
    /// Emits an executable that prints the object contents.
    Wrapping,
    /// Emits an executable that never exits.
    Hanging,
}

impl LinkerScript {
    /// Returns the script body.
    const fn body(self) -> &'static str {
        match self {
            Self::Wrapping => {
                "#!/bin/sh\nprintf '#!/bin/sh\\ncat \"%s\"\\n' \"$1\" > \"$3\"\nchmod +x \"$3\"\n"
            }
            Self::Hanging => {
                "#!/bin/sh\nprintf '#!/bin/sh\\nexec sleep 600\\n' > \"$3\"\nchmod +x \"$3\"\n"
            }
        }
    }
}

// ============================================================================
// SECTION: Build Tree
// ============================================================================

/// Temporary build tree with scripted toolchain binaries.
#[derive(Debug)]
pub struct BuildTree {
    /// Owning temporary directory; removed on drop.
    root: TempDir,
}

impl BuildTree {
    /// Creates an empty tree with `build/` and `fixtures/` directories.
    ///
    /// # Errors
    ///
    /// Returns an error when the directories cannot be created.
    pub fn create() -> io::Result<Self> {
        let root = tempfile::tempdir()?;
        fs::create_dir_all(root.path().join("build"))?;
        fs::create_dir_all(root.path().join("fixtures"))?;
        Ok(Self {
            root,
        })
    }

    /// Returns the tree root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Returns the build directory probed for compiler generations.
    #[must_use]
    pub fn build_dir(&self) -> PathBuf {
        self.root.path().join("build")
    }

    /// Returns the fixtures directory.
    #[must_use]
    pub fn fixtures_dir(&self) -> PathBuf {
        self.root.path().join("fixtures")
    }

    /// Returns the linker script path.
    #[must_use]
    pub fn linker(&self) -> PathBuf {
        self.root.path().join("ld.sh")
    }

    /// Returns the directory pipeline artifacts are written to.
    #[must_use]
    pub fn artifact_dir(&self) -> PathBuf {
        self.build_dir().join("bootstrap-check")
    }

    /// Installs a compiler generation at its probed path.
    ///
    /// # Errors
    ///
    /// Returns an error when the script cannot be written.
    pub fn install_stage(
        &self,
        generation: Generation,
        script: CompilerScript,
    ) -> io::Result<PathBuf> {
        let path = stage_path(&self.build_dir(), DEFAULT_STAGE_BASE_NAME, generation);
        write_executable(&path, &script.body())?;
        Ok(path)
    }

    /// Installs the linker script.
    ///
    /// # Errors
    ///
    /// Returns an error when the script cannot be written.
    pub fn install_linker(&self, script: LinkerScript) -> io::Result<PathBuf> {
        let path = self.linker();
        write_executable(&path, script.body())?;
        Ok(path)
    }

    /// Adds a fixture printing `line`, with a matching expectation.
    ///
    /// Ids may contain `/` to place the fixture in a subdirectory.
    ///
    /// # Errors
    ///
    /// Returns an error when the fixture files cannot be written.
    pub fn add_fixture(&self, id: &str, line: &str) -> io::Result<()> {
        let source = self.fixtures_dir().join(format!("{id}.c"));
        if let Some(parent) = source.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&source, format!("int main(void) {{ puts(\"{line}\"); return 0; }}\n"))?;
        fs::write(source.with_extension("expected"), format!("{line}\n"))
    }
}

/// Writes `body` to `path` and marks it executable.
fn write_executable(path: &Path, body: &str) -> io::Result<()> {
    fs::write(path, body)?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}
