//! Error types for skdeploy-build.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// All errors that can arise while packaging a project.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The project directory has no build descriptor.
    #[error("no setup.py found in {dir}")]
    MissingSetup { dir: PathBuf },

    #[error("build interpreter '{program}' not found on PATH")]
    InterpreterNotFound {
        program: String,
        #[source]
        source: which::Error,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The build process ran and reported failure.
    #[error("build process exited with {status}; stderr tail:\n{stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("build produced no .{extension} file in {dir}")]
    NoArtifact { dir: PathBuf, extension: String },

    #[error("build produced {count} .{extension} files in {dir}; expected exactly one")]
    MultipleArtifacts {
        dir: PathBuf,
        extension: String,
        count: usize,
    },
}

/// Convenience constructor for [`BuildError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> BuildError {
    BuildError::Io {
        path: path.into(),
        source,
    }
}
