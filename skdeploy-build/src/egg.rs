//! Egg packaging.
//!
//! ## Steps of `EggBuilder::build`
//!
//! 1. Require `setup.py` in the project directory.
//! 2. Resolve the interpreter on `PATH`.
//! 3. Create a `scrapydeploy-*` temp directory for output and logs.
//! 4. Run `<python> setup.py clean -a bdist_egg -d <tmp>` with the project
//!    directory as the child's working directory.
//! 5. Require exactly one `*.egg` in the temp directory.
//! 6. Copy it to `<project_dir>/<project>.egg` and hash it.
//!
//! The parent process never changes its own working directory.

use std::ffi::OsString;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use sha2::{Digest, Sha256};

use skdeploy_core::Artifact;

use crate::error::{io_err, BuildError};
use crate::Packager;

const EXTENSION: &str = "egg";
const DEFAULT_INTERPRETER: &str = "python3";
const STDERR_TAIL_LINES: usize = 20;

/// Builds `<project>.egg` from a setuptools project.
#[derive(Debug, Clone)]
pub struct EggBuilder {
    project_dir: PathBuf,
    project_name: String,
    interpreter: OsString,
}

impl EggBuilder {
    pub fn new(project_dir: impl Into<PathBuf>, project_name: impl Into<String>) -> Self {
        Self {
            project_dir: project_dir.into(),
            project_name: project_name.into(),
            interpreter: OsString::from(DEFAULT_INTERPRETER),
        }
    }

    /// Use a different interpreter (name looked up on `PATH`, or a path).
    pub fn with_interpreter(mut self, interpreter: impl Into<OsString>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Where the finished artifact is copied.
    pub fn artifact_path(&self) -> PathBuf {
        self.project_dir
            .join(format!("{}.{EXTENSION}", self.project_name))
    }

    pub fn build(&self) -> Result<Artifact, BuildError> {
        let setup = self.project_dir.join("setup.py");
        if !setup.is_file() {
            return Err(BuildError::MissingSetup {
                dir: self.project_dir.clone(),
            });
        }

        let interpreter =
            which::which(&self.interpreter).map_err(|source| BuildError::InterpreterNotFound {
                program: self.interpreter.to_string_lossy().into_owned(),
                source,
            })?;

        let out_dir = tempfile::Builder::new()
            .prefix("scrapydeploy-")
            .tempdir()
            .map_err(|e| io_err(std::env::temp_dir(), e))?;
        let stdout_path = out_dir.path().join("stdout");
        let stderr_path = out_dir.path().join("stderr");
        let stdout = File::create(&stdout_path).map_err(|e| io_err(&stdout_path, e))?;
        let stderr = File::create(&stderr_path).map_err(|e| io_err(&stderr_path, e))?;

        tracing::info!(
            dir = %self.project_dir.display(),
            interpreter = %interpreter.display(),
            "building egg"
        );
        let child = Command::new(&interpreter)
            .args(["setup.py", "clean", "-a", "bdist_egg", "-d"])
            .arg(out_dir.path())
            .current_dir(&self.project_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|e| io_err(&interpreter, e))?;

        let status = wait_retrying_interrupts(child).map_err(|e| io_err(&interpreter, e))?;
        if !status.success() {
            return Err(BuildError::Failed {
                status,
                stderr: read_tail(&stderr_path, STDERR_TAIL_LINES),
            });
        }

        let built = single_artifact(out_dir.path())?;
        let target = self.artifact_path();
        std::fs::copy(&built, &target).map_err(|e| io_err(&target, e))?;

        let sha256 = sha256_file(&target)?;
        tracing::info!(artifact = %target.display(), sha256 = %sha256, "egg built");
        Ok(Artifact {
            path: target,
            sha256,
        })
    }
}

impl Packager for EggBuilder {
    fn package(&self) -> Result<Artifact, BuildError> {
        self.build()
    }
}

/// Wait for the child, retrying when a signal interrupts the wait.
fn wait_retrying_interrupts(mut child: Child) -> std::io::Result<ExitStatus> {
    loop {
        match child.wait() {
            Ok(status) => return Ok(status),
            Err(err) if err.kind() == ErrorKind::Interrupted => {
                tracing::debug!("build wait interrupted; retrying");
            }
            Err(err) => return Err(err),
        }
    }
}

fn single_artifact(dir: &Path) -> Result<PathBuf, BuildError> {
    let mut found: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| io_err(dir, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == EXTENSION))
        .collect();

    match found.len() {
        0 => Err(BuildError::NoArtifact {
            dir: dir.to_path_buf(),
            extension: EXTENSION.to_string(),
        }),
        1 => Ok(found.remove(0)),
        count => Err(BuildError::MultipleArtifacts {
            dir: dir.to_path_buf(),
            extension: EXTENSION.to_string(),
            count,
        }),
    }
}

/// Last `lines` lines of a log file; empty if it cannot be read.
fn read_tail(path: &Path, lines: usize) -> String {
    let mut contents = String::new();
    if File::open(path)
        .and_then(|mut f| f.read_to_string(&mut contents))
        .is_err()
    {
        return String::new();
    }
    let all: Vec<&str> = contents.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

/// Lowercase hex SHA-256 of a file.
pub fn sha256_file(path: &Path) -> Result<String, BuildError> {
    let bytes = std::fs::read(path).map_err(|e| io_err(path, e))?;
    let mut h = Sha256::new();
    h.update(&bytes);
    Ok(hex::encode(h.finalize()))
}
