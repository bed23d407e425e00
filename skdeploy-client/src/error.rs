//! Error types for skdeploy-client.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use skdeploy_core::ModelError;

/// The remote call a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    FindProject,
    CreateProject,
    ListJobs,
    CreateJob,
    UpdateJob,
    DeleteJob,
    UploadArtifact,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::FindProject => "find project",
            Operation::CreateProject => "create project",
            Operation::ListJobs => "list jobs",
            Operation::CreateJob => "create job",
            Operation::UpdateJob => "update job",
            Operation::DeleteJob => "delete job",
            Operation::UploadArtifact => "upload artifact",
        };
        f.write_str(name)
    }
}

/// All errors that can arise from a scheduler call. None are retried.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The scheduler answered with a non-success status.
    #[error("{operation} failed: scheduler returned HTTP {status}")]
    Status { operation: Operation, status: u16 },

    /// The request never got an HTTP answer (DNS, refused, timeout, TLS).
    #[error("{operation} failed: could not reach the scheduler")]
    Transport {
        operation: Operation,
        #[source]
        source: Box<ureq::Transport>,
    },

    /// The body could not be read or decoded as JSON.
    #[error("{operation} failed: unreadable response body")]
    Body {
        operation: Operation,
        #[source]
        source: std::io::Error,
    },

    /// The body was JSON but not the shape the endpoint promises.
    #[error("{operation} failed: malformed response")]
    Malformed {
        operation: Operation,
        #[source]
        source: ModelError,
    },

    /// The artifact to upload could not be read from disk.
    #[error("{operation} failed: cannot read {path}")]
    Artifact {
        operation: Operation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RemoteError {
    pub fn operation(&self) -> Operation {
        match self {
            RemoteError::Status { operation, .. }
            | RemoteError::Transport { operation, .. }
            | RemoteError::Body { operation, .. }
            | RemoteError::Malformed { operation, .. }
            | RemoteError::Artifact { operation, .. } => *operation,
        }
    }

    /// HTTP status, when the scheduler answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<(Operation, ureq::Error)> for RemoteError {
    fn from((operation, err): (Operation, ureq::Error)) -> Self {
        match err {
            ureq::Error::Status(status, _) => RemoteError::Status { operation, status },
            ureq::Error::Transport(t) => RemoteError::Transport {
                operation,
                source: Box::new(t),
            },
        }
    }
}
