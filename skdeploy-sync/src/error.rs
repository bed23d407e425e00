//! Error types for skdeploy-sync.

use std::fmt;

use thiserror::Error;

use skdeploy_build::BuildError;
use skdeploy_client::RemoteError;

/// Steps of a deploy run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    BuildArtifact,
    ResolveProject,
    PublishArtifact,
    FetchRemoteJobs,
    Reconcile,
    ApplyAdds,
    ApplyMerges,
    ApplyDeletes,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::BuildArtifact => "build artifact",
            Stage::ResolveProject => "resolve project",
            Stage::PublishArtifact => "publish artifact",
            Stage::FetchRemoteJobs => "fetch remote jobs",
            Stage::Reconcile => "reconcile",
            Stage::ApplyAdds => "apply adds",
            Stage::ApplyMerges => "apply merges",
            Stage::ApplyDeletes => "apply deletes",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// What a failed run may have left behind on the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteState {
    /// No job was created, updated or deleted.
    Unchanged,
    /// Some planned job operations were applied and the rest were not.
    PossiblyInconsistent,
}

/// All errors that end a deploy run.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Packaging failed before the scheduler was contacted.
    #[error("artifact build failed; nothing was sent to the scheduler")]
    Build(#[from] BuildError),

    /// A scheduler call failed before any job was touched.
    #[error("{stage} failed; no jobs were changed")]
    Remote {
        stage: Stage,
        #[source]
        source: RemoteError,
    },

    /// A job operation failed part-way through the plan. Earlier operations
    /// stay applied.
    #[error(
        "{stage} failed after {applied} of {planned} job operations were applied; \
         remote job state is possibly inconsistent"
    )]
    Apply {
        stage: Stage,
        applied: usize,
        planned: usize,
        #[source]
        source: RemoteError,
    },
}

impl DeployError {
    pub fn stage(&self) -> Stage {
        match self {
            DeployError::Build(_) => Stage::BuildArtifact,
            DeployError::Remote { stage, .. } | DeployError::Apply { stage, .. } => *stage,
        }
    }

    pub fn remote_state(&self) -> RemoteState {
        match self {
            DeployError::Build(_) | DeployError::Remote { .. } => RemoteState::Unchanged,
            DeployError::Apply { .. } => RemoteState::PossiblyInconsistent,
        }
    }
}

#[cfg(test)]
mod tests {
    use skdeploy_client::Operation;

    use super::*;

    fn http_500(operation: Operation) -> RemoteError {
        RemoteError::Status {
            operation,
            status: 500,
        }
    }

    #[test]
    fn apply_failure_says_state_may_be_inconsistent() {
        let err = DeployError::Apply {
            stage: Stage::ApplyDeletes,
            applied: 2,
            planned: 4,
            source: http_500(Operation::DeleteJob),
        };
        assert_eq!(err.remote_state(), RemoteState::PossiblyInconsistent);
        let msg = err.to_string();
        assert!(msg.contains("possibly inconsistent"), "got: {msg}");
        assert!(msg.contains("2 of 4"), "got: {msg}");
    }

    #[test]
    fn pre_apply_failure_says_nothing_changed() {
        let err = DeployError::Remote {
            stage: Stage::PublishArtifact,
            source: http_500(Operation::UploadArtifact),
        };
        assert_eq!(err.remote_state(), RemoteState::Unchanged);
        assert_eq!(err.stage(), Stage::PublishArtifact);
        assert!(err.to_string().contains("no jobs were changed"));
    }
}
