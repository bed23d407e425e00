//! # skdeploy-client
//!
//! Remote sync capability for the SpiderKeeper scheduler.
//!
//! The orchestrator only sees the [`RemoteSync`] trait; [`HttpClient`] is the
//! blocking HTTP implementation used in production.

pub mod config;
pub mod error;
pub mod http;

pub use config::{Credentials, RemoteConfig};
pub use error::{Operation, RemoteError};
pub use http::HttpClient;

use skdeploy_core::{Artifact, DesiredJob, ProjectId, ProjectName, RemoteId, RemoteJob};

/// The scheduler operations a deploy run needs. Each is one request/response
/// exchange; failures are returned, never retried.
pub trait RemoteSync {
    /// Id of the project with exactly this name, if one exists.
    fn find_project(&self, name: &ProjectName) -> Result<Option<ProjectId>, RemoteError>;

    /// Create a project. Not idempotent: call [`RemoteSync::find_project`] first.
    fn create_project(&self, name: &ProjectName) -> Result<ProjectId, RemoteError>;

    fn list_jobs(&self, project: &ProjectId) -> Result<Vec<RemoteJob>, RemoteError>;

    fn create_job(&self, project: &ProjectId, job: &DesiredJob) -> Result<(), RemoteError>;

    fn update_job(
        &self,
        project: &ProjectId,
        remote_id: &RemoteId,
        job: &DesiredJob,
    ) -> Result<(), RemoteError>;

    fn delete_job(&self, project: &ProjectId, remote_id: &RemoteId) -> Result<(), RemoteError>;

    fn upload_artifact(&self, project: &ProjectId, artifact: &Artifact) -> Result<(), RemoteError>;
}
