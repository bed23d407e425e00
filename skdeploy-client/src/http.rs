//! Blocking HTTP implementation of [`RemoteSync`] against SpiderKeeper.
//!
//! | Operation       | Request                                             |
//! |-----------------|-----------------------------------------------------|
//! | find project    | `GET  /api/projects`                                |
//! | create project  | `POST /api/projects` (form)                         |
//! | list jobs       | `GET  /api/projects/{pid}/jobs`                     |
//! | create job      | `POST /api/projects/{pid}/jobs` (form)              |
//! | update job      | `PUT  /api/projects/{pid}/jobs/{id}` (form)         |
//! | delete job      | `GET  /project/{pid}/job/{id}/remove` + `Referer`   |
//! | upload artifact | `POST /project/{pid}/spider/upload` (multipart) + `Referer` |
//!
//! The two web-UI routes redirect back to the `Referer`, so the header must
//! carry the configured base URL.

use base64::Engine;
use serde_json::Value;
use ureq::{Agent, AgentBuilder, Request, Response};

use skdeploy_core::{wire, Artifact, DesiredJob, ProjectId, ProjectName, RemoteId, RemoteJob};

use crate::config::RemoteConfig;
use crate::error::{Operation, RemoteError};
use crate::RemoteSync;

const PROJECTS_PATH: &str = "/api/projects";

/// SpiderKeeper client. Holds one connection agent for the whole run.
pub struct HttpClient {
    agent: Agent,
    base_url: String,
    authorization: String,
}

impl HttpClient {
    pub fn new(config: RemoteConfig) -> Self {
        let agent = AgentBuilder::new().timeout(config.timeout).build();
        let token = base64::engine::general_purpose::STANDARD.encode(format!(
            "{}:{}",
            config.credentials.username, config.credentials.password
        ));
        Self {
            agent,
            base_url: config.base_url().to_string(),
            authorization: format!("Basic {token}"),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: &str, path: &str) -> Request {
        let url = self.url(path);
        tracing::debug!(method, url = %url, "scheduler request");
        self.agent
            .request(method, &url)
            .set("Authorization", &self.authorization)
    }

    /// Same as [`HttpClient::request`] for the web-UI routes that bounce back
    /// to the referring page.
    fn ui_request(&self, method: &str, path: &str) -> Request {
        self.request(method, path).set("Referer", &self.base_url)
    }

    fn json(operation: Operation, response: Response) -> Result<Value, RemoteError> {
        response
            .into_json::<Value>()
            .map_err(|source| RemoteError::Body { operation, source })
    }
}

impl RemoteSync for HttpClient {
    fn find_project(&self, name: &ProjectName) -> Result<Option<ProjectId>, RemoteError> {
        let op = Operation::FindProject;
        let response = self
            .request("GET", PROJECTS_PATH)
            .call()
            .map_err(|e| RemoteError::from((op, e)))?;
        let body = Self::json(op, response)?;
        let projects = wire::parse_projects(&body)
            .map_err(|source| RemoteError::Malformed { operation: op, source })?;

        Ok(projects
            .into_iter()
            .find(|p| p.name == *name)
            .map(|p| p.id))
    }

    fn create_project(&self, name: &ProjectName) -> Result<ProjectId, RemoteError> {
        let op = Operation::CreateProject;
        let response = self
            .request("POST", PROJECTS_PATH)
            .send_form(&[("project_name", name.0.as_str())])
            .map_err(|e| RemoteError::from((op, e)))?;
        let body = Self::json(op, response)?;
        wire::parse_created_project(&body)
            .map_err(|source| RemoteError::Malformed { operation: op, source })
    }

    fn list_jobs(&self, project: &ProjectId) -> Result<Vec<RemoteJob>, RemoteError> {
        let op = Operation::ListJobs;
        let response = self
            .request("GET", &format!("{PROJECTS_PATH}/{project}/jobs"))
            .call()
            .map_err(|e| RemoteError::from((op, e)))?;
        let body = Self::json(op, response)?;
        wire::parse_remote_jobs(&body)
            .map_err(|source| RemoteError::Malformed { operation: op, source })
    }

    fn create_job(&self, project: &ProjectId, job: &DesiredJob) -> Result<(), RemoteError> {
        let form = wire::job_form(job);
        self.request("POST", &format!("{PROJECTS_PATH}/{project}/jobs"))
            .send_form(&form_pairs(&form))
            .map_err(|e| RemoteError::from((Operation::CreateJob, e)))?;
        Ok(())
    }

    fn update_job(
        &self,
        project: &ProjectId,
        remote_id: &RemoteId,
        job: &DesiredJob,
    ) -> Result<(), RemoteError> {
        let form = wire::job_form(job);
        self.request("PUT", &format!("{PROJECTS_PATH}/{project}/jobs/{remote_id}"))
            .send_form(&form_pairs(&form))
            .map_err(|e| RemoteError::from((Operation::UpdateJob, e)))?;
        Ok(())
    }

    fn delete_job(&self, project: &ProjectId, remote_id: &RemoteId) -> Result<(), RemoteError> {
        self.ui_request("GET", &format!("/project/{project}/job/{remote_id}/remove"))
            .call()
            .map_err(|e| RemoteError::from((Operation::DeleteJob, e)))?;
        Ok(())
    }

    fn upload_artifact(&self, project: &ProjectId, artifact: &Artifact) -> Result<(), RemoteError> {
        let op = Operation::UploadArtifact;
        let contents = std::fs::read(&artifact.path).map_err(|source| RemoteError::Artifact {
            operation: op,
            path: artifact.path.clone(),
            source,
        })?;
        let boundary = multipart_boundary(artifact);
        let body = multipart_body(&boundary, "file", &artifact.file_name(), &contents);

        self.ui_request("POST", &format!("/project/{project}/spider/upload"))
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={boundary}"),
            )
            .send_bytes(&body)
            .map_err(|e| RemoteError::from((op, e)))?;
        Ok(())
    }
}

fn form_pairs<'a>(form: &'a [(&'static str, String)]) -> Vec<(&'static str, &'a str)> {
    form.iter().map(|(k, v)| (*k, v.as_str())).collect()
}

fn multipart_boundary(artifact: &Artifact) -> String {
    let digest: String = artifact.sha256.chars().take(24).collect();
    format!("------skdeploy{digest}")
}

/// Single-file `multipart/form-data` body.
pub(crate) fn multipart_body(
    boundary: &str,
    field: &str,
    file_name: &str,
    contents: &[u8],
) -> Vec<u8> {
    let file_name = quoted_param(file_name);
    let mut body = Vec::with_capacity(contents.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

/// Percent-encode the bytes that would end a quoted header parameter, as
/// browsers do for form uploads.
fn quoted_param(value: &str) -> String {
    value
        .replace('\r', "%0D")
        .replace('\n', "%0A")
        .replace('"', "%22")
}
