//! Outcome of a deploy run.

use chrono::{DateTime, Utc};

use skdeploy_core::{Artifact, PlanSummary, ProjectId, ProjectName, ReconciliationPlan, RemoteId};

/// One job operation that the scheduler accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    Created { spider_name: String },
    Updated { remote_id: RemoteId, spider_name: String },
    Deleted { remote_id: RemoteId, spider_name: String },
}

/// Everything a completed run did, or in dry-run mode would do.
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub project: ProjectName,
    /// `None` only in dry-run mode when the project does not exist yet.
    pub project_id: Option<ProjectId>,
    pub project_created: bool,
    /// `None` in dry-run mode.
    pub artifact: Option<Artifact>,
    pub plan: ReconciliationPlan,
    pub applied: Vec<ApplyResult>,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DeployReport {
    pub fn summary(&self) -> PlanSummary {
        self.plan.summary()
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
