//! Deploy pipeline shared by the `deploy` and `plan` commands.
//!
//! ```text
//! BuildArtifact → ResolveProject → PublishArtifact → FetchRemoteJobs
//!   → Reconcile → ApplyAdds → ApplyMerges → ApplyDeletes → Done
//! ```
//!
//! Every step runs once, in order, on the calling thread. Packaging happens
//! before the scheduler is contacted, and no job is touched until the artifact
//! is published. Adds and merges run before deletes so a renamed job never
//! leaves its spider without a schedule in between. The first failed job
//! operation stops the run; nothing already applied is undone.

use chrono::Utc;

use skdeploy_build::Packager;
use skdeploy_client::{RemoteError, RemoteSync};
use skdeploy_core::{reconcile, DesiredJob, ProjectId, ProjectName, ReconciliationPlan};

use crate::error::{DeployError, Stage};
use crate::report::{ApplyResult, DeployReport};

/// Run the full deploy: package, publish, reconcile and apply.
///
/// With `dry_run` set nothing is built or mutated: the project is only looked
/// up (a missing project counts as having no jobs) and the plan is returned
/// unapplied.
pub fn run<R, P>(
    remote: &R,
    packager: &P,
    project: &ProjectName,
    jobs: &[DesiredJob],
    dry_run: bool,
) -> Result<DeployReport, DeployError>
where
    R: RemoteSync + ?Sized,
    P: Packager + ?Sized,
{
    if dry_run {
        return plan_only(remote, project, jobs);
    }

    let started_at = Utc::now();

    tracing::info!(stage = %Stage::BuildArtifact, project = %project, "packaging");
    let artifact = packager.package()?;

    tracing::info!(stage = %Stage::ResolveProject, project = %project, "resolving project");
    let (project_id, project_created) = resolve_project(remote, project)?;

    tracing::info!(
        stage = %Stage::PublishArtifact,
        artifact = %artifact.path.display(),
        sha256 = %artifact.sha256,
        "uploading artifact"
    );
    remote
        .upload_artifact(&project_id, &artifact)
        .map_err(|source| remote_failed(Stage::PublishArtifact, source))?;

    let plan = fetch_and_reconcile(remote, &project_id, jobs)?;
    let applied = apply(remote, &project_id, &plan)?;

    tracing::info!(stage = %Stage::Done, applied = applied.len(), "deploy finished");
    Ok(DeployReport {
        project: project.clone(),
        project_id: Some(project_id),
        project_created,
        artifact: Some(artifact),
        plan,
        applied,
        dry_run: false,
        started_at,
        finished_at: Utc::now(),
    })
}

fn plan_only<R>(
    remote: &R,
    project: &ProjectName,
    jobs: &[DesiredJob],
) -> Result<DeployReport, DeployError>
where
    R: RemoteSync + ?Sized,
{
    let started_at = Utc::now();

    let project_id = remote
        .find_project(project)
        .map_err(|source| remote_failed(Stage::ResolveProject, source))?;
    let plan = match &project_id {
        Some(id) => fetch_and_reconcile(remote, id, jobs)?,
        None => {
            tracing::info!(project = %project, "[dry-run] project does not exist yet");
            reconcile(jobs, &[])
        }
    };

    Ok(DeployReport {
        project: project.clone(),
        project_id,
        project_created: false,
        artifact: None,
        plan,
        applied: Vec::new(),
        dry_run: true,
        started_at,
        finished_at: Utc::now(),
    })
}

fn resolve_project<R>(remote: &R, project: &ProjectName) -> Result<(ProjectId, bool), DeployError>
where
    R: RemoteSync + ?Sized,
{
    let found = remote
        .find_project(project)
        .map_err(|source| remote_failed(Stage::ResolveProject, source))?;
    if let Some(id) = found {
        tracing::debug!(project = %project, id = %id, "project exists");
        return Ok((id, false));
    }

    let id = remote
        .create_project(project)
        .map_err(|source| remote_failed(Stage::ResolveProject, source))?;
    tracing::info!(project = %project, id = %id, "created project");
    Ok((id, true))
}

fn fetch_and_reconcile<R>(
    remote: &R,
    project_id: &ProjectId,
    jobs: &[DesiredJob],
) -> Result<ReconciliationPlan, DeployError>
where
    R: RemoteSync + ?Sized,
{
    tracing::info!(stage = %Stage::FetchRemoteJobs, project_id = %project_id, "listing jobs");
    let existing = remote
        .list_jobs(project_id)
        .map_err(|source| remote_failed(Stage::FetchRemoteJobs, source))?;

    let plan = reconcile(jobs, &existing);
    let summary = plan.summary();
    tracing::info!(
        stage = %Stage::Reconcile,
        add = summary.add,
        merge = summary.merge,
        delete = summary.delete,
        "plan ready"
    );
    Ok(plan)
}

/// Apply the plan, stopping at the first failure.
fn apply<R>(
    remote: &R,
    project_id: &ProjectId,
    plan: &ReconciliationPlan,
) -> Result<Vec<ApplyResult>, DeployError>
where
    R: RemoteSync + ?Sized,
{
    let planned = plan.operation_count();
    let mut applied = Vec::with_capacity(planned);

    for job in &plan.to_add {
        if let Err(source) = remote.create_job(project_id, job) {
            return Err(apply_failed(Stage::ApplyAdds, applied.len(), planned, source));
        }
        tracing::info!(spider = %job.spider_name, schedule = %job.schedule, "created job");
        applied.push(ApplyResult::Created {
            spider_name: job.spider_name.clone(),
        });
    }

    for merged in &plan.to_merge {
        if let Err(source) = remote.update_job(project_id, &merged.remote_id, &merged.job) {
            return Err(apply_failed(Stage::ApplyMerges, applied.len(), planned, source));
        }
        tracing::info!(spider = %merged.job.spider_name, id = %merged.remote_id, "updated job");
        applied.push(ApplyResult::Updated {
            remote_id: merged.remote_id.clone(),
            spider_name: merged.job.spider_name.clone(),
        });
    }

    for stale in &plan.to_delete {
        if let Err(source) = remote.delete_job(project_id, &stale.remote_id) {
            return Err(apply_failed(Stage::ApplyDeletes, applied.len(), planned, source));
        }
        tracing::info!(spider = %stale.job.spider_name, id = %stale.remote_id, "deleted job");
        applied.push(ApplyResult::Deleted {
            remote_id: stale.remote_id.clone(),
            spider_name: stale.job.spider_name.clone(),
        });
    }

    Ok(applied)
}

fn remote_failed(stage: Stage, source: RemoteError) -> DeployError {
    tracing::info!(stage = %stage, error = %source, "aborting; no jobs were changed");
    DeployError::Remote { stage, source }
}

fn apply_failed(stage: Stage, applied: usize, planned: usize, source: RemoteError) -> DeployError {
    tracing::info!(
        stage = %stage,
        applied,
        planned,
        error = %source,
        "aborting; remote job state is possibly inconsistent"
    );
    DeployError::Apply {
        stage,
        applied,
        planned,
        source,
    }
}
