//! Human and JSON renderings of a [`DeployReport`].

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use skdeploy_core::{DesiredJob, PlanSummary, ReconciliationPlan};
use skdeploy_sync::{ApplyResult, DeployReport};

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "action")]
    action: &'static str,
    #[tabled(rename = "spider")]
    spider: String,
    #[tabled(rename = "schedule")]
    schedule: String,
    #[tabled(rename = "remote id")]
    remote_id: String,
    #[tabled(rename = "priority")]
    priority: String,
}

fn plan_rows(plan: &ReconciliationPlan) -> Vec<PlanRow> {
    let row = |action, job: &DesiredJob, remote_id: String| PlanRow {
        action,
        spider: job.spider_name.clone(),
        schedule: job.schedule.to_string(),
        remote_id,
        priority: job.priority.to_string(),
    };

    let adds = plan.to_add.iter().map(|job| row("add", job, "-".into()));
    let merges = plan
        .to_merge
        .iter()
        .map(|m| row("update", &m.job, m.remote_id.to_string()));
    let deletes = plan
        .to_delete
        .iter()
        .map(|r| row("delete", &r.job, r.remote_id.to_string()));
    adds.chain(merges).chain(deletes).collect()
}

/// Plan table followed by a one-line summary.
pub fn print_plan(report: &DeployReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    let summary = report.summary();

    if report.dry_run && report.project_id.is_none() {
        println!(
            "{prefix}project '{}' does not exist yet and would be created",
            report.project
        );
    }

    if report.plan.is_noop() {
        println!("{prefix}{} '{}': jobs already up to date", "✓".green(), report.project);
        return;
    }

    let mut table = Table::new(plan_rows(&report.plan));
    table.with(Style::rounded());
    println!("{table}");
    println!("{prefix}{}", summary_line(summary));
}

/// Outcome of a completed, non-dry-run deploy.
pub fn print_deploy(report: &DeployReport) {
    if report.project_created {
        println!("{} created project '{}'", "+".green().bold(), report.project);
    }
    if let Some(artifact) = &report.artifact {
        println!(
            "{} uploaded {} (sha256 {})",
            "↑".cyan().bold(),
            artifact.file_name(),
            &artifact.sha256[..artifact.sha256.len().min(12)]
        );
    }
    for result in &report.applied {
        match result {
            ApplyResult::Created { spider_name } => {
                println!("  {}  {spider_name}", "+".green())
            }
            ApplyResult::Updated {
                remote_id,
                spider_name,
            } => println!("  {}  {spider_name} (#{remote_id})", "~".yellow()),
            ApplyResult::Deleted {
                remote_id,
                spider_name,
            } => println!("  {}  {spider_name} (#{remote_id})", "-".red()),
        }
    }

    let elapsed = report.elapsed().num_milliseconds() as f64 / 1000.0;
    println!(
        "{} '{}' deployed: {} in {elapsed:.1}s",
        "✓".green().bold(),
        report.project,
        summary_line(report.summary())
    );
}

fn summary_line(summary: PlanSummary) -> String {
    format!(
        "{} added, {} updated, {} deleted",
        summary.add.to_string().green(),
        summary.merge.to_string().yellow(),
        summary.delete.to_string().red()
    )
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ReportJson {
    project: String,
    project_id: Option<String>,
    project_created: bool,
    dry_run: bool,
    artifact: Option<ArtifactJson>,
    summary: SummaryJson,
    plan: Vec<PlanEntryJson>,
    applied: usize,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct ArtifactJson {
    path: String,
    sha256: String,
}

#[derive(Serialize)]
struct SummaryJson {
    add: usize,
    merge: usize,
    delete: usize,
}

#[derive(Serialize)]
struct PlanEntryJson {
    action: &'static str,
    remote_id: Option<String>,
    #[serde(flatten)]
    job: DesiredJob,
}

fn report_json(report: &DeployReport) -> ReportJson {
    let summary = report.summary();
    let plan = &report.plan;
    let entries = plan
        .to_add
        .iter()
        .map(|job| PlanEntryJson {
            action: "add",
            remote_id: None,
            job: job.clone(),
        })
        .chain(plan.to_merge.iter().map(|m| PlanEntryJson {
            action: "update",
            remote_id: Some(m.remote_id.to_string()),
            job: m.job.clone(),
        }))
        .chain(plan.to_delete.iter().map(|r| PlanEntryJson {
            action: "delete",
            remote_id: Some(r.remote_id.to_string()),
            job: r.job.clone(),
        }))
        .collect();

    ReportJson {
        project: report.project.to_string(),
        project_id: report.project_id.as_ref().map(ToString::to_string),
        project_created: report.project_created,
        dry_run: report.dry_run,
        artifact: report.artifact.as_ref().map(|a| ArtifactJson {
            path: a.path.display().to_string(),
            sha256: a.sha256.clone(),
        }),
        summary: SummaryJson {
            add: summary.add,
            merge: summary.merge,
            delete: summary.delete,
        },
        plan: entries,
        applied: report.applied.len(),
        started_at: report.started_at,
        finished_at: report.finished_at,
    }
}

pub fn print_json(report: &DeployReport) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&report_json(report))
            .context("failed to serialize deploy report")?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use skdeploy_core::{
        reconcile, MergedJob, ProjectId, ProjectName, RemoteId, RemoteJob, Schedule,
    };

    use super::*;

    fn job(spider: &str, minute: &str) -> DesiredJob {
        DesiredJob {
            schedule: Schedule {
                minute: minute.into(),
                ..Schedule::default()
            },
            ..DesiredJob::new(spider)
        }
    }

    fn report(plan: ReconciliationPlan) -> DeployReport {
        let now = Utc::now();
        DeployReport {
            project: ProjectName::from("crawlers"),
            project_id: Some(ProjectId::from("3")),
            project_created: false,
            artifact: None,
            plan,
            applied: Vec::new(),
            dry_run: true,
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn rows_list_adds_then_updates_then_deletes() {
        let plan = ReconciliationPlan {
            to_add: vec![job("new", "5")],
            to_merge: vec![MergedJob {
                remote_id: RemoteId::from("42"),
                job: job("kept", "0"),
            }],
            to_delete: vec![RemoteJob {
                remote_id: RemoteId::from("7"),
                job: job("gone", "1"),
            }],
        };

        let rows = plan_rows(&plan);

        let actions: Vec<_> = rows.iter().map(|r| r.action).collect();
        assert_eq!(actions, ["add", "update", "delete"]);
        assert_eq!(rows[0].remote_id, "-");
        assert_eq!(rows[1].remote_id, "42");
        assert_eq!(rows[2].spider, "gone");
        assert_eq!(rows[0].schedule, "5 * * * *");
    }

    #[test]
    fn json_flattens_job_fields_next_to_action() {
        let remote = vec![RemoteJob {
            remote_id: RemoteId::from("42"),
            job: job("s1", "5"),
        }];
        let plan = reconcile(&[job("s1", "5"), job("s2", "0")], &remote);

        let value = serde_json::to_value(report_json(&report(plan))).unwrap();

        assert_eq!(value["project_id"], "3");
        assert_eq!(value["summary"]["add"], 1);
        assert_eq!(value["summary"]["merge"], 1);
        let entries = value["plan"].as_array().unwrap();
        assert_eq!(entries[0]["action"], "add");
        assert_eq!(entries[0]["spider_name"], "s2");
        assert_eq!(entries[1]["action"], "update");
        assert_eq!(entries[1]["remote_id"], "42");
        assert_eq!(entries[1]["minute"], "5");
    }
}
