//! Scheduler wire shapes.
//!
//! Job create/update requests are form-encoded with the scheduler's own field
//! names (`desc`, `run_type`, `cron_minutes`, ...). Listings come back as JSON
//! arrays. Parsing is strict: a record missing a field is a [`ModelError`],
//! never silently defaulted.

use serde_json::{Map, Value};

use crate::error::ModelError;
use crate::types::{
    DesiredJob, Priority, ProjectId, ProjectName, RemoteId, RemoteJob, RemoteProject, RunMode,
    Schedule,
};

const JOB: &str = "job";
const PROJECT: &str = "project";

/// Form fields for a job create or update request, in a fixed order.
///
/// Absent optional values are sent as empty strings.
pub fn job_form(job: &DesiredJob) -> Vec<(&'static str, String)> {
    vec![
        ("spider_name", job.spider_name.clone()),
        (
            "spider_arguments",
            job.spider_arguments.clone().unwrap_or_default(),
        ),
        ("desc", job.description.clone().unwrap_or_default()),
        ("priority", job.priority.level().to_string()),
        ("run_type", job.run_mode.wire_value().to_string()),
        ("cron_minutes", job.schedule.minute.clone()),
        ("cron_hour", job.schedule.hour.clone()),
        ("cron_day_of_month", job.schedule.day_of_month.clone()),
        ("cron_day_of_week", job.schedule.day_of_week.clone()),
        ("cron_month", job.schedule.month.clone()),
    ]
}

/// Parse the body of a job listing.
pub fn parse_remote_jobs(body: &Value) -> Result<Vec<RemoteJob>, ModelError> {
    let Some(items) = body.as_array() else {
        return Err(ModelError::UnexpectedShape {
            expected: "a JSON array of jobs",
        });
    };
    items.iter().map(parse_remote_job).collect()
}

/// Parse one job record.
pub fn parse_remote_job(value: &Value) -> Result<RemoteJob, ModelError> {
    let obj = object(value, "a JSON object per job")?;

    let remote_id = RemoteId(id_field(obj, JOB, "job_instance_id")?);
    let priority = match required(obj, JOB, "priority")? {
        Value::Number(n) => {
            let level = n.as_i64().ok_or_else(|| invalid(JOB, "priority", &n.to_string()))?;
            Priority::from_level(level)?
        }
        // Some deployments echo form values back as strings.
        Value::String(s) => match s.parse::<i64>() {
            Ok(level) => Priority::from_level(level)?,
            Err(_) => Priority::from_name(s)?,
        },
        other => return Err(invalid(JOB, "priority", &other.to_string())),
    };
    let run_mode = RunMode::from_wire(&string_field(obj, JOB, "run_type")?)?;

    let job = DesiredJob {
        spider_name: string_field(obj, JOB, "spider_name")?,
        spider_arguments: nullable_string_field(obj, JOB, "spider_arguments")?,
        description: nullable_string_field(obj, JOB, "desc")?,
        run_mode,
        priority,
        schedule: Schedule {
            minute: string_field(obj, JOB, "cron_minutes")?,
            hour: string_field(obj, JOB, "cron_hour")?,
            day_of_month: string_field(obj, JOB, "cron_day_of_month")?,
            day_of_week: string_field(obj, JOB, "cron_day_of_week")?,
            month: string_field(obj, JOB, "cron_month")?,
        },
    };

    Ok(RemoteJob { remote_id, job })
}

/// Parse the body of a project listing.
pub fn parse_projects(body: &Value) -> Result<Vec<RemoteProject>, ModelError> {
    let Some(items) = body.as_array() else {
        return Err(ModelError::UnexpectedShape {
            expected: "a JSON array of projects",
        });
    };
    items
        .iter()
        .map(|item| {
            let obj = object(item, "a JSON object per project")?;
            Ok(RemoteProject {
                id: ProjectId(id_field(obj, PROJECT, "project_id")?),
                name: ProjectName(string_field(obj, PROJECT, "project_name")?),
            })
        })
        .collect()
}

/// Parse the body returned when a project is created.
pub fn parse_created_project(body: &Value) -> Result<ProjectId, ModelError> {
    let obj = object(body, "a JSON object for the created project")?;
    Ok(ProjectId(id_field(obj, PROJECT, "project_id")?))
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn object<'a>(
    value: &'a Value,
    expected: &'static str,
) -> Result<&'a Map<String, Value>, ModelError> {
    value
        .as_object()
        .ok_or(ModelError::UnexpectedShape { expected })
}

fn required<'a>(
    obj: &'a Map<String, Value>,
    record: &'static str,
    field: &'static str,
) -> Result<&'a Value, ModelError> {
    obj.get(field)
        .ok_or(ModelError::MissingField { record, field })
}

fn string_field(
    obj: &Map<String, Value>,
    record: &'static str,
    field: &'static str,
) -> Result<String, ModelError> {
    match required(obj, record, field)? {
        Value::String(s) => Ok(s.clone()),
        other => Err(invalid(record, field, &other.to_string())),
    }
}

/// Present, but `null` stands for "not set".
fn nullable_string_field(
    obj: &Map<String, Value>,
    record: &'static str,
    field: &'static str,
) -> Result<Option<String>, ModelError> {
    match required(obj, record, field)? {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(invalid(record, field, &other.to_string())),
    }
}

/// Identifiers arrive as integers but are treated as opaque strings.
fn id_field(
    obj: &Map<String, Value>,
    record: &'static str,
    field: &'static str,
) -> Result<String, ModelError> {
    match required(obj, record, field)? {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        other => Err(invalid(record, field, &other.to_string())),
    }
}

fn invalid(record: &'static str, field: &'static str, value: &str) -> ModelError {
    ModelError::InvalidField {
        record,
        field,
        value: value.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
