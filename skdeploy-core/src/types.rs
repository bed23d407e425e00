//! Job descriptor model shared by the reconciliation engine, the remote
//! client and the CLI.
//!
//! A [`DesiredJob`] is what local configuration asks for; a [`RemoteJob`] is
//! what the scheduler currently holds. Both expose a [`MatchKey`], the only
//! identity signal used when pairing them up.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Schedule field value meaning "every".
pub const WILDCARD: &str = "*";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Name of a scheduler project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectName(pub String);

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProjectName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Service-assigned project identifier. Opaque; only ever echoed back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Service-assigned job identifier (`job_instance_id` on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteId(pub String);

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RemoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RemoteId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Whether a job fires once or on every schedule match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[serde(alias = "onetime")]
    OneTime,
    #[default]
    Periodic,
}

impl RunMode {
    /// Value of the `run_type` field understood by the scheduler.
    pub fn wire_value(self) -> &'static str {
        match self {
            RunMode::OneTime => "onetime",
            RunMode::Periodic => "periodic",
        }
    }

    pub fn from_wire(value: &str) -> Result<Self, ModelError> {
        match value {
            "onetime" | "one_time" => Ok(RunMode::OneTime),
            "periodic" => Ok(RunMode::Periodic),
            other => Err(ModelError::UnknownRunMode(other.to_string())),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::OneTime => write!(f, "one_time"),
            RunMode::Periodic => write!(f, "periodic"),
        }
    }
}

/// Scheduler priority. The integer levels are fixed by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Highest,
}

impl Priority {
    pub fn level(self) -> i64 {
        match self {
            Priority::Low => -1,
            Priority::Normal => 0,
            Priority::High => 1,
            Priority::Highest => 2,
        }
    }

    pub fn from_level(level: i64) -> Result<Self, ModelError> {
        match level {
            -1 => Ok(Priority::Low),
            0 => Ok(Priority::Normal),
            1 => Ok(Priority::High),
            2 => Ok(Priority::Highest),
            other => Err(ModelError::UnknownPriority(other.to_string())),
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ModelError> {
        match name.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "highest" => Ok(Priority::Highest),
            _ => Err(ModelError::UnknownPriority(name.to_string())),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Normal => write!(f, "normal"),
            Priority::High => write!(f, "high"),
            Priority::Highest => write!(f, "highest"),
        }
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Five-field cron expression, kept as the literal strings the operator wrote.
///
/// No normalization happens here: `*/15` and `0,15,30,45` are different
/// schedules as far as matching is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Schedule {
    pub minute: String,
    pub hour: String,
    pub day_of_month: String,
    pub day_of_week: String,
    pub month: String,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            minute: WILDCARD.to_string(),
            hour: WILDCARD.to_string(),
            day_of_month: WILDCARD.to_string(),
            day_of_week: WILDCARD.to_string(),
            month: WILDCARD.to_string(),
        }
    }
}

impl Schedule {
    pub(crate) fn fields(&self) -> [(&'static str, &str); 5] {
        [
            ("minute", &self.minute),
            ("hour", &self.hour),
            ("day_of_month", &self.day_of_month),
            ("day_of_week", &self.day_of_week),
            ("month", &self.month),
        ]
    }
}

/// Rendered in crontab order: minute, hour, day of month, month, day of week.
impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.minute, self.hour, self.day_of_month, self.month, self.day_of_week
        )
    }
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// Identity of a job: spider name plus the five schedule fields, compared as
/// exact strings. Arguments, description, priority and run mode are not part
/// of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchKey<'a> {
    pub spider_name: &'a str,
    pub schedule: &'a Schedule,
}

impl fmt::Display for MatchKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.spider_name, self.schedule)
    }
}

/// One job as requested by local configuration.
///
/// Deserializes from the flat configuration shape (`spider_name`, `minute`,
/// `hour`, ...). Omitted schedule fields become [`WILDCARD`]; an empty
/// `spider_name` or schedule field is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "JobEntry", into = "JobEntry")]
pub struct DesiredJob {
    pub spider_name: String,
    pub spider_arguments: Option<String>,
    pub description: Option<String>,
    pub run_mode: RunMode,
    pub priority: Priority,
    pub schedule: Schedule,
}

impl DesiredJob {
    /// A periodic, normal-priority job running every minute.
    pub fn new(spider_name: impl Into<String>) -> Self {
        Self {
            spider_name: spider_name.into(),
            spider_arguments: None,
            description: None,
            run_mode: RunMode::default(),
            priority: Priority::default(),
            schedule: Schedule::default(),
        }
    }

    pub fn match_key(&self) -> MatchKey<'_> {
        MatchKey {
            spider_name: &self.spider_name,
            schedule: &self.schedule,
        }
    }

    /// Check the invariants configuration must uphold.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.spider_name.trim().is_empty() {
            return Err(ModelError::EmptySpiderName);
        }
        for (field, value) in self.schedule.fields() {
            if value.trim().is_empty() {
                return Err(ModelError::EmptyScheduleField {
                    spider_name: self.spider_name.clone(),
                    field,
                });
            }
        }
        Ok(())
    }
}

/// One job as currently held by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteJob {
    pub remote_id: RemoteId,
    pub job: DesiredJob,
}

impl RemoteJob {
    pub fn match_key(&self) -> MatchKey<'_> {
        self.job.match_key()
    }
}

/// A desired job paired with the remote job it will overwrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedJob {
    pub remote_id: RemoteId,
    pub job: DesiredJob,
}

/// A project as listed by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteProject {
    pub id: ProjectId,
    pub name: ProjectName,
}

/// A packaged build ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Location of the artifact inside the project source directory.
    pub path: PathBuf,
    /// Lowercase hex SHA-256 of the file contents.
    pub sha256: String,
}

impl Artifact {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string())
    }
}

// ---------------------------------------------------------------------------
// Configuration shape
// ---------------------------------------------------------------------------

/// Flat on-disk shape of a [`DesiredJob`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobEntry {
    spider_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    spider_arguments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    run_mode: RunMode,
    #[serde(default)]
    priority: PriorityEntry,
    #[serde(default = "wildcard")]
    minute: String,
    #[serde(default = "wildcard")]
    hour: String,
    #[serde(default = "wildcard")]
    day_of_month: String,
    #[serde(default = "wildcard")]
    day_of_week: String,
    #[serde(default = "wildcard")]
    month: String,
}

/// Priority accepted either by name (`"high"`) or by level (`1`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum PriorityEntry {
    Level(i64),
    Name(String),
}

impl Default for PriorityEntry {
    fn default() -> Self {
        PriorityEntry::Name(Priority::default().to_string())
    }
}

fn wildcard() -> String {
    WILDCARD.to_string()
}

impl TryFrom<JobEntry> for DesiredJob {
    type Error = ModelError;

    fn try_from(entry: JobEntry) -> Result<Self, Self::Error> {
        let priority = match entry.priority {
            PriorityEntry::Level(level) => Priority::from_level(level)?,
            PriorityEntry::Name(name) => Priority::from_name(&name)?,
        };
        let job = DesiredJob {
            spider_name: entry.spider_name,
            spider_arguments: entry.spider_arguments,
            description: entry.description,
            run_mode: entry.run_mode,
            priority,
            schedule: Schedule {
                minute: entry.minute,
                hour: entry.hour,
                day_of_month: entry.day_of_month,
                day_of_week: entry.day_of_week,
                month: entry.month,
            },
        };
        job.validate()?;
        Ok(job)
    }
}

impl From<DesiredJob> for JobEntry {
    fn from(job: DesiredJob) -> Self {
        JobEntry {
            spider_name: job.spider_name,
            spider_arguments: job.spider_arguments,
            description: job.description,
            run_mode: job.run_mode,
            priority: PriorityEntry::Name(job.priority.to_string()),
            minute: job.schedule.minute,
            hour: job.schedule.hour,
            day_of_month: job.schedule.day_of_month,
            day_of_week: job.schedule.day_of_week,
            month: job.schedule.month,
        }
    }
}

/// Parse a JSON array of job objects, as given on the command line.
pub fn parse_job_list(json: &str) -> Result<Vec<DesiredJob>, ModelError> {
    serde_json::from_str(json).map_err(ModelError::JobList)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(ProjectName::from("crawlers").to_string(), "crawlers");
        assert_eq!(ProjectId::from("3").to_string(), "3");
        assert_eq!(RemoteId::from("42").to_string(), "42");
    }

    #[test]
    fn omitted_fields_take_defaults() {
        let jobs = parse_job_list(r#"[{"spider_name": "s1", "minute": "5"}]"#).unwrap();
        let job = &jobs[0];
        assert_eq!(job.schedule.minute, "5");
        assert_eq!(job.schedule.hour, WILDCARD);
        assert_eq!(job.schedule.month, WILDCARD);
        assert_eq!(job.run_mode, RunMode::Periodic);
        assert_eq!(job.priority, Priority::Normal);
        assert!(job.spider_arguments.is_none());
    }

    #[test]
    fn priority_accepts_name_or_level() {
        let jobs = parse_job_list(
            r#"[{"spider_name": "a", "priority": "highest"},
                {"spider_name": "b", "priority": -1}]"#,
        )
        .unwrap();
        assert_eq!(jobs[0].priority, Priority::Highest);
        assert_eq!(jobs[1].priority, Priority::Low);
    }

    #[test]
    fn missing_spider_name_is_rejected() {
        let err = parse_job_list(r#"[{"minute": "5"}]"#).unwrap_err();
        assert!(err.to_string().contains("spider_name"), "got: {err}");
    }

    #[test]
    fn empty_spider_name_is_rejected() {
        let err = parse_job_list(r#"[{"spider_name": "  "}]"#).unwrap_err();
        assert!(err.to_string().contains("spider_name"), "got: {err}");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_job_list(r#"[{"spider_name": "s", "minutes": "5"}]"#).unwrap_err();
        assert!(err.to_string().contains("minutes"), "got: {err}");
    }

    #[test]
    fn unknown_priority_is_rejected() {
        assert!(parse_job_list(r#"[{"spider_name": "s", "priority": 7}]"#).is_err());
        assert!(parse_job_list(r#"[{"spider_name": "s", "priority": "urgent"}]"#).is_err());
    }

    #[test]
    fn run_mode_accepts_wire_spelling() {
        let jobs = parse_job_list(r#"[{"spider_name": "s", "run_mode": "onetime"}]"#).unwrap();
        assert_eq!(jobs[0].run_mode, RunMode::OneTime);
    }

    #[test]
    fn match_key_ignores_non_identity_fields() {
        let mut a = DesiredJob::new("s1");
        let mut b = DesiredJob::new("s1");
        a.priority = Priority::High;
        a.description = Some("nightly".into());
        b.spider_arguments = Some("a=1".into());
        b.run_mode = RunMode::OneTime;
        assert_eq!(a.match_key(), b.match_key());

        b.schedule.minute = "*/15".into();
        a.schedule.minute = "0,15,30,45".into();
        assert_ne!(a.match_key(), b.match_key());
    }

    #[test]
    fn serializes_back_to_flat_shape() {
        let mut job = DesiredJob::new("s1");
        job.schedule.hour = "3".into();
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["spider_name"], "s1");
        assert_eq!(value["hour"], "3");
        assert_eq!(value["priority"], "normal");
        assert!(value.get("schedule").is_none());
    }

    #[test]
    fn schedule_displays_in_crontab_order() {
        let schedule = Schedule {
            minute: "0".into(),
            hour: "4".into(),
            day_of_month: "1".into(),
            day_of_week: "mon".into(),
            month: "6".into(),
        };
        assert_eq!(schedule.to_string(), "0 4 1 6 mon");
    }
}
