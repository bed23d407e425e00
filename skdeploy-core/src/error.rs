//! Error types for skdeploy-core.

use thiserror::Error;

/// Errors raised while building job descriptors from configuration or from
/// scheduler responses.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A record returned by the scheduler lacks a field this client relies on.
    #[error("malformed {record} record: missing field `{field}`")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },

    /// A field is present but holds a value of the wrong shape.
    #[error("malformed {record} record: field `{field}` has unexpected value {value}")]
    InvalidField {
        record: &'static str,
        field: &'static str,
        value: String,
    },

    /// The response body was not the JSON shape the endpoint promises.
    #[error("malformed response: expected {expected}")]
    UnexpectedShape { expected: &'static str },

    #[error("unknown priority '{0}'; expected: low, normal, high, highest (or -1..=2)")]
    UnknownPriority(String),

    #[error("unknown run mode '{0}'; expected: one_time, periodic")]
    UnknownRunMode(String),

    /// Configuration error: every job needs a spider to run.
    #[error("job definition has an empty `spider_name`")]
    EmptySpiderName,

    #[error("job '{spider_name}' has an empty `{field}` schedule field")]
    EmptyScheduleField {
        spider_name: String,
        field: &'static str,
    },

    /// The job list itself could not be parsed.
    #[error("invalid job list: {0}")]
    JobList(serde_json::Error),
}
