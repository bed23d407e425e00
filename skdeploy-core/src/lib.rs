//! # skdeploy-core
//!
//! Job descriptor model and reconciliation engine.
//!
//! - [`types`]: desired/remote job values and their [`MatchKey`]
//! - [`wire`]: scheduler form payloads and response parsing
//! - [`reconcile`]: the pure add/merge/delete planner
//! - [`error`]: [`ModelError`]

pub mod error;
pub mod reconcile;
pub mod types;
pub mod wire;

pub use error::ModelError;
pub use reconcile::{reconcile, PlanSummary, ReconciliationPlan};
pub use types::{
    parse_job_list, Artifact, DesiredJob, MatchKey, MergedJob, Priority, ProjectId, ProjectName,
    RemoteId, RemoteJob, RemoteProject, RunMode, Schedule, WILDCARD,
};
