//! # skdeploy-sync
//!
//! Deployment orchestration: package, publish, reconcile and apply.
//!
//! Call [`pipeline::run`] with a [`RemoteSync`](skdeploy_client::RemoteSync)
//! implementation and a [`Packager`](skdeploy_build::Packager).

pub mod error;
pub mod pipeline;
pub mod report;

pub use error::{DeployError, RemoteState, Stage};
pub use report::{ApplyResult, DeployReport};
