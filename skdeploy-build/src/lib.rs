//! # skdeploy-build
//!
//! Packages a project source tree into the artifact the scheduler accepts.
//!
//! The orchestrator depends on the [`Packager`] trait; [`EggBuilder`] runs
//! `setup.py bdist_egg` in a throwaway directory and copies the single egg it
//! produces next to the sources.

pub mod egg;
pub mod error;

pub use egg::{sha256_file, EggBuilder};
pub use error::BuildError;

use skdeploy_core::Artifact;

/// Something that can produce a deployable artifact.
pub trait Packager {
    fn package(&self) -> Result<Artifact, BuildError>;
}
