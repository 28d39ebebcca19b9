//! Version management for release units.
//!
//! This module computes bumped versions under the supported version schemes
//! and rewrites package.json manifests to carry them.

mod bumper;
mod updater;

pub use bumper::{VersionBump, VersionBumper, VersionScheme, parse_version};
pub use updater::{
    DEPENDENCY_SECTIONS, ManifestEditor, UpdateResult, VersionUpdater, rewrite_range, save_all,
};
