//! Monorepo analysis: packages, release groups and their dependencies.
//!
//! This module discovers package.json manifests, groups them into release
//! units, and answers the dependency questions the release checks ask.

mod analyzer;
mod config;
mod dependency;
mod installed;

pub use analyzer::{MonoRepo, PackageInfo, ReleaseGroupInfo, ReleaseUnit, UnitKind};
pub use config::{CONFIG_FILE, CommandsConfig, PolicyConfig, ReleaseGroupConfig, RepoConfig};
pub use dependency::{
    PrereleaseDependencies, find_prerelease_dependencies, is_prerelease, pinned_version,
    released_counterpart,
};
pub use installed::{MissingDependency, find_missing_dependencies, resolve_module};
