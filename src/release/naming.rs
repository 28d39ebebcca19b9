//! Tag, branch and commit message conventions.

use crate::version::{VersionBump, VersionScheme};
use crate::workspace::ReleaseUnit;
use semver::Version;

/// Branches major and minor releases are cut from
pub const RELEASE_SOURCE_BRANCHES: [&str; 3] = ["main", "next", "lts"];

/// Prefix of release branches
pub const RELEASE_BRANCH_PREFIX: &str = "release/";

/// Tag marking a released version: `<unit>_v<version>`
pub fn tag_name(unit: &ReleaseUnit, version: &Version) -> String {
    format!("{}{version}", tag_prefix(unit))
}

/// Prefix shared by every release tag of `unit`
pub fn tag_prefix(unit: &ReleaseUnit) -> String {
    format!("{unit}_v")
}

/// Version a release tag of `unit` marks, if `tag` is one
pub fn version_from_tag(unit: &ReleaseUnit, tag: &str) -> Option<Version> {
    let version = tag.strip_prefix(&tag_prefix(unit))?;
    Version::parse(version).ok()
}

/// Release branch: `release/<unit>_v<major>.<minor>`.
///
/// Internal-scheme versions keep their fixed public version and name the
/// branch after the internal major and minor instead.
pub fn release_branch_name(unit: &ReleaseUnit, version: &Version) -> String {
    let series = match VersionScheme::detect(version) {
        VersionScheme::Semver => format!("{}.{}", version.major, version.minor),
        VersionScheme::Internal => {
            let parts: Vec<&str> = version.pre.as_str().split('.').take(3).collect();
            format!(
                "{}.{}.{}-{}",
                version.major,
                version.minor,
                version.patch,
                parts.join(".")
            )
        }
    };
    format!("{RELEASE_BRANCH_PREFIX}{unit}_v{series}")
}

/// Branch carrying a version bump: `bump_<unit>_v<to>`
pub fn bump_branch_name(unit: &ReleaseUnit, to: &Version) -> String {
    format!("bump_{unit}_v{to}")
}

/// Branch carrying released-dependency updates
pub fn deps_branch_name(unit: &ReleaseUnit, version: &Version) -> String {
    format!("bump_deps_{unit}_v{version}")
}

/// `[bump] <unit>: <from> => <to> (<bumpType>)`
pub fn bump_commit_message(
    unit: &ReleaseUnit,
    from: &Version,
    to: &Version,
    bump: VersionBump,
) -> String {
    format!("[bump] {unit}: {from} => {to} ({bump})")
}

/// Commit message for released-dependency updates
pub fn deps_commit_message(unit: &ReleaseUnit) -> String {
    format!("[bump] {unit}: update dependencies to released versions")
}

/// Whether `branch` follows the convention for releasing with `bump`
pub fn branch_matches_convention(bump: VersionBump, branch: &str) -> bool {
    match bump {
        VersionBump::Patch => branch.starts_with(RELEASE_BRANCH_PREFIX),
        VersionBump::Major | VersionBump::Minor => RELEASE_SOURCE_BRANCHES.contains(&branch),
    }
}
