//! Recomputing the machine's starting point from durable repository facts.
//!
//! Nothing about a release attempt is persisted between invocations. Each
//! run gathers facts from git, the manifests and the registry, and these
//! pure functions turn them into a release version and a start state.

use super::states::{Stage, State};
use crate::version::{VersionBump, VersionBumper, VersionScheme};
use semver::Version;

/// What a run knows about the unit before the machine starts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseFacts {
    /// The requested name resolved to a release group or package
    pub unit_resolved: bool,
    /// Version currently in the manifests
    pub on_disk_version: Option<Version>,
    /// Version being released, see [`derive_release_version`]
    pub release_version: Option<Version>,
    /// Version the manifests should carry once the release is bumped
    pub bump_target: Option<Version>,
    /// The release version is tagged or published
    pub released: bool,
    /// The manifests already carry the bump target
    pub bumped: bool,
    /// Type test baselines point at the release version
    pub type_tests_prepared: bool,
    /// Checked-out branch
    pub current_branch: String,
    /// Release branch name for the release version
    pub release_branch: Option<String>,
    /// The release branch exists locally or on a remote
    pub release_branch_exists: bool,
}

/// State a run should start in.
///
/// A unit that cannot be resolved restarts at its validation check; a
/// released, bumped and prepared unit is complete; every other position is
/// recomputed by walking the checks again from `Init`, which is cheap and
/// re-reads every fact.
pub fn resume(facts: &ReleaseFacts) -> State {
    if !facts.unit_resolved {
        return State::preflight(Stage::CheckValidReleaseGroup);
    }
    if facts.released && facts.bumped && facts.type_tests_prepared {
        return State::complete();
    }
    State::init()
}

/// Newest released version whose bump produced `on_disk`, with that bump
pub fn bumped_from(
    on_disk: &Version,
    bump: Option<VersionBump>,
    scheme: VersionScheme,
    released: &[Version],
) -> Option<(Version, VersionBump)> {
    let bumps: &[VersionBump] = match &bump {
        Some(bump) => std::slice::from_ref(bump),
        None => &[VersionBump::Major, VersionBump::Minor, VersionBump::Patch],
    };
    released
        .iter()
        .filter(|candidate| *candidate < on_disk)
        .filter_map(|candidate| {
            let bumper = VersionBumper::new(candidate.clone(), scheme);
            bumps
                .iter()
                .find(|b| bumper.bump(**b).is_ok_and(|next| next == *on_disk))
                .map(|b| (candidate.clone(), *b))
        })
        .max_by(|a, b| a.0.cmp(&b.0))
}

/// Determine which version is being released.
///
/// An explicit version wins. A released on-disk version, or one whose
/// release branch already exists, is the release version. When the on-disk
/// version is the bump of an already released version, that release stays
/// the release version until `cycle_finished` reports its post-release work
/// done; from then on the on-disk version is released next.
pub fn derive_release_version(
    on_disk: &Version,
    bump: Option<VersionBump>,
    scheme: VersionScheme,
    released: &[Version],
    on_disk_release_branch_exists: bool,
    explicit: Option<&Version>,
    cycle_finished: impl Fn(&Version, VersionBump) -> bool,
) -> Version {
    if let Some(explicit) = explicit {
        return explicit.clone();
    }
    if released.contains(on_disk) || on_disk_release_branch_exists {
        return on_disk.clone();
    }

    match bumped_from(on_disk, bump, scheme, released) {
        Some((previous, bump)) if !cycle_finished(&previous, bump) => previous,
        _ => on_disk.clone(),
    }
}

/// Bump type that turns `from` into `to`, if any
pub fn infer_bump(from: &Version, to: &Version, scheme: VersionScheme) -> Option<VersionBump> {
    let bumper = VersionBumper::new(from.clone(), scheme);
    [VersionBump::Major, VersionBump::Minor, VersionBump::Patch]
        .into_iter()
        .find(|b| bumper.bump(*b).is_ok_and(|next| next == *to))
}
