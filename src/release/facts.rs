//! Durable facts shared by the checks and the resume computation.

use super::context::{Collaborators, ReleaseContext};
use super::naming::{release_branch_name, tag_name, tag_prefix, version_from_tag};
use crate::error::Result;
use crate::git::GitOperations;
use crate::registry::PackageRegistry;
use crate::state::{ReleaseFacts, derive_release_version, infer_bump};
use crate::version::{VersionBump, VersionBumper, VersionScheme};
use crate::workspace::{PackageInfo, ReleaseUnit};
use semver::Version;
use std::collections::BTreeSet;

/// Suffix of the devDependency alias holding a package's previous release
pub const PREVIOUS_ALIAS_SUFFIX: &str = "-previous";

/// Version the manifests carry once `release_version` has been bumped
pub fn bump_target(
    release_version: &Version,
    bump: VersionBump,
    scheme: VersionScheme,
) -> Result<Version> {
    VersionBumper::new(release_version.clone(), scheme).bump(bump)
}

/// A version is released when its tag exists, or when every publishable
/// package of the unit has it on the registry.
pub async fn is_released<C: Collaborators>(
    ctx: &ReleaseContext<C>,
    unit: &ReleaseUnit,
    version: &Version,
) -> Result<bool> {
    let tag = tag_name(unit, version);
    if ctx.git.tag_exists(&tag).await? {
        log::debug!("{tag} exists");
        return Ok(true);
    }

    let publishable: Vec<&PackageInfo> = ctx
        .repo
        .packages_in(unit)
        .into_iter()
        .filter(|p| p.is_publishable())
        .collect();
    if publishable.is_empty() {
        return Ok(false);
    }
    for package in publishable {
        if !ctx.registry.is_published(&package.name, version).await? {
            log::debug!("{}@{version} is not published", package.name);
            return Ok(false);
        }
    }
    Ok(true)
}

/// Versions of `unit` already released, from tags and the registry
pub async fn released_versions<C: Collaborators>(
    ctx: &ReleaseContext<C>,
    unit: &ReleaseUnit,
) -> Result<Vec<Version>> {
    let mut versions: BTreeSet<Version> = ctx
        .git
        .list_tags(&tag_prefix(unit))
        .await?
        .iter()
        .filter_map(|tag| version_from_tag(unit, tag))
        .collect();

    if let Some(package) = ctx
        .repo
        .packages_in(unit)
        .into_iter()
        .find(|p| p.is_publishable())
    {
        versions.extend(ctx.registry.published_versions(&package.name).await?);
    }
    Ok(versions.into_iter().collect())
}

/// Work out which version of `unit` is being released.
///
/// A previous release pinned by its bump stays the release version while
/// its type test baselines still need preparing; patch releases have no
/// such step.
pub async fn determine_release_version<C: Collaborators>(
    ctx: &ReleaseContext<C>,
    unit: &ReleaseUnit,
    on_disk: &Version,
) -> Result<Version> {
    if let Some(explicit) = &ctx.explicit_release_version {
        return Ok(explicit.clone());
    }
    let released = released_versions(ctx, unit).await?;
    let branch_exists = ctx
        .git
        .branch_exists(&release_branch_name(unit, on_disk))
        .await?;
    let packages = ctx.repo.packages_in(unit);
    let cycle_finished = |previous: &Version, bump: VersionBump| {
        let finished =
            bump == VersionBump::Patch || unprepared_type_tests(&packages, previous).is_empty();
        if finished {
            log::info!("{unit} {previous} is released and bumped; {on_disk} is next");
        }
        finished
    };
    Ok(derive_release_version(
        on_disk,
        ctx.bump_type(),
        ctx.scheme_for(on_disk),
        &released,
        branch_exists,
        None,
        cycle_finished,
    ))
}

/// Packages whose `<name>-previous` alias does not point at `release_version`
pub fn unprepared_type_tests<'a>(
    packages: &[&'a PackageInfo],
    release_version: &Version,
) -> Vec<&'a PackageInfo> {
    packages
        .iter()
        .copied()
        .filter(|package| {
            let alias = format!("{}{PREVIOUS_ALIAS_SUFFIX}", package.name);
            let Some(range) = package.dev_dependencies.get(&alias) else {
                return false;
            };
            let expected = format!("npm:{}@{release_version}", package.name);
            range.trim() != expected
        })
        .collect()
}

/// Gather every fact the resume computation needs, without mutating
/// anything.
pub async fn gather_facts<C: Collaborators>(ctx: &ReleaseContext<C>) -> Result<ReleaseFacts> {
    let current_branch = ctx.git.current_branch().await?;
    let unresolved = ReleaseFacts {
        current_branch: current_branch.clone(),
        ..Default::default()
    };

    let Ok(unit) = ctx
        .repo
        .resolve(&ctx.release_group_or_package, ctx.unit_hint)
    else {
        return Ok(unresolved);
    };
    let Ok(on_disk) = ctx.repo.version_of(&unit) else {
        return Ok(unresolved);
    };

    let scheme = ctx.repo.scheme_of(&unit, &on_disk);
    let release_version = match &ctx.release_version {
        Some(version) => version.clone(),
        None => determine_release_version(ctx, &unit, &on_disk).await?,
    };
    let bump = ctx
        .bump_type()
        .or_else(|| infer_bump(&release_version, &on_disk, scheme));
    let bump_target = match bump {
        Some(bump) => Some(bump_target(&release_version, bump, scheme)?),
        None => None,
    };
    let bumped = bump_target.as_ref().is_some_and(|target| *target == on_disk);
    let released = is_released(ctx, &unit, &release_version).await?;
    let packages = ctx.repo.packages_in(&unit);
    let type_tests_prepared = unprepared_type_tests(&packages, &release_version).is_empty();
    let release_branch = release_branch_name(&unit, &release_version);
    let release_branch_exists = ctx.git.branch_exists(&release_branch).await?;

    Ok(ReleaseFacts {
        unit_resolved: true,
        on_disk_version: Some(on_disk),
        release_version: Some(release_version),
        bump_target,
        released,
        bumped,
        type_tests_prepared,
        current_branch,
        release_branch: Some(release_branch),
        release_branch_exists,
    })
}
