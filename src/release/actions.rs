//! Handlers that mutate the repository.

use super::context::{Collaborators, ReleaseContext};
use super::facts::bump_target;
use crate::cli::OutputManager;
use crate::error::Result;
use crate::registry::PackageRegistry;
use crate::runner::CommandRunner;
use crate::state::{Machine, State};
use crate::version::{VersionBump, VersionUpdater};
use crate::workspace::{MonoRepo, find_prerelease_dependencies, released_counterpart};
use semver::Version;
use std::collections::BTreeMap;

async fn gate_bump<C: Collaborators>(
    expected: VersionBump,
    machine: &mut Machine<'_>,
    log: &OutputManager,
    ctx: &ReleaseContext<C>,
) -> Result<bool> {
    if ctx.bump_type() == Some(expected) {
        log.verbose(&format!("Continuing with a {expected} release"));
        machine.signal_success()?;
    } else {
        machine.signal_failure()?;
    }
    Ok(true)
}

/// Entry to the major sub-flow
pub async fn do_major_release<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }
    gate_bump(VersionBump::Major, machine, log, ctx).await
}

/// Entry to the minor sub-flow
pub async fn do_minor_release<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }
    gate_bump(VersionBump::Minor, machine, log, ctx).await
}

/// Entry to the patch sub-flow
pub async fn do_patch_release<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }
    gate_bump(VersionBump::Patch, machine, log, ctx).await
}

/// Move prerelease dependency ranges to their released versions.
///
/// Files are only written when every prerelease dependency has a released
/// counterpart on the registry; otherwise the blocking dependencies are
/// listed and the handler fails without touching anything.
pub async fn do_bump_released_dependencies<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let unit = ctx.unit()?.clone();
    let prerelease = find_prerelease_dependencies(&ctx.repo, &unit);
    if prerelease.is_empty() {
        log.info("No prerelease dependencies to bump");
        machine.signal_success()?;
        return Ok(true);
    }

    let mut updates: BTreeMap<String, Version> = BTreeMap::new();
    let mut blocking = Vec::new();
    for (dependency, version) in &prerelease.dependencies {
        let released = released_counterpart(version);
        if ctx.registry.is_published(dependency, &released).await? {
            updates.insert(dependency.clone(), released);
        } else {
            blocking.push(format!("{dependency}@{version}"));
        }
    }

    if !blocking.is_empty() {
        log.warn(&format!(
            "{unit} depends on prerelease versions that have not been released:"
        ));
        for dependency in &blocking {
            log.indent(dependency);
        }
        machine.signal_failure()?;
        return Ok(true);
    }

    let result = VersionUpdater::new(ctx.repo.packages_in(&unit))
        .update_dependencies(&updates)
        .await?;
    for (dependency, version) in &updates {
        log.success(&format!("{dependency} -> {version}"));
    }
    log.verbose(&format!(
        "Rewrote {} range(s) in {} file(s)",
        result.dependencies_updated,
        result.modified_files.len()
    ));

    ctx.repo = MonoRepo::load(ctx.repo.root())?;
    machine.signal_success()?;
    Ok(true)
}

/// Bump every package of the unit and refresh the lockfile.
///
/// A failed install leaves the bumped manifests in place; the next run
/// sees the unit as bumped and does not bump it again.
pub async fn do_release_group_bump<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let unit = ctx.unit()?.clone();
    let Some(bump) = ctx.bump_type() else {
        log.error("No bump type selected; pass --type");
        machine.signal_failure()?;
        return Ok(true);
    };
    let release_version = ctx.release_version()?.clone();
    let scheme = ctx.scheme_for(&release_version);
    let target = bump_target(&release_version, bump, scheme)?;
    let on_disk = ctx.repo.version_of(&unit)?;

    if on_disk == target {
        log.info(&format!("{unit} is already at {target}"));
    } else {
        let result = VersionUpdater::new(ctx.repo.packages_in(&unit))
            .set_version(&target)
            .await?;
        ctx.repo.record_version(&unit, &target);
        log.success(&format!(
            "Bumped {unit} {on_disk} => {target} ({} package(s))",
            result.packages_updated
        ));
    }

    if ctx.flags.should_install {
        let command = ctx.repo.config().commands.install.clone();
        log.info(&format!("Running {command}"));
        let output = ctx.runner.run(&command, ctx.repo.root()).await?;
        if !output.success {
            log.error(&format!("'{command}' failed; the version bump was left in place"));
            for line in output.stderr.lines().take(20) {
                log.indent(line);
            }
            machine.signal_failure()?;
            return Ok(true);
        }
    }

    machine.signal_success()?;
    Ok(true)
}
