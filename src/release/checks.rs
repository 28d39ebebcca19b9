//! Precondition checks.
//!
//! Every check fires exactly one of `success`/`failure` (or, for the bump
//! type check, the named bump action) and returns `true`. User-actionable
//! problems are reported through the output manager and a `failure`
//! transition; only collaborator I/O errors and machine invariant
//! violations are returned as errors.

use super::context::{Collaborators, EXIT_USAGE, ReleaseContext};
use super::facts::{bump_target, determine_release_version, is_released, unprepared_type_tests};
use super::naming::{
    branch_matches_convention, bump_branch_name, bump_commit_message, deps_branch_name,
    deps_commit_message, release_branch_name,
};
use crate::cli::OutputManager;
use crate::error::{MachineError, Result};
use crate::git::GitOperations;
use crate::runner::{CommandRunner, UserInput};
use crate::state::{Action, Machine, State, infer_bump};
use crate::version::VersionBump;
use crate::workspace::{ReleaseUnit, find_missing_dependencies, find_prerelease_dependencies};
use semver::Version;

/// Resolve the requested name to a release group or package and settle
/// the version being released.
pub async fn check_valid_release_group<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let unit = match ctx.repo.resolve(&ctx.release_group_or_package, ctx.unit_hint) {
        Ok(unit) => unit,
        Err(e) => {
            log.error(&e.to_string());
            for suggestion in e.recovery_suggestions() {
                log.indent(&suggestion);
            }
            machine.signal_failure()?;
            return Ok(true);
        }
    };
    let on_disk = match ctx.repo.version_of(&unit) {
        Ok(version) => version,
        Err(e) => {
            log.error(&e.to_string());
            machine.signal_failure()?;
            return Ok(true);
        }
    };

    ctx.version_scheme = Some(ctx.repo.scheme_of(&unit, &on_disk));
    if ctx.release_version.is_none() {
        let version = determine_release_version(ctx, &unit, &on_disk).await?;
        ctx.release_version = Some(version);
    }
    log.success(&format!(
        "Releasing {unit} {} (on disk: {on_disk})",
        ctx.release_version()?
    ));
    ctx.unit = Some(unit);
    machine.signal_success()?;
    Ok(true)
}

/// Run a fix-mode command and require that it leaves no changes behind.
///
/// The command's own exit status is ignored; only the working tree counts.
async fn run_fix_and_diff<C: Collaborators>(
    ctx: &ReleaseContext<C>,
    log: &OutputManager,
    label: &str,
    command: &str,
) -> Result<bool> {
    if !ctx.git.status().await?.is_empty() {
        log.error(&format!(
            "The working tree must be clean before running the {label}"
        ));
        log.indent("Commit or stash your changes and try again");
        return Ok(false);
    }

    log.info(&format!("Running {label}: {command}"));
    let output = ctx.runner.run(command, ctx.repo.root()).await?;
    if !output.success {
        log.verbose(&format!("{label} exited with {:?}", output.code));
    }

    let status = ctx.git.status().await?;
    if status.is_empty() {
        log.success(&format!("{label} made no changes"));
        return Ok(true);
    }
    log.error(&format!("The {label} changed files:"));
    for line in status.lines() {
        log.indent(line);
    }
    log.indent("Review and commit the changes, then run the release again");
    Ok(false)
}

/// Whether a policy-class check runs. Disabling policy checks is honoured
/// only where the unit/branch defaults do not require them.
async fn policy_applies<C: Collaborators>(
    ctx: &ReleaseContext<C>,
    log: &OutputManager,
    label: &str,
) -> Result<bool> {
    if ctx.flags.should_check_policy {
        return Ok(true);
    }

    let group = match ctx.unit()? {
        ReleaseUnit::Group(name) => Some(name.as_str()),
        ReleaseUnit::Package(_) => None,
    };
    let branch = ctx.git.current_branch().await?;
    if !ctx.repo.config().policy_required(group, &branch) {
        log.warn(&format!("Skipping the {label}"));
        return Ok(false);
    }
    log.warn(&format!(
        "The {label} cannot be skipped on {branch}; running it anyway"
    ));
    Ok(true)
}

/// The repository policy pass must leave no diff
pub async fn check_policy<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    if !policy_applies(ctx, log, "policy check").await? {
        machine.signal_success()?;
        return Ok(true);
    }
    let Some(command) = ctx.repo.config().commands.policy.clone() else {
        log.verbose("No policy command configured");
        machine.signal_success()?;
        return Ok(true);
    };

    if run_fix_and_diff(ctx, log, "policy check", &command).await? {
        machine.signal_success()?;
    } else {
        machine.signal_failure()?;
    }
    Ok(true)
}

/// Same protocol and gating as the policy check, for the assert tagging pass
pub async fn check_assert_tagging<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    if !policy_applies(ctx, log, "assert tagging").await? {
        machine.signal_success()?;
        return Ok(true);
    }
    let Some(command) = ctx.repo.config().commands.assert_tagging.clone() else {
        log.verbose("No assert tagging command configured");
        machine.signal_success()?;
        return Ok(true);
    };

    if run_fix_and_diff(ctx, log, "assert tagging", &command).await? {
        machine.signal_success()?;
    } else {
        machine.signal_failure()?;
    }
    Ok(true)
}

/// A remote pointing at the configured upstream must exist
pub async fn check_has_remote<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let Some(upstream) = ctx.repo.config().upstream.clone() else {
        log.verbose("No upstream configured; remote checks are skipped");
        machine.signal_success()?;
        return Ok(true);
    };

    match ctx.git.get_remote(&upstream).await? {
        Some(remote) => {
            log.verbose(&format!("Upstream remote: {remote}"));
            ctx.remote = Some(remote);
            machine.signal_success()?;
        }
        None => {
            log.error(&format!("No git remote points at {upstream}"));
            log.indent(&format!("git remote add upstream https://github.com/{upstream}.git"));
            machine.signal_failure()?;
        }
    }
    Ok(true)
}

/// The local branch must match its remote counterpart
pub async fn check_branch_up_to_date<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    if !ctx.flags.should_check_branch_update {
        log.warn("Skipping the branch update check");
        machine.signal_success()?;
        return Ok(true);
    }
    let Some(remote) = ctx.remote.clone() else {
        log.verbose("No upstream remote; skipping the branch update check");
        machine.signal_success()?;
        return Ok(true);
    };

    let branch = ctx.git.current_branch().await?;
    if ctx.git.is_branch_up_to_date(&branch, &remote).await? {
        machine.signal_success()?;
    } else {
        log.error(&format!("{branch} is not up to date with {remote}/{branch}"));
        log.indent(&format!("git pull {remote} {branch}"));
        machine.signal_failure()?;
    }
    Ok(true)
}

/// Every dependency of the unit must resolve through `node_modules`
pub async fn check_dependencies_installed<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    if !ctx.flags.should_install {
        log.warn("Skipping the dependency installation check");
        machine.signal_success()?;
        return Ok(true);
    }

    let packages = ctx.packages()?;
    let missing = find_missing_dependencies(&packages, ctx.repo.root()).await?;
    if missing.is_empty() {
        log.success("Dependencies are installed");
        machine.signal_success()?;
        return Ok(true);
    }

    log.error("Dependencies are not installed:");
    for dependency in &missing {
        log.indent(&format!("{} (required by {})", dependency.dependency, dependency.required_by));
    }
    log.indent(&format!("Run: {}", ctx.repo.config().commands.install));
    machine.signal_failure()?;
    Ok(true)
}

/// No dependency may be pinned to an unreleased prerelease of another unit
pub async fn check_no_prerelease_dependencies<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let unit = ctx.unit()?;
    let deps = find_prerelease_dependencies(&ctx.repo, unit);
    if deps.is_empty() {
        machine.signal_success()?;
        return Ok(true);
    }

    log.warn(&format!("{unit} depends on prerelease versions:"));
    for (name, version) in deps.units() {
        log.indent(&format!("{name} {version}"));
    }
    machine.signal_failure()?;
    Ok(true)
}

/// Commit released-dependency updates on a new branch when committing is
/// enabled; otherwise leave it to the operator.
pub async fn check_should_commit_released_deps_bump<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    if !ctx.flags.should_commit {
        machine.signal_failure()?;
        return Ok(true);
    }

    let unit = ctx.unit()?;
    let branch = deps_branch_name(unit, ctx.release_version()?);
    let message = deps_commit_message(unit);
    ctx.git.create_branch(&branch).await?;
    let commit = ctx.git.commit(&message).await?;
    log.success(&format!("Committed {} on {branch}", commit.short_hash));
    machine.signal_success()?;
    Ok(true)
}

/// Fire the action for the chosen bump type, inferring it from the
/// manifests when the release has already been bumped. The bump type is
/// fixed from here on.
pub async fn check_bump_type<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let bump = match ctx.bump_type() {
        Some(bump) => Some(bump),
        None => {
            let unit = ctx.unit()?;
            let on_disk = ctx.repo.version_of(unit)?;
            let release = ctx.release_version()?;
            let inferred = infer_bump(release, &on_disk, ctx.scheme_for(release));
            if let Some(bump) = inferred {
                log.info(&format!("Continuing the {bump} release of {unit} {release}"));
            }
            inferred
        }
    };

    match bump {
        Some(bump) => {
            ctx.set_bump_type(bump)?;
            ctx.lock_bump_type();
            machine.action(Action::for_bump(bump))?;
        }
        None => {
            log.error("No bump type given");
            log.indent("Pass --type major|minor|patch");
            machine.signal_failure()?;
            ctx.exit(EXIT_USAGE);
        }
    }
    Ok(true)
}

fn require_bump<C: Collaborators>(ctx: &ReleaseContext<C>) -> Result<VersionBump> {
    ctx.bump_type()
        .ok_or_else(|| MachineError::BumpTypeUnknown.into())
}

/// Patch releases run from a release branch; major and minor releases from
/// `main`, `next` or `lts`.
pub async fn check_branch_name<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    if !ctx.flags.should_check_branch {
        log.warn("Skipping the branch name check");
        machine.signal_success()?;
        return Ok(true);
    }

    let bump = require_bump(ctx)?;
    let branch = ctx.git.current_branch().await?;
    if branch_matches_convention(bump, &branch) {
        machine.signal_success()?;
        return Ok(true);
    }

    match bump {
        VersionBump::Patch => log.warn(&format!(
            "Patch releases should run from a release/ branch, not {branch}"
        )),
        VersionBump::Major | VersionBump::Minor => log.warn(&format!(
            "{bump} releases should run from main, next or lts, not {branch}"
        )),
    }
    machine.signal_failure()?;
    Ok(true)
}

/// Before a major release, `main` and `next` must point at the same commit
pub async fn check_main_next_integrated<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    if require_bump(ctx)? != VersionBump::Major {
        machine.signal_success()?;
        return Ok(true);
    }
    if !ctx.flags.should_check_main_next_integrated {
        log.warn("Skipping the main/next integration check");
        machine.signal_success()?;
        return Ok(true);
    }

    let qualify = |branch: &str| match &ctx.remote {
        Some(remote) => format!("{remote}/{branch}"),
        None => branch.to_string(),
    };
    let main = ctx.git.sha_for_branch(&qualify("main")).await?;
    let next = ctx.git.sha_for_branch(&qualify("next")).await?;
    match (main, next) {
        (Some(main), Some(next)) if main == next => {
            log.success("main and next are integrated");
            machine.signal_success()?;
        }
        (main, next) => {
            log.error(&format!(
                "main ({}) and next ({}) are not integrated",
                main.as_deref().unwrap_or("missing"),
                next.as_deref().unwrap_or("missing")
            ));
            machine.signal_failure()?;
        }
    }
    Ok(true)
}

/// Groups that track changes need a release notes file for the version
pub async fn check_release_notes<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let unit = ctx.unit()?;
    if require_bump(ctx)? == VersionBump::Patch || !ctx.repo.change_tracking(unit) {
        machine.signal_success()?;
        return Ok(true);
    }

    let version = ctx.release_version()?;
    let path = ctx
        .repo
        .root()
        .join(&ctx.repo.config().release_notes_dir)
        .join(format!("{unit}_v{version}.md"));
    if tokio::fs::try_exists(&path).await? {
        log.success(&format!("Release notes found: {}", path.display()));
        machine.signal_success()?;
    } else {
        log.error(&format!("Missing release notes: {}", path.display()));
        machine.signal_failure()?;
    }
    Ok(true)
}

fn has_version_heading(changelog: &str, version: &Version) -> bool {
    let version = version.to_string();
    changelog
        .lines()
        .any(|line| line.trim_start().starts_with('#') && line.contains(&version))
}

/// Every package needs a changelog section for the release version; when
/// one is missing the operator is asked to confirm they were generated.
pub async fn check_changelogs<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    if require_bump(ctx)? == VersionBump::Patch {
        machine.signal_success()?;
        return Ok(true);
    }

    let version = ctx.release_version()?.clone();
    let mut missing = Vec::new();
    for package in ctx.packages()? {
        let path = package.directory.join("CHANGELOG.md");
        let documented = match tokio::fs::read_to_string(&path).await {
            Ok(content) => has_version_heading(&content, &version),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        if !documented {
            missing.push(package.name.clone());
        }
    }

    if missing.is_empty() {
        log.success("Changelogs are up to date");
        machine.signal_success()?;
        return Ok(true);
    }

    log.warn(&format!("No {version} changelog section in: {}", missing.join(", ")));
    let confirmed = ctx.flags.interactive
        && ctx
            .input
            .confirm("Have the changelogs been generated and committed?")
            .await?;
    if confirmed {
        machine.signal_success()?;
    } else {
        machine.signal_failure()?;
    }
    Ok(true)
}

/// The release version is tagged or published
pub async fn check_release_is_done<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let unit = ctx.unit()?;
    let version = ctx.release_version()?;
    if is_released(ctx, unit, version).await? {
        log.success(&format!("{unit} {version} has been released"));
        machine.signal_success()?;
    } else {
        log.info(&format!("{unit} {version} has not been released yet"));
        machine.signal_failure()?;
    }
    Ok(true)
}

/// The release branch for the release version exists
pub async fn check_release_branch_exists<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let branch = release_branch_name(ctx.unit()?, ctx.release_version()?);
    if ctx.git.branch_exists(&branch).await? {
        log.verbose(&format!("{branch} exists"));
        machine.signal_success()?;
    } else {
        machine.signal_failure()?;
    }
    Ok(true)
}

/// The manifests carry the bump of the release version
pub async fn check_release_group_is_bumped<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let unit = ctx.unit()?;
    let release = ctx.release_version()?;
    let target = bump_target(release, require_bump(ctx)?, ctx.scheme_for(release))?;
    let on_disk = ctx.repo.version_of(unit)?;
    if on_disk == target {
        log.success(&format!("{unit} is bumped to {target}"));
        machine.signal_success()?;
    } else {
        log.info(&format!("{unit} is at {on_disk}; the next version is {target}"));
        machine.signal_failure()?;
    }
    Ok(true)
}

/// Type test baselines point at the release version
pub async fn check_type_tests_prepared<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    if require_bump(ctx)? == VersionBump::Patch {
        machine.signal_success()?;
        return Ok(true);
    }

    let release = ctx.release_version()?;
    let packages = ctx.packages()?;
    let unprepared = unprepared_type_tests(&packages, release);
    if unprepared.is_empty() {
        machine.signal_success()?;
        return Ok(true);
    }

    log.warn("Type test baselines are out of date:");
    for package in unprepared {
        log.indent(&package.name);
    }
    machine.signal_failure()?;
    Ok(true)
}

/// Commit the version bump on a new branch when committing is enabled;
/// otherwise leave it to the operator.
pub async fn check_should_commit_bump<C: Collaborators>(
    _state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    if !ctx.flags.should_commit {
        machine.signal_failure()?;
        return Ok(true);
    }

    let unit = ctx.unit()?;
    let from = ctx.release_version()?;
    let to = ctx.repo.version_of(unit)?;
    let branch = bump_branch_name(unit, &to);
    let message = bump_commit_message(unit, from, &to, require_bump(ctx)?);
    ctx.git.create_branch(&branch).await?;
    let commit = ctx.git.commit(&message).await?;
    log.success(&format!("Committed {} on {branch}: {message}", commit.short_hash));
    machine.signal_success()?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_heading() {
        let changelog = "# @scope/a\n\n## 2.0.0\n\n- change\n";
        assert!(has_version_heading(changelog, &Version::new(2, 0, 0)));
        assert!(!has_version_heading(changelog, &Version::new(2, 1, 0)));
        assert!(!has_version_heading("released 2.1.0 today", &Version::new(2, 1, 0)));
    }
}
