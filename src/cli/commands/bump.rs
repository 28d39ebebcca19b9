//! Standalone version bump of a release group or package.

use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::{CliError, ReleaseError, Result};
use crate::release::bump_target;
use crate::runner::{CommandRunner, ProcessRunner};
use crate::version::VersionUpdater;
use crate::workspace::MonoRepo;

/// Execute bump command
pub(super) async fn execute_bump(args: &Args, config: &RuntimeConfig) -> Result<()> {
    let Command::Bump {
        unit,
        bump_type,
        no_install,
    } = &args.command
    else {
        unreachable!("execute_bump called with non-Bump command");
    };

    let repo = MonoRepo::load(config.repo_root())?;
    let (name, kind) = unit.name_and_kind();
    let unit = repo.resolve(&name, Some(kind))?;
    let current = repo.version_of(&unit)?;
    let scheme = repo.scheme_of(&unit, &current);
    let target = bump_target(&current, *bump_type, scheme)?;

    config.println(&format!("🔢 {unit}: {current} => {target} ({bump_type})"));
    let result = VersionUpdater::new(repo.packages_in(&unit))
        .set_version(&target)
        .await?;
    for path in &result.modified_files {
        config.verbose_println(&format!("Updated {}", path.display()));
    }
    config.success_println(&format!(
        "Bumped {} package(s) and {} dependency range(s)",
        result.packages_updated, result.dependencies_updated
    ));

    if *no_install {
        return Ok(());
    }
    let command = &repo.config().commands.install;
    config.println(&format!("Running {command}"));
    let output = ProcessRunner::new()?.run(command, repo.root()).await?;
    if !output.success {
        return Err(ReleaseError::Cli(CliError::ExecutionFailed {
            command: command.clone(),
            reason: format!("exited with {:?}; the version bump was left in place", output.code),
        }));
    }
    Ok(())
}
