//! Shared helper functions for command execution.

use crate::cli::{RuntimeConfig, UnitSelector};
use crate::error::{CliError, ReleaseError, Result};
use crate::git::SystemGit;
use crate::registry::NpmRegistry;
use crate::release::{ReleaseContext, ReleaseFlags, SystemCollaborators};
use crate::runner::{OperatorInput, ProcessRunner};
use crate::workspace::MonoRepo;
use semver::Version;

/// Build a release context over the real git, npm, shell and terminal.
pub(super) async fn system_context(
    config: &RuntimeConfig,
    unit: &UnitSelector,
    registry: Option<&str>,
    flags: ReleaseFlags,
) -> Result<ReleaseContext<SystemCollaborators>> {
    let git = SystemGit::open(config.repo_root()).await?;
    let repo = MonoRepo::load(git.work_tree())?;
    config.verbose_println(&format!("Repository: {}", repo.root().display()));

    let registry = NpmRegistry::from_env(registry)?;
    let runner = ProcessRunner::new()?;
    let input = OperatorInput::new(flags.interactive);
    let (name, kind) = unit.name_and_kind();

    Ok(
        ReleaseContext::new(repo, git, registry, runner, input, name)
            .with_unit_hint(Some(kind))
            .with_flags(flags),
    )
}

/// Parse `--release-version`
pub(super) fn parse_release_version(version: Option<&str>) -> Result<Option<Version>> {
    version
        .map(|v| {
            Version::parse(v).map_err(|e| {
                ReleaseError::Cli(CliError::InvalidArguments {
                    reason: format!("--release-version '{v}': {e}"),
                })
            })
        })
        .transpose()
}

/// Print an error's recovery suggestions
pub(super) fn print_suggestions(config: &RuntimeConfig, error: &ReleaseError) {
    let suggestions = error.recovery_suggestions();
    if suggestions.is_empty() {
        return;
    }
    config.println("\n💡 Recovery suggestions:");
    for suggestion in suggestions {
        config.indent(&format!("• {suggestion}"));
    }
}
