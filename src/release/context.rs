//! The mutable request context threaded through every release handler.

use crate::error::MachineError;
use crate::git::{GitOperations, SystemGit};
use crate::registry::{NpmRegistry, PackageRegistry};
use crate::runner::{CommandRunner, OperatorInput, ProcessRunner, UserInput};
use crate::version::{VersionBump, VersionScheme};
use crate::workspace::{MonoRepo, PackageInfo, ReleaseUnit, UnitKind};
use semver::Version;
use std::fmt;
use std::sync::Arc;

/// The external systems a release talks to
pub trait Collaborators {
    /// Repository facts and mutations
    type Git: GitOperations;
    /// Published version lookups
    type Registry: PackageRegistry;
    /// External command execution
    type Runner: CommandRunner;
    /// Operator confirmations
    type Input: UserInput;
}

/// Collaborators backed by git, npm, the shell and the terminal
#[derive(Debug, Clone, Copy)]
pub struct SystemCollaborators;

impl Collaborators for SystemCollaborators {
    type Git = SystemGit;
    type Registry = NpmRegistry;
    type Runner = ProcessRunner;
    type Input = OperatorInput;
}

/// Flags gating each precondition category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseFlags {
    /// Every `should_check_*` flag was cleared by `--skip-checks`
    pub should_skip_checks: bool,
    /// Run the policy check even where the defaults would not
    pub should_check_policy: bool,
    /// Check the branch name convention
    pub should_check_branch: bool,
    /// Check the branch is up to date with its remote
    pub should_check_branch_update: bool,
    /// Commit version changes on a new branch
    pub should_commit: bool,
    /// Install dependencies (checks and after bumps)
    pub should_install: bool,
    /// Check `main` and `next` are integrated before a major release
    pub should_check_main_next_integrated: bool,
    /// An operator can answer questions
    pub interactive: bool,
}

impl Default for ReleaseFlags {
    fn default() -> Self {
        Self {
            should_skip_checks: false,
            should_check_policy: true,
            should_check_branch: true,
            should_check_branch_update: true,
            should_commit: true,
            should_install: true,
            should_check_main_next_integrated: true,
            interactive: true,
        }
    }
}

impl ReleaseFlags {
    /// Clear every `should_check_*` flag
    pub fn skip_checks(mut self) -> Self {
        self.should_skip_checks = true;
        self.should_check_policy = false;
        self.should_check_branch = false;
        self.should_check_branch_update = false;
        self.should_check_main_next_integrated = false;
        self
    }
}

/// Exit code for a release that cannot start without more input
pub const EXIT_USAGE: i32 = 2;

/// Callback terminating the host process with a status code
pub type ExitFunc = Arc<dyn Fn(i32) + Send + Sync>;

/// State of one release attempt, created fresh per invocation
pub struct ReleaseContext<C: Collaborators> {
    /// Packages and release groups
    pub repo: MonoRepo,
    /// Repository facts
    pub git: C::Git,
    /// Published versions
    pub registry: C::Registry,
    /// External commands
    pub runner: C::Runner,
    /// Operator confirmations
    pub input: C::Input,
    /// Name of the unit being released, as given
    pub release_group_or_package: String,
    /// Namespace the caller asked for, if any
    pub unit_hint: Option<UnitKind>,
    /// The resolved unit; set by the validation check
    pub unit: Option<ReleaseUnit>,
    /// Version scheme of the unit; set by the validation check
    pub version_scheme: Option<VersionScheme>,
    /// Version being released
    pub release_version: Option<Version>,
    /// Release version given on the command line
    pub explicit_release_version: Option<Version>,
    /// Precondition gates
    pub flags: ReleaseFlags,
    /// Upstream remote name; set by the remote check
    pub remote: Option<String>,
    bump_type: Option<VersionBump>,
    bump_type_locked: bool,
    exit_func: ExitFunc,
    exit_code: Option<i32>,
}

impl<C: Collaborators> fmt::Debug for ReleaseContext<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseContext")
            .field("release_group_or_package", &self.release_group_or_package)
            .field("unit", &self.unit)
            .field("bump_type", &self.bump_type)
            .field("version_scheme", &self.version_scheme)
            .field("release_version", &self.release_version)
            .field("flags", &self.flags)
            .field("remote", &self.remote)
            .field("exit_code", &self.exit_code)
            .finish_non_exhaustive()
    }
}

impl<C: Collaborators> ReleaseContext<C> {
    /// Context for releasing `release_group_or_package` with default flags
    pub fn new(
        repo: MonoRepo,
        git: C::Git,
        registry: C::Registry,
        runner: C::Runner,
        input: C::Input,
        release_group_or_package: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            git,
            registry,
            runner,
            input,
            release_group_or_package: release_group_or_package.into(),
            unit_hint: None,
            unit: None,
            version_scheme: None,
            release_version: None,
            explicit_release_version: None,
            flags: ReleaseFlags::default(),
            remote: None,
            bump_type: None,
            bump_type_locked: false,
            exit_func: Arc::new(|_| {}),
            exit_code: None,
        }
    }

    /// Set the requested bump type
    pub fn with_bump_type(mut self, bump: Option<VersionBump>) -> Self {
        self.bump_type = bump;
        self
    }

    /// Set the precondition flags
    pub fn with_flags(mut self, flags: ReleaseFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the namespace hint used when resolving the unit
    pub fn with_unit_hint(mut self, hint: Option<UnitKind>) -> Self {
        self.unit_hint = hint;
        self
    }

    /// Set the callback invoked by [`ReleaseContext::exit`]
    pub fn with_exit_func(mut self, exit_func: ExitFunc) -> Self {
        self.exit_func = exit_func;
        self
    }

    /// Bump type, once chosen
    pub fn bump_type(&self) -> Option<VersionBump> {
        self.bump_type
    }

    /// Choose the bump type; it cannot change once the type check has passed
    pub fn set_bump_type(&mut self, bump: VersionBump) -> Result<(), MachineError> {
        match self.bump_type {
            Some(current) if self.bump_type_locked && current != bump => {
                Err(MachineError::BumpTypeLocked {
                    current: current.to_string(),
                })
            }
            _ => {
                self.bump_type = Some(bump);
                Ok(())
            }
        }
    }

    /// Freeze the bump type
    pub fn lock_bump_type(&mut self) {
        self.bump_type_locked = true;
    }

    /// The resolved unit; handlers after the validation check rely on it
    pub fn unit(&self) -> Result<&ReleaseUnit, MachineError> {
        self.unit.as_ref().ok_or(MachineError::UnitNotResolved)
    }

    /// The version being released
    pub fn release_version(&self) -> Result<&Version, MachineError> {
        self.release_version
            .as_ref()
            .ok_or(MachineError::ReleaseVersionUnknown)
    }

    /// Version scheme of the unit, detected from `version` when unset
    pub fn scheme_for(&self, version: &Version) -> VersionScheme {
        self.version_scheme
            .unwrap_or_else(|| VersionScheme::detect(version))
    }

    /// Packages of the resolved unit
    pub fn packages(&self) -> Result<Vec<&PackageInfo>, MachineError> {
        let unit = self.unit()?;
        Ok(self.repo.packages_in(unit))
    }

    /// Request process termination with `code`. The run loop stops after
    /// the current handler returns.
    pub fn exit(&mut self, code: i32) {
        log::debug!("Exit requested with code {code}");
        self.exit_code = Some(code);
        (self.exit_func)(code);
    }

    /// Exit code requested by a handler
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }
}
