//! Error types for monorel operations.
//!
//! User-actionable release conditions (a dirty branch, an unreleased
//! dependency) are not errors: checks report them through the state machine.
//! The types here cover I/O failures from collaborators and the programming
//! errors of the machine itself.

use crate::state::{Action, State};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for monorel operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all monorel operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Workspace analysis errors
    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    /// Version management errors
    #[error("Version error: {0}")]
    Version(#[from] VersionError),

    /// Git operation errors
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    /// npm registry errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// State machine errors
    #[error("Release machine error: {0}")]
    Machine(#[from] MachineError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Workspace-specific errors
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// Repository root has no package.json anywhere below it
    #[error("No package.json files found under {path}")]
    NoPackages {
        /// Directory that was scanned
        path: PathBuf,
    },

    /// Neither a release group nor a package carries this name
    #[error("'{name}' is not a known release group or package")]
    UnknownUnit {
        /// Requested name
        name: String,
    },

    /// Name exists as both a release group and a package
    #[error("'{name}' is both a release group and a package; pass --group or --package")]
    AmbiguousUnit {
        /// Requested name
        name: String,
    },

    /// Manifest could not be parsed
    #[error("Invalid package.json at {path}: {reason}")]
    InvalidManifest {
        /// Path to the manifest
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Invalid monorel.toml
    #[error("Invalid configuration in {path}: {reason}")]
    InvalidConfig {
        /// Path to the configuration file
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Release group contains no packages
    #[error("Release group '{group}' has no packages under '{directory}'")]
    EmptyReleaseGroup {
        /// Group name
        group: String,
        /// Configured directory
        directory: String,
    },
}

/// Version management errors
#[derive(Error, Debug)]
pub enum VersionError {
    /// Version parsing failed
    #[error("Failed to parse version '{version}': {source}")]
    ParseFailed {
        /// Version string
        version: String,
        /// Parsing error
        #[source]
        source: semver::Error,
    },

    /// Release group packages disagree on their version
    #[error("Packages of '{unit}' have inconsistent versions: {versions:?}")]
    Inconsistent {
        /// Unit name
        unit: String,
        /// Distinct versions found
        versions: Vec<String>,
    },

    /// Version does not fit the scheme it is bumped with
    #[error("Version '{version}' cannot be bumped with the {scheme} scheme")]
    SchemeMismatch {
        /// Version string
        version: String,
        /// Scheme name
        scheme: String,
    },

    /// Failed to update package.json
    #[error("Failed to update package.json at {path}: {reason}")]
    ManifestUpdateFailed {
        /// Path to package.json
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

/// Git operation errors
#[derive(Error, Debug)]
pub enum GitError {
    /// Not a git repository
    #[error("Not a git repository: {path}")]
    NotRepository {
        /// Path that was opened
        path: PathBuf,
    },

    /// git binary missing or not executable
    #[error("Unable to run git: {reason}")]
    Unavailable {
        /// Reason for the error
        reason: String,
    },

    /// A git command exited with a failure status
    #[error("'git {command}' failed: {stderr}")]
    CommandFailed {
        /// Arguments passed to git
        command: String,
        /// Captured standard error
        stderr: String,
    },
}

/// npm registry errors
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Registry URL is malformed
    #[error("Invalid registry URL '{url}': {reason}")]
    InvalidUrl {
        /// URL given
        url: String,
        /// Reason for the error
        reason: String,
    },

    /// HTTP request failed
    #[error("Registry request for '{package}' failed: {reason}")]
    RequestFailed {
        /// Package queried
        package: String,
        /// Reason for the error
        reason: String,
    },
}

/// State machine programming errors.
///
/// These indicate a bug in the transition table or a handler, never a
/// release-process condition.
#[derive(Error, Debug)]
pub enum MachineError {
    /// No transition for the action from the current state
    #[error("No '{action}' transition from state {state}")]
    NoTransition {
        /// Current state
        state: State,
        /// Action fired
        action: Action,
    },

    /// Dispatcher found no handler for the state
    #[error("State {state} was not handled")]
    Unhandled {
        /// Current state
        state: State,
    },

    /// A check or do handler returned without firing an action
    #[error("Handler for {state} returned without signalling success or failure")]
    Unresolved {
        /// State left unresolved
        state: State,
    },

    /// A handler fired more than one action
    #[error("Handler for {state} signalled {count} actions")]
    MultipleSignals {
        /// State whose handler misbehaved
        state: State,
        /// Number of actions fired
        count: usize,
    },

    /// The machine reached the fatal terminal state
    #[error("Release failed at {state}")]
    ReachedFailed {
        /// The failed state
        state: State,
    },

    /// A check ran before the release group or package was resolved
    #[error("Release group or package has not been resolved")]
    UnitNotResolved,

    /// The release version is needed but was never derived
    #[error("Release version has not been determined")]
    ReleaseVersionUnknown,

    /// A bump-type sub-flow ran before the bump type was chosen
    #[error("Bump type has not been determined")]
    BumpTypeUnknown,

    /// Bump type changed after type selection
    #[error("Bump type is already fixed to '{current}'")]
    BumpTypeLocked {
        /// Bump type chosen at type selection
        current: String,
    },

    /// The transition table failed validation
    #[error("Invalid transition table: {}", .0.join("; "))]
    InvalidTable(Vec<String>),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// External command could not be started
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

impl ReleaseError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Workspace(WorkspaceError::UnknownUnit { .. }) => vec![
                "List release groups in monorel.toml under [release_groups]".to_string(),
                "Check the package name in its package.json".to_string(),
            ],
            ReleaseError::Workspace(WorkspaceError::AmbiguousUnit { name }) => vec![
                format!("Run with --group {name} to release the group"),
                format!("Run with --package {name} to release the package"),
            ],
            ReleaseError::Git(GitError::NotRepository { .. }) => vec![
                "Run monorel from inside the repository, or pass --repo <path>".to_string(),
            ],
            ReleaseError::Git(GitError::Unavailable { .. }) => {
                vec!["Install git and make sure it is on PATH".to_string()]
            }
            ReleaseError::Machine(MachineError::ReachedFailed { .. }) => vec![
                "Fix the condition reported above and re-run the same command".to_string(),
            ],
            ReleaseError::Registry(RegistryError::RequestFailed { .. }) => vec![
                "Check network access to the npm registry".to_string(),
                "Pass --registry to use a mirror".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Check if this error is recoverable by re-running after a fix
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ReleaseError::Machine(
                MachineError::NoTransition { .. }
                    | MachineError::Unhandled { .. }
                    | MachineError::Unresolved { .. }
                    | MachineError::MultipleSignals { .. }
                    | MachineError::InvalidTable(_)
            ) | ReleaseError::Workspace(WorkspaceError::InvalidConfig { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Lane, Stage};

    #[test]
    fn test_machine_bugs_are_not_recoverable() {
        let err: ReleaseError = MachineError::NoTransition {
            state: State::new(Stage::CheckPolicy, Lane::Preflight),
            action: Action::Major,
        }
        .into();
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("CheckPolicy"));
    }

    #[test]
    fn test_reached_failed_suggests_rerun() {
        let err: ReleaseError = MachineError::ReachedFailed {
            state: State::new(Stage::Failed, Lane::Preflight),
        }
        .into();
        assert!(err.is_recoverable());
        assert!(err.recovery_suggestions()[0].contains("re-run"));
    }
}
