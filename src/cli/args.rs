//! Command line argument parsing and validation.

use crate::release::ReleaseFlags;
use crate::version::VersionBump;
use crate::workspace::UnitKind;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Release tool for npm monorepos
#[derive(Parser, Debug)]
#[command(
    name = "monorel",
    version,
    about = "Release tool for npm monorepos",
    long_about = "Walks a release group or package through its release checks.

Re-run the same command after every manual step; the release picks up
where the repository says it is.

Usage:
  monorel release -g client -t minor
  monorel status -g client
  monorel graph --dot"
)]
pub struct Args {
    /// Repository root (defaults to the current directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Release group or package selection
#[derive(ClapArgs, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct UnitSelector {
    /// Release group to release
    #[arg(short = 'g', long = "group", value_name = "NAME")]
    pub group: Option<String>,

    /// Independent package to release
    #[arg(short = 'p', long = "package", value_name = "NAME")]
    pub package: Option<String>,
}

impl UnitSelector {
    /// The requested name and the namespace it was given in
    pub fn name_and_kind(&self) -> (String, UnitKind) {
        match (&self.group, &self.package) {
            (Some(group), _) => (group.clone(), UnitKind::Group),
            (None, Some(package)) => (package.clone(), UnitKind::Package),
            // clap's group makes one of them required
            (None, None) => (String::new(), UnitKind::Group),
        }
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Continue the release of a release group or package
    Release {
        /// Unit to release
        #[command(flatten)]
        unit: UnitSelector,

        /// Bump type; inferred when the unit has already been bumped
        #[arg(short = 't', long = "type", value_enum)]
        bump_type: Option<VersionBump>,

        /// Version being released, instead of deriving it
        #[arg(long, value_name = "VERSION")]
        release_version: Option<String>,

        /// Skip every optional check
        #[arg(long)]
        skip_checks: bool,

        /// Skip the policy check where the branch allows it
        #[arg(long)]
        no_policy_check: bool,

        /// Skip the branch name check
        #[arg(long)]
        no_branch_check: bool,

        /// Skip the check that the branch matches its remote
        #[arg(long)]
        no_update_check: bool,

        /// Do not commit version changes
        #[arg(long)]
        no_commit: bool,

        /// Do not run the install command
        #[arg(long)]
        no_install: bool,

        /// Skip the main/next integration check for major releases
        #[arg(long)]
        no_main_next_check: bool,

        /// Never ask questions
        #[arg(long)]
        non_interactive: bool,

        /// npm registry to query
        #[arg(long, value_name = "URL")]
        registry: Option<String>,
    },

    /// Show where the release of a unit stands
    Status {
        /// Unit to inspect
        #[command(flatten)]
        unit: UnitSelector,

        /// Bump type of the release in progress
        #[arg(short = 't', long = "type", value_enum)]
        bump_type: Option<VersionBump>,

        /// npm registry to query
        #[arg(long, value_name = "URL")]
        registry: Option<String>,
    },

    /// Bump the version of a release group or package
    Bump {
        /// Unit to bump
        #[command(flatten)]
        unit: UnitSelector,

        /// Bump type
        #[arg(short = 't', long = "type", value_enum)]
        bump_type: VersionBump,

        /// Do not run the install command
        #[arg(long)]
        no_install: bool,
    },

    /// Print the release transition graph
    Graph {
        /// Graphviz DOT output
        #[arg(long)]
        dot: bool,
    },
}

impl Command {
    /// Subcommand name, for messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Release { .. } => "release",
            Command::Status { .. } => "status",
            Command::Bump { .. } => "bump",
            Command::Graph { .. } => "graph",
        }
    }

    /// Release flags from the `release` options
    pub fn release_flags(&self) -> ReleaseFlags {
        let Command::Release {
            skip_checks,
            no_policy_check,
            no_branch_check,
            no_update_check,
            no_commit,
            no_install,
            no_main_next_check,
            non_interactive,
            ..
        } = self
        else {
            return ReleaseFlags::default();
        };

        let flags = ReleaseFlags {
            should_skip_checks: false,
            should_check_policy: !no_policy_check,
            should_check_branch: !no_branch_check,
            should_check_branch_update: !no_update_check,
            should_commit: !no_commit,
            should_install: !no_install,
            should_check_main_next_integrated: !no_main_next_check,
            interactive: !non_interactive,
        };
        if *skip_checks { flags.skip_checks() } else { flags }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if let Command::Release {
            release_version: Some(version),
            ..
        } = &self.command
            && semver::Version::parse(version).is_err()
        {
            return Err(format!("--release-version '{version}' is not a valid version"));
        }
        Ok(())
    }

    /// Repository root to operate on
    pub fn repo_root(&self) -> PathBuf {
        self.repo.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
    repo_root: PathBuf,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(verbose: bool, quiet: bool, repo_root: PathBuf) -> Self {
        Self {
            output: super::OutputManager::new(verbose, quiet),
            repo_root,
        }
    }

    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Repository root
    pub fn repo_root(&self) -> &std::path::Path {
        &self.repo_root
    }

    /// Print message
    pub fn println(&self, message: &str) {
        self.output.println(message);
    }

    /// Print verbose message
    pub fn verbose_println(&self, message: &str) {
        self.output.verbose(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        self.output.success(message);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        self.output.indent(message);
    }

    /// Check if verbose output is enabled
    pub fn is_verbose(&self) -> bool {
        self.output.is_verbose()
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.output.is_quiet()
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self::new(args.verbose, args.quiet, args.repo_root())
    }
}
