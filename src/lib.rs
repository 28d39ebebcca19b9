//! # monorel
//!
//! Release orchestration for npm monorepos.
//!
//! A release of one release group or package is a walk through a fixed
//! transition graph of checks, repository mutations and operator prompts.
//! Nothing is persisted between runs: each invocation derives where the
//! release stands from git, the package manifests and the npm registry, and
//! continues from there.
//!
//! ## Usage
//!
//! ```bash
//! monorel release -g client -t minor   # continue the minor release of "client"
//! monorel status -g client             # show what the next run would do
//! monorel graph --dot                  # render the release graph
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod error;
pub mod git;
pub mod registry;
pub mod release;
pub mod runner;
pub mod state;
pub mod version;
pub mod workspace;

// Re-export main types for public API
pub use cli::Args;
pub use error::{CliError, MachineError, ReleaseError, Result};
pub use git::{GitOperations, SystemGit};
pub use release::{Collaborators, ReleaseContext, ReleaseFlags, RunOutcome, dispatch, run_machine};
pub use state::{Action, Machine, Stage, State, TransitionTable, release_table, resume};
pub use version::{VersionBump, VersionScheme};
pub use workspace::{MonoRepo, ReleaseUnit};
