//! Git operations for release workflows.
//!
//! The release checks only see the `GitOperations` trait; `SystemGit`
//! implements it by running the system `git` binary.

mod operations;
mod system_git;

pub use operations::{CommitInfo, GitOperations};
pub use system_git::SystemGit;
