//! Core Git operations trait and types for release management.
//!
//! This module defines the GitOperations trait covering every repository
//! fact the release checks read and the few mutations the release flow
//! performs. The system implementation lives in `system_git`.

use crate::error::Result;
use std::future::Future;

/// Trait defining all required Git operations for release management
pub trait GitOperations {
    /// Name of the checked-out branch (`HEAD` when detached)
    fn current_branch(&self) -> impl Future<Output = Result<String>>;

    /// Name of the first remote whose URL contains `url_fragment`
    fn get_remote(&self, url_fragment: &str) -> impl Future<Output = Result<Option<String>>>;

    /// Fetch `remote` and compare `HEAD` with `<remote>/<branch>`
    fn is_branch_up_to_date(
        &self,
        branch: &str,
        remote: &str,
    ) -> impl Future<Output = Result<bool>>;

    /// Commit SHA a branch (or any ref) points at
    fn sha_for_branch(&self, name: &str) -> impl Future<Output = Result<Option<String>>>;

    /// Whether a local branch or any remote-tracking branch has this name
    fn branch_exists(&self, name: &str) -> impl Future<Output = Result<bool>>;

    /// Check if tag exists
    fn tag_exists(&self, name: &str) -> impl Future<Output = Result<bool>>;

    /// Tags starting with `prefix`
    fn list_tags(&self, prefix: &str) -> impl Future<Output = Result<Vec<String>>>;

    /// Create a branch at `HEAD` and check it out
    fn create_branch(&self, name: &str) -> impl Future<Output = Result<()>>;

    /// Stage every change and commit it
    fn commit(&self, message: &str) -> impl Future<Output = Result<CommitInfo>>;

    /// Porcelain status; empty means a clean working tree
    fn status(&self) -> impl Future<Output = Result<String>>;
}

/// Information about a Git commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Commit hash (full SHA)
    pub hash: String,
    /// Short commit hash
    pub short_hash: String,
    /// Commit message
    pub message: String,
}
