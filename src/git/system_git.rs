//! Git backend using the system `git` binary.

use super::operations::{CommitInfo, GitOperations};
use crate::error::{GitError, Result};
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;

/// Runs `git -C <root>` subprocesses
#[derive(Debug, Clone)]
pub struct SystemGit {
    work_tree: PathBuf,
}

impl SystemGit {
    /// Open the repository containing `path`
    pub async fn open(path: &Path) -> Result<Self> {
        let output = Command::new("git")
            .arg("-C")
            .arg(path)
            .args(["rev-parse", "--show-toplevel"])
            .output()
            .await
            .map_err(|e| GitError::Unavailable {
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("not a git repository") {
                return Err(GitError::NotRepository {
                    path: path.to_path_buf(),
                }
                .into());
            }
            return Err(GitError::CommandFailed {
                command: "rev-parse --show-toplevel".to_string(),
                stderr: stderr.trim().to_string(),
            }
            .into());
        }

        let work_tree = String::from_utf8_lossy(&output.stdout).trim().to_string();
        log::debug!("Opened git repository at {work_tree}");
        Ok(Self {
            work_tree: PathBuf::from(work_tree),
        })
    }

    /// Working tree root
    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    fn git_cmd(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.work_tree);
        cmd.arg("-c").arg("advice.detachedHead=false");
        cmd.arg("-c").arg("core.quotePath=false");
        cmd
    }

    /// Run git and return the raw output, whatever the exit status
    async fn output(&self, args: &[&str]) -> Result<Output> {
        log::debug!("git {}", args.join(" "));
        self.git_cmd()
            .args(args)
            .output()
            .await
            .map_err(|e| {
                GitError::Unavailable {
                    reason: e.to_string(),
                }
                .into()
            })
    }

    /// Run git, failing on a non-zero exit, and return trimmed stdout
    async fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args).await?;
        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }
}

impl GitOperations for SystemGit {
    async fn current_branch(&self) -> Result<String> {
        let output = self.output(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        if !output.status.success() {
            return Ok("HEAD".to_string());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn get_remote(&self, url_fragment: &str) -> Result<Option<String>> {
        let remotes = self.run(&["remote", "-v"]).await?;
        Ok(remotes.lines().find_map(|line| {
            let mut fields = line.split_whitespace();
            let name = fields.next()?;
            let url = fields.next()?;
            url.contains(url_fragment).then(|| name.to_string())
        }))
    }

    async fn is_branch_up_to_date(&self, branch: &str, remote: &str) -> Result<bool> {
        self.run(&["fetch", remote, branch]).await?;
        let local = self.run(&["rev-parse", "HEAD"]).await?;
        let tracking = format!("{remote}/{branch}");
        let upstream = self.run(&["rev-parse", &tracking]).await?;
        Ok(local == upstream)
    }

    async fn sha_for_branch(&self, name: &str) -> Result<Option<String>> {
        let spec = format!("{name}^{{commit}}");
        let output = self.output(&["rev-parse", "--verify", "--quiet", &spec]).await?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
    }

    async fn branch_exists(&self, name: &str) -> Result<bool> {
        let local = format!("refs/heads/{name}");
        let remote = format!("refs/remotes/*/{name}");
        let refs = self
            .run(&["for-each-ref", "--format=%(refname)", &local, &remote])
            .await?;
        Ok(!refs.is_empty())
    }

    async fn tag_exists(&self, name: &str) -> Result<bool> {
        let spec = format!("refs/tags/{name}");
        let output = self.output(&["show-ref", "--verify", "--quiet", &spec]).await?;
        Ok(output.status.success())
    }

    async fn list_tags(&self, prefix: &str) -> Result<Vec<String>> {
        let pattern = format!("{prefix}*");
        let tags = self.run(&["tag", "--list", &pattern]).await?;
        Ok(tags.lines().map(str::to_string).collect())
    }

    async fn create_branch(&self, name: &str) -> Result<()> {
        self.run(&["checkout", "-b", name]).await?;
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<CommitInfo> {
        self.run(&["add", "--all"]).await?;
        self.run(&["commit", "--message", message]).await?;
        let hash = self.run(&["rev-parse", "HEAD"]).await?;
        let short_hash = hash.chars().take(7).collect();
        Ok(CommitInfo {
            hash,
            short_hash,
            message: message.to_string(),
        })
    }

    async fn status(&self) -> Result<String> {
        self.run(&["status", "--porcelain"]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn init_repo() -> Option<(tempfile::TempDir, SystemGit)> {
        let dir = tempfile::tempdir().unwrap();
        let status = Command::new("git")
            .arg("-C")
            .arg(dir.path())
            .args(["init", "--quiet", "--initial-branch=main"])
            .status()
            .await
            .ok()?;
        if !status.success() {
            return None;
        }
        for (key, value) in [("user.name", "Release Bot"), ("user.email", "bot@example.com")] {
            Command::new("git")
                .arg("-C")
                .arg(dir.path())
                .args(["config", key, value])
                .status()
                .await
                .ok()?;
        }
        let git = SystemGit::open(dir.path()).await.ok()?;
        Some((dir, git))
    }

    #[tokio::test]
    async fn test_status_commit_and_tags() {
        let Some((dir, git)) = init_repo().await else {
            eprintln!("git not available, skipping");
            return;
        };

        assert_eq!(git.status().await.unwrap(), "");
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        assert!(!git.status().await.unwrap().is_empty());

        let commit = git.commit("[bump] client: 1.0.0 => 1.1.0 (minor)").await.unwrap();
        assert_eq!(commit.short_hash.len(), 7);
        assert_eq!(git.status().await.unwrap(), "");
        assert_eq!(git.current_branch().await.unwrap(), "main");
        assert!(git.sha_for_branch("main").await.unwrap().is_some());
        assert!(git.sha_for_branch("next").await.unwrap().is_none());

        git.run(&["tag", "client_v1.0.0"]).await.unwrap();
        assert!(git.tag_exists("client_v1.0.0").await.unwrap());
        assert!(!git.tag_exists("client_v1.1.0").await.unwrap());
        assert_eq!(
            git.list_tags("client_v").await.unwrap(),
            vec!["client_v1.0.0".to_string()]
        );

        git.create_branch("release/client_v1.0").await.unwrap();
        assert!(git.branch_exists("release/client_v1.0").await.unwrap());
        assert_eq!(git.current_branch().await.unwrap(), "release/client_v1.0");
        assert_eq!(git.get_remote("example/monorepo").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_open_outside_repository() {
        let dir = tempfile::tempdir().unwrap();
        if let Err(e) = SystemGit::open(dir.path()).await {
            assert!(matches!(
                e,
                crate::error::ReleaseError::Git(
                    GitError::NotRepository { .. } | GitError::Unavailable { .. }
                )
            ));
        }
    }
}
