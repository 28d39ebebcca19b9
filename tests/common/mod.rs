//! In-memory collaborators and on-disk repository fixtures.
#![allow(dead_code)]

use monorel::cli::OutputManager;
use monorel::error::Result;
use monorel::git::{CommitInfo, GitOperations};
use monorel::registry::PackageRegistry;
use monorel::release::{Collaborators, ReleaseContext};
use monorel::runner::{CommandOutput, CommandRunner, UserInput};
use monorel::workspace::MonoRepo;
use semver::Version;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// Git facts held in memory
#[derive(Debug, Default)]
pub struct FakeGit {
    pub branch: Mutex<String>,
    pub remotes: Vec<(String, String)>,
    pub up_to_date: bool,
    pub shas: BTreeMap<String, String>,
    pub branches: Mutex<BTreeSet<String>>,
    pub tags: BTreeSet<String>,
    /// Successive `git status` outputs; the last one repeats
    pub statuses: Mutex<VecDeque<String>>,
    pub commits: Mutex<Vec<String>>,
}

impl FakeGit {
    pub fn on_branch(branch: &str) -> Self {
        Self {
            branch: Mutex::new(branch.to_string()),
            up_to_date: true,
            branches: Mutex::new(BTreeSet::from([branch.to_string()])),
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.insert(tag.to_string());
        self
    }

    pub fn with_statuses(self, statuses: &[&str]) -> Self {
        *self.statuses.lock().unwrap() = statuses.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_remote(mut self, name: &str, url: &str) -> Self {
        self.remotes.push((name.to_string(), url.to_string()));
        self
    }

    pub fn with_sha(mut self, branch: &str, sha: &str) -> Self {
        self.shas.insert(branch.to_string(), sha.to_string());
        self
    }

    pub fn set_branch(&self, branch: &str) {
        *self.branch.lock().unwrap() = branch.to_string();
    }

    pub fn commits(&self) -> Vec<String> {
        self.commits.lock().unwrap().clone()
    }

    pub fn has_branch(&self, name: &str) -> bool {
        self.branches.lock().unwrap().contains(name)
    }
}

impl GitOperations for FakeGit {
    async fn current_branch(&self) -> Result<String> {
        Ok(self.branch.lock().unwrap().clone())
    }

    async fn get_remote(&self, url_fragment: &str) -> Result<Option<String>> {
        Ok(self
            .remotes
            .iter()
            .find(|(_, url)| url.contains(url_fragment))
            .map(|(name, _)| name.clone()))
    }

    async fn is_branch_up_to_date(&self, _branch: &str, _remote: &str) -> Result<bool> {
        Ok(self.up_to_date)
    }

    async fn sha_for_branch(&self, name: &str) -> Result<Option<String>> {
        Ok(self.shas.get(name).cloned())
    }

    async fn branch_exists(&self, name: &str) -> Result<bool> {
        Ok(self.has_branch(name))
    }

    async fn tag_exists(&self, name: &str) -> Result<bool> {
        Ok(self.tags.contains(name))
    }

    async fn list_tags(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .tags
            .iter()
            .filter(|tag| tag.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn create_branch(&self, name: &str) -> Result<()> {
        self.branches.lock().unwrap().insert(name.to_string());
        self.set_branch(name);
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<CommitInfo> {
        let mut commits = self.commits.lock().unwrap();
        commits.push(message.to_string());
        let hash = format!("{:040x}", commits.len());
        Ok(CommitInfo {
            short_hash: hash[..7].to_string(),
            hash,
            message: message.to_string(),
        })
    }

    async fn status(&self) -> Result<String> {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            return Ok(statuses.pop_front().unwrap());
        }
        Ok(statuses.front().cloned().unwrap_or_default())
    }
}

/// Published versions held in memory
#[derive(Debug, Default)]
pub struct FakeRegistry {
    pub published: BTreeMap<String, Vec<Version>>,
}

impl FakeRegistry {
    pub fn with(mut self, name: &str, version: &str) -> Self {
        self.published
            .entry(name.to_string())
            .or_default()
            .push(Version::parse(version).unwrap());
        self
    }
}

impl PackageRegistry for FakeRegistry {
    async fn published_versions(&self, name: &str) -> Result<Vec<Version>> {
        Ok(self.published.get(name).cloned().unwrap_or_default())
    }
}

/// Records commands; the ones listed in `failing` exit non-zero
#[derive(Debug, Default)]
pub struct FakeRunner {
    pub failing: BTreeSet<String>,
    pub ran: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn failing(command: &str) -> Self {
        Self {
            failing: BTreeSet::from([command.to_string()]),
            ..Default::default()
        }
    }

    pub fn ran(&self) -> Vec<String> {
        self.ran.lock().unwrap().clone()
    }
}

impl CommandRunner for FakeRunner {
    async fn run(&self, command: &str, _cwd: &Path) -> Result<CommandOutput> {
        self.ran.lock().unwrap().push(command.to_string());
        let success = !self.failing.contains(command);
        Ok(CommandOutput {
            success,
            code: Some(if success { 0 } else { 1 }),
            stdout: String::new(),
            stderr: if success { String::new() } else { "boom".to_string() },
        })
    }
}

/// Answers questions from a script; "no" once the script runs out
#[derive(Debug, Default)]
pub struct ScriptedInput {
    pub answers: Mutex<VecDeque<bool>>,
    pub questions: Mutex<Vec<String>>,
}

impl ScriptedInput {
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            ..Default::default()
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

impl UserInput for ScriptedInput {
    async fn confirm(&self, question: &str) -> Result<bool> {
        self.questions.lock().unwrap().push(question.to_string());
        Ok(self.answers.lock().unwrap().pop_front().unwrap_or(false))
    }
}

/// Collaborators backed by the fakes above
#[derive(Debug)]
pub struct FakeCollaborators;

impl Collaborators for FakeCollaborators {
    type Git = FakeGit;
    type Registry = FakeRegistry;
    type Runner = FakeRunner;
    type Input = ScriptedInput;
}

pub type FakeContext = ReleaseContext<FakeCollaborators>;

/// A monorepo in a temporary directory
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// `client` group under `packages/` with `@fluid/a` depending on
    /// `@fluid/b`, both at `version`, installed and with changelogs
    pub fn client_group(version: &str) -> Self {
        let repo = Self::new();
        repo.write(
            "monorel.toml",
            "[release_groups.client]\ndirectory = \"packages\"\n",
        );
        repo.write_package(
            "packages/a",
            &format!(
                r#"{{"name":"@fluid/a","version":"{version}","dependencies":{{"@fluid/b":"^{version}"}}}}"#
            ),
        );
        repo.write_package(
            "packages/b",
            &format!(r#"{{"name":"@fluid/b","version":"{version}"}}"#),
        );
        repo.write(
            "node_modules/@fluid/b/package.json",
            &format!(r#"{{"name":"@fluid/b","version":"{version}"}}"#),
        );
        for dir in ["packages/a", "packages/b"] {
            repo.write(
                &format!("{dir}/CHANGELOG.md"),
                &format!("# changelog\n\n## {version}\n\n- changes\n"),
            );
        }
        repo
    }

    /// Point every package's `<name>-previous` type test alias at `version`
    /// and install it
    pub fn set_type_test_baseline(&self, version: &str) {
        for dir in ["packages/a", "packages/b"] {
            let mut manifest = self.read_package(dir);
            let name = manifest["name"].as_str().unwrap().to_string();
            manifest["devDependencies"][format!("{name}-previous")] =
                serde_json::Value::String(format!("npm:{name}@{version}"));
            self.write_package(dir, &serde_json::to_string_pretty(&manifest).unwrap());
            self.write(
                &format!("node_modules/{name}-previous/package.json"),
                &format!(r#"{{"name":"{name}","version":"{version}"}}"#),
            );
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn write_package(&self, dir: &str, json: &str) {
        self.write(&format!("{dir}/package.json"), json);
    }

    pub fn manifest_path(&self, dir: &str) -> PathBuf {
        self.dir.path().join(dir).join("package.json")
    }

    pub fn read_package(&self, dir: &str) -> serde_json::Value {
        let content = fs::read_to_string(self.manifest_path(dir)).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    pub fn load(&self) -> MonoRepo {
        MonoRepo::load(self.path()).unwrap()
    }

    /// A release context over the fakes with default flags
    pub fn context(&self, name: &str, git: FakeGit) -> FakeContext {
        self.context_with(name, git, FakeRegistry::default(), FakeRunner::default())
    }

    pub fn context_with(
        &self,
        name: &str,
        git: FakeGit,
        registry: FakeRegistry,
        runner: FakeRunner,
    ) -> FakeContext {
        ReleaseContext::new(
            self.load(),
            git,
            registry,
            runner,
            ScriptedInput::default(),
            name,
        )
    }
}

pub fn quiet() -> OutputManager {
    OutputManager::new(false, true)
}

pub fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}
