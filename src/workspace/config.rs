//! Repository configuration loaded from `monorel.toml`.

use crate::error::{Result, WorkspaceError};
use crate::version::VersionScheme;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Name of the configuration file at the repository root
pub const CONFIG_FILE: &str = "monorel.toml";

/// Repository-wide release configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Fragment of the upstream remote URL, e.g. `microsoft/FluidFramework`
    pub upstream: Option<String>,
    /// Directory holding per-release notes files
    pub release_notes_dir: String,
    /// External commands run by checks and actions
    pub commands: CommandsConfig,
    /// Policy check defaults
    pub policy: PolicyConfig,
    /// Release groups by name
    pub release_groups: BTreeMap<String, ReleaseGroupConfig>,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            upstream: None,
            release_notes_dir: "RELEASE_NOTES".to_string(),
            commands: CommandsConfig::default(),
            policy: PolicyConfig::default(),
            release_groups: BTreeMap::new(),
        }
    }
}

/// External commands
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommandsConfig {
    /// Policy check in fix mode
    pub policy: Option<String>,
    /// Assert tagging pass
    pub assert_tagging: Option<String>,
    /// Dependency installation
    pub install: String,
    /// Type test baseline preparation
    pub type_tests: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            policy: None,
            assert_tagging: None,
            install: "npm install".to_string(),
            type_tests: "npm run typetests:prepare".to_string(),
        }
    }
}

/// Where the policy check may not be skipped
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Branch glob patterns on which the policy check always runs
    pub branches: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            branches: vec!["main".to_string(), "next".to_string(), "lts".to_string()],
        }
    }
}

/// Configuration for one release group
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseGroupConfig {
    /// Directory, relative to the repository root, containing the group's packages
    pub directory: String,
    /// Group tracks changes and needs release notes per version
    #[serde(default)]
    pub change_tracking: bool,
    /// Version scheme; detected from the version when absent
    #[serde(default)]
    pub scheme: Option<VersionScheme>,
    /// Whether the policy check must run for this group, overriding branch defaults
    #[serde(default)]
    pub policy_check: Option<bool>,
}

impl RepoConfig {
    /// Load `monorel.toml` from `root`, or defaults when the file is absent
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            log::debug!("No {CONFIG_FILE} at {}, using defaults", root.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        toml::from_str(&content).map_err(|e| {
            WorkspaceError::InvalidConfig {
                path,
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Whether the policy check is required for `group` on `branch`.
    ///
    /// A group-level `policy_check` wins; otherwise the branch patterns decide.
    pub fn policy_required(&self, group: Option<&str>, branch: &str) -> bool {
        if let Some(required) = group
            .and_then(|g| self.release_groups.get(g))
            .and_then(|g| g.policy_check)
        {
            return required;
        }
        self.policy.branches.iter().any(|pattern| {
            glob::Pattern::new(pattern)
                .map(|p| p.matches(branch))
                .unwrap_or_else(|_| pattern == branch)
        })
    }
}
