//! Monorepo structure analysis and release unit resolution.

use super::config::{RepoConfig, ReleaseGroupConfig};
use crate::error::{Result, VersionError, WorkspaceError};
use crate::version::{VersionScheme, parse_version};
use path_absolutize::Absolutize;
use semver::Version;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directories never searched for package manifests
const SKIPPED_DIRS: [&str; 4] = ["node_modules", ".git", "dist", "lib"];

/// The fields of a package.json the release flow reads
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    peer_dependencies: BTreeMap<String, String>,
}

/// Information about a single package in the repository
#[derive(Debug, Clone)]
pub struct PackageInfo {
    /// Package name
    pub name: String,
    /// Current on-disk version
    pub version: Version,
    /// Absolute path to the package directory
    pub directory: PathBuf,
    /// Absolute path to package.json
    pub manifest_path: PathBuf,
    /// Never published to the registry
    pub private: bool,
    /// Release group the package belongs to, if any
    pub release_group: Option<String>,
    /// `dependencies`
    pub dependencies: BTreeMap<String, String>,
    /// `devDependencies`
    pub dev_dependencies: BTreeMap<String, String>,
    /// `peerDependencies`
    pub peer_dependencies: BTreeMap<String, String>,
}

impl PackageInfo {
    /// Every declared dependency with its range, across all sections
    pub fn all_dependencies(&self) -> impl Iterator<Item = (&str, &str)> {
        self.dependencies
            .iter()
            .chain(&self.dev_dependencies)
            .chain(&self.peer_dependencies)
            .map(|(name, range)| (name.as_str(), range.as_str()))
    }

    /// Whether the package is published to the registry
    pub fn is_publishable(&self) -> bool {
        !self.private
    }
}

/// A configured release group and its members
#[derive(Debug, Clone)]
pub struct ReleaseGroupInfo {
    /// Group name
    pub name: String,
    /// Absolute path of the group directory
    pub directory: PathBuf,
    /// Configuration entry
    pub config: ReleaseGroupConfig,
    /// Member package names, sorted
    pub packages: Vec<String>,
}

/// Which namespace a name belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// A release group
    Group,
    /// An independent package
    Package,
}

/// The thing being released: a whole release group or one package
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReleaseUnit {
    /// A release group by name
    Group(String),
    /// A package by name
    Package(String),
}

impl ReleaseUnit {
    /// Unit name as used in tags and branch names
    pub fn name(&self) -> &str {
        match self {
            ReleaseUnit::Group(name) | ReleaseUnit::Package(name) => name,
        }
    }

    /// Namespace of the unit
    pub fn kind(&self) -> UnitKind {
        match self {
            ReleaseUnit::Group(_) => UnitKind::Group,
            ReleaseUnit::Package(_) => UnitKind::Package,
        }
    }
}

impl fmt::Display for ReleaseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-only view of the repository's packages and release groups
#[derive(Debug, Clone)]
pub struct MonoRepo {
    root: PathBuf,
    config: RepoConfig,
    packages: BTreeMap<String, PackageInfo>,
    release_groups: BTreeMap<String, ReleaseGroupInfo>,
}

impl MonoRepo {
    /// Load configuration and discover every package below `root`
    pub fn load(root: &Path) -> Result<Self> {
        let root = root.absolutize()?.to_path_buf();
        let config = RepoConfig::load(&root)?;

        let mut release_groups: BTreeMap<String, ReleaseGroupInfo> = config
            .release_groups
            .iter()
            .map(|(name, group)| {
                let info = ReleaseGroupInfo {
                    name: name.clone(),
                    directory: root.join(&group.directory),
                    config: group.clone(),
                    packages: Vec::new(),
                };
                (name.clone(), info)
            })
            .collect();

        let mut packages = BTreeMap::new();
        let walker = WalkDir::new(&root)
            .into_iter()
            .filter_entry(|entry| !is_skipped(entry));
        for entry in walker {
            let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
            if !entry.file_type().is_file() || entry.file_name() != "package.json" {
                continue;
            }
            let Some(mut package) = read_package(entry.path())? else {
                continue;
            };

            package.release_group = release_groups
                .values()
                .filter(|group| package.directory.starts_with(&group.directory))
                .max_by_key(|group| group.directory.components().count())
                .map(|group| group.name.clone());
            if let Some(group) = package
                .release_group
                .as_ref()
                .and_then(|name| release_groups.get_mut(name))
            {
                group.packages.push(package.name.clone());
            }

            log::debug!(
                "Found {}@{} ({})",
                package.name,
                package.version,
                package.release_group.as_deref().unwrap_or("independent")
            );
            if let Some(previous) = packages.insert(package.name.clone(), package) {
                log::warn!(
                    "Package {} is declared more than once; using {}",
                    previous.name,
                    previous.manifest_path.display()
                );
            }
        }

        if packages.is_empty() {
            return Err(WorkspaceError::NoPackages { path: root }.into());
        }
        for group in release_groups.values_mut() {
            group.packages.sort();
            group.packages.dedup();
        }

        Ok(Self {
            root,
            config,
            packages,
            release_groups,
        })
    }

    /// Repository root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Repository configuration
    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// Look up a package by name
    pub fn package(&self, name: &str) -> Option<&PackageInfo> {
        self.packages.get(name)
    }

    /// All packages, by name
    pub fn packages(&self) -> impl Iterator<Item = &PackageInfo> {
        self.packages.values()
    }

    /// Look up a release group by name
    pub fn release_group(&self, name: &str) -> Option<&ReleaseGroupInfo> {
        self.release_groups.get(name)
    }

    /// All release groups, by name
    pub fn release_groups(&self) -> impl Iterator<Item = &ReleaseGroupInfo> {
        self.release_groups.values()
    }

    /// Resolve a name to a release unit.
    ///
    /// Group and package names are separate namespaces; a name present in
    /// both needs a `hint`.
    pub fn resolve(&self, name: &str, hint: Option<UnitKind>) -> Result<ReleaseUnit> {
        let is_group = self.release_groups.contains_key(name);
        let is_package = self.packages.contains_key(name);
        match (hint, is_group, is_package) {
            (Some(UnitKind::Group), true, _) | (None, true, false) => {
                Ok(ReleaseUnit::Group(name.to_string()))
            }
            (Some(UnitKind::Package), _, true) | (None, false, true) => {
                Ok(ReleaseUnit::Package(name.to_string()))
            }
            (None, true, true) => Err(WorkspaceError::AmbiguousUnit {
                name: name.to_string(),
            }
            .into()),
            _ => Err(WorkspaceError::UnknownUnit {
                name: name.to_string(),
            }
            .into()),
        }
    }

    /// Unit that releases the given package: its group, or itself
    pub fn unit_of_package(&self, name: &str) -> Option<ReleaseUnit> {
        let package = self.packages.get(name)?;
        Some(match &package.release_group {
            Some(group) => ReleaseUnit::Group(group.clone()),
            None => ReleaseUnit::Package(package.name.clone()),
        })
    }

    /// Packages released together as `unit`
    pub fn packages_in(&self, unit: &ReleaseUnit) -> Vec<&PackageInfo> {
        match unit {
            ReleaseUnit::Group(name) => self
                .release_groups
                .get(name)
                .map(|group| {
                    group
                        .packages
                        .iter()
                        .filter_map(|p| self.packages.get(p))
                        .collect()
                })
                .unwrap_or_default(),
            ReleaseUnit::Package(name) => self.packages.get(name).into_iter().collect(),
        }
    }

    /// The single version shared by every package of `unit`
    pub fn version_of(&self, unit: &ReleaseUnit) -> Result<Version> {
        let packages = self.packages_in(unit);
        let versions: BTreeSet<&Version> = packages.iter().map(|p| &p.version).collect();
        let mut iter = versions.iter();
        match (iter.next(), iter.next()) {
            (Some(version), None) => Ok((*version).clone()),
            (None, _) => match unit {
                ReleaseUnit::Group(name) => Err(WorkspaceError::EmptyReleaseGroup {
                    group: name.clone(),
                    directory: self
                        .release_groups
                        .get(name)
                        .map(|g| g.config.directory.clone())
                        .unwrap_or_default(),
                }
                .into()),
                ReleaseUnit::Package(name) => Err(WorkspaceError::UnknownUnit {
                    name: name.clone(),
                }
                .into()),
            },
            (Some(_), Some(_)) => Err(VersionError::Inconsistent {
                unit: unit.name().to_string(),
                versions: versions.iter().map(|v| v.to_string()).collect(),
            }
            .into()),
        }
    }

    /// Version scheme for `unit`: configured for groups, else detected
    pub fn scheme_of(&self, unit: &ReleaseUnit, version: &Version) -> VersionScheme {
        if let ReleaseUnit::Group(name) = unit
            && let Some(scheme) = self.release_groups.get(name).and_then(|g| g.config.scheme)
        {
            return scheme;
        }
        VersionScheme::detect(version)
    }

    /// Whether `unit` keeps per-version release notes
    pub fn change_tracking(&self, unit: &ReleaseUnit) -> bool {
        match unit {
            ReleaseUnit::Group(name) => self
                .release_groups
                .get(name)
                .is_some_and(|g| g.config.change_tracking),
            ReleaseUnit::Package(_) => false,
        }
    }

    /// Record a version written to disk for every package of `unit`
    pub fn record_version(&mut self, unit: &ReleaseUnit, version: &Version) {
        let names: Vec<String> = self
            .packages_in(unit)
            .iter()
            .map(|p| p.name.clone())
            .collect();
        for name in names {
            if let Some(package) = self.packages.get_mut(&name) {
                package.version = version.clone();
            }
        }
    }

    /// Record a dependency range written to disk
    pub fn record_dependency_range(&mut self, package: &str, dependency: &str, range: &str) {
        let Some(info) = self.packages.get_mut(package) else {
            return;
        };
        for section in [
            &mut info.dependencies,
            &mut info.dev_dependencies,
            &mut info.peer_dependencies,
        ] {
            if let Some(existing) = section.get_mut(dependency) {
                *existing = range.to_string();
            }
        }
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Parse one manifest; manifests without a name or version are not packages
fn read_package(manifest_path: &Path) -> Result<Option<PackageInfo>> {
    let content = std::fs::read_to_string(manifest_path)?;
    let manifest: Manifest =
        serde_json::from_str(&content).map_err(|e| WorkspaceError::InvalidManifest {
            path: manifest_path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let (Some(name), Some(version)) = (manifest.name, manifest.version) else {
        log::debug!("Skipping {}: no name or version", manifest_path.display());
        return Ok(None);
    };
    let version = parse_version(&version)?;
    let directory = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    Ok(Some(PackageInfo {
        name,
        version,
        directory,
        manifest_path: manifest_path.to_path_buf(),
        private: manifest.private,
        release_group: None,
        dependencies: manifest.dependencies,
        dev_dependencies: manifest.dev_dependencies,
        peer_dependencies: manifest.peer_dependencies,
    }))
}
