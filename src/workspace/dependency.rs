//! Detection of dependencies pinned to unreleased prerelease versions.

use super::analyzer::{MonoRepo, ReleaseUnit};
use crate::version::VersionScheme;
use regex::Regex;
use semver::{Prerelease, Version};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Leading version of a simple range: `^2.0.0-rc.1`, `~1.2.3`, `>=1.0.0`
static RANGE_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[\^~=v]|>=)*\s*(\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?)")
        .expect("range version regex is valid")
});

/// Number of prerelease identifiers in a released internal version
/// (`internal.A.B.C`); anything longer is a dev build.
const INTERNAL_RELEASE_IDENTIFIERS: usize = 4;

/// Sibling units the released unit depends on at prerelease versions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrereleaseDependencies {
    /// Release groups, with the prerelease version depended on
    pub release_groups: BTreeMap<String, Version>,
    /// Independent packages, with the prerelease version depended on
    pub packages: BTreeMap<String, Version>,
    /// Every dependency package name, with the prerelease version pinned
    pub dependencies: BTreeMap<String, Version>,
}

impl PrereleaseDependencies {
    /// No prerelease dependencies were found
    pub fn is_empty(&self) -> bool {
        self.release_groups.is_empty() && self.packages.is_empty()
    }

    /// Unit names and versions, groups first, for reporting
    pub fn units(&self) -> impl Iterator<Item = (&str, &Version)> {
        self.release_groups
            .iter()
            .chain(&self.packages)
            .map(|(name, version)| (name.as_str(), version))
    }
}

/// Extract the version a range pins, if it is a simple range
pub fn pinned_version(range: &str) -> Option<Version> {
    if range.contains(':') {
        return None;
    }
    let caps = RANGE_VERSION_RE.captures(range)?;
    Version::parse(caps.get(1)?.as_str()).ok()
}

/// Whether `version` is a prerelease under its own scheme
pub fn is_prerelease(version: &Version) -> bool {
    match VersionScheme::detect(version) {
        VersionScheme::Internal => {
            version.pre.as_str().split('.').count() > INTERNAL_RELEASE_IDENTIFIERS
        }
        VersionScheme::Semver => !version.pre.is_empty(),
    }
}

/// The release a prerelease version leads up to
pub fn released_counterpart(version: &Version) -> Version {
    let mut released = Version::new(version.major, version.minor, version.patch);
    if VersionScheme::detect(version) == VersionScheme::Internal {
        let kept: Vec<&str> = version
            .pre
            .as_str()
            .split('.')
            .take(INTERNAL_RELEASE_IDENTIFIERS)
            .collect();
        released.pre = Prerelease::new(&kept.join(".")).unwrap_or(Prerelease::EMPTY);
    }
    released
}

/// Scan `unit` for dependencies on other units of the repository that are
/// pinned to prerelease versions.
pub fn find_prerelease_dependencies(repo: &MonoRepo, unit: &ReleaseUnit) -> PrereleaseDependencies {
    let mut found = PrereleaseDependencies::default();

    for package in repo.packages_in(unit) {
        for (dependency, range) in package.all_dependencies() {
            let Some(dependency_unit) = repo.unit_of_package(dependency) else {
                continue;
            };
            if dependency_unit == *unit {
                continue;
            }
            let Some(version) = pinned_version(range) else {
                continue;
            };
            if !is_prerelease(&version) {
                continue;
            }

            log::debug!(
                "{} depends on prerelease {dependency}@{range} ({dependency_unit})",
                package.name
            );
            found
                .dependencies
                .insert(dependency.to_string(), version.clone());
            let target = match &dependency_unit {
                ReleaseUnit::Group(_) => &mut found.release_groups,
                ReleaseUnit::Package(_) => &mut found.packages,
            };
            target.insert(dependency_unit.name().to_string(), version);
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn write_package(root: &Path, dir: &str, json: &str) {
        let path = root.join(dir);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("package.json"), json).unwrap();
    }

    #[test]
    fn test_pinned_version() {
        assert_eq!(pinned_version("^2.0.0-rc.1"), Some(v("2.0.0-rc.1")));
        assert_eq!(pinned_version("~1.2.3"), Some(v("1.2.3")));
        assert_eq!(pinned_version(">=1.0.0 <2.0.0"), Some(v("1.0.0")));
        assert_eq!(pinned_version("workspace:~"), None);
        assert_eq!(pinned_version("latest"), None);
    }

    #[test]
    fn test_prerelease_detection_per_scheme() {
        assert!(is_prerelease(&v("2.0.0-rc.1")));
        assert!(!is_prerelease(&v("2.0.0")));
        assert!(!is_prerelease(&v("2.0.0-internal.3.0.0")));
        assert!(is_prerelease(&v("2.0.0-internal.3.0.0.12345")));
    }

    #[test]
    fn test_released_counterpart() {
        assert_eq!(released_counterpart(&v("2.0.0-rc.1")), v("2.0.0"));
        assert_eq!(
            released_counterpart(&v("2.0.0-internal.3.0.0.12345")),
            v("2.0.0-internal.3.0.0")
        );
    }

    #[test]
    fn test_scan_finds_other_units_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("monorel.toml"),
            "[release_groups.client]\ndirectory = \"packages\"\n\n[release_groups.server]\ndirectory = \"server\"\n",
        )
        .unwrap();
        write_package(
            root,
            "packages/a",
            r#"{"name":"a","version":"2.0.0","dependencies":{"b":"^2.0.0-rc.1","s":"~1.0.0-rc.2","lone":"^0.3.0-dev.1","ext":"^5.0.0-beta.1"}}"#,
        );
        write_package(root, "packages/b", r#"{"name":"b","version":"2.0.0-rc.1"}"#);
        write_package(root, "server/s", r#"{"name":"s","version":"1.0.0-rc.2"}"#);
        write_package(root, "lone", r#"{"name":"lone","version":"0.3.0-dev.1"}"#);

        let repo = MonoRepo::load(root).unwrap();
        let found = find_prerelease_dependencies(&repo, &ReleaseUnit::Group("client".to_string()));

        assert!(!found.is_empty());
        assert_eq!(found.release_groups.get("server"), Some(&v("1.0.0-rc.2")));
        assert_eq!(found.packages.get("lone"), Some(&v("0.3.0-dev.1")));
        assert!(!found.release_groups.contains_key("client"));
        assert!(!found.dependencies.contains_key("ext"));
        assert_eq!(found.dependencies.len(), 2);
    }

    #[test]
    fn test_scan_is_empty_without_prereleases() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_package(root, "a", r#"{"name":"a","version":"1.0.0","dependencies":{"b":"^1.0.0"}}"#);
        write_package(root, "b", r#"{"name":"b","version":"1.0.0"}"#);

        let repo = MonoRepo::load(root).unwrap();
        let found = find_prerelease_dependencies(&repo, &ReleaseUnit::Package("a".to_string()));
        assert!(found.is_empty());
    }
}
