//! package.json version rewriting.
//!
//! Manifests are edited as ordered JSON so key order and unrelated fields
//! survive a rewrite; only `version` and dependency ranges are touched.

use crate::error::{ReleaseError, Result, VersionError};
use crate::workspace::PackageInfo;
use semver::Version;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Dependency sections that may reference sibling packages
pub const DEPENDENCY_SECTIONS: [&str; 4] = [
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

/// In-memory editor for a single package.json
#[derive(Debug)]
pub struct ManifestEditor {
    path: PathBuf,
    doc: Map<String, Value>,
    modified: bool,
}

impl ManifestEditor {
    /// Read and parse a manifest
    pub async fn open(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            VersionError::ManifestUpdateFailed {
                path: path.to_path_buf(),
                reason: format!("Failed to read file: {e}"),
            }
        })?;
        let doc = match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(VersionError::ManifestUpdateFailed {
                    path: path.to_path_buf(),
                    reason: "top-level value is not an object".to_string(),
                }
                .into());
            }
            Err(e) => {
                return Err(VersionError::ManifestUpdateFailed {
                    path: path.to_path_buf(),
                    reason: format!("Failed to parse JSON: {e}"),
                }
                .into());
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            doc,
            modified: false,
        })
    }

    /// Current `version` field
    pub fn version(&self) -> Option<&str> {
        self.doc.get("version").and_then(Value::as_str)
    }

    /// Set `version`; returns whether the value changed
    pub fn set_version(&mut self, version: &Version) -> bool {
        let new = version.to_string();
        if self.version() == Some(new.as_str()) {
            return false;
        }
        self.doc.insert("version".to_string(), Value::String(new));
        self.modified = true;
        true
    }

    /// Point every range on `dependency` at `version`, keeping its `^`/`~`
    /// prefix. Returns the number of ranges rewritten.
    pub fn update_dependency_range(&mut self, dependency: &str, version: &Version) -> usize {
        let mut changed = 0;
        for section in DEPENDENCY_SECTIONS {
            let Some(Value::Object(deps)) = self.doc.get_mut(section) else {
                continue;
            };
            let Some(Value::String(range)) = deps.get_mut(dependency) else {
                continue;
            };
            match rewrite_range(range, version) {
                Some(new_range) if new_range != *range => {
                    log::debug!(
                        "{}: {section}.{dependency} {range} -> {new_range}",
                        self.path.display()
                    );
                    *range = new_range;
                    changed += 1;
                }
                Some(_) => {}
                None => log::debug!(
                    "{}: leaving {section}.{dependency} = {range} untouched",
                    self.path.display()
                ),
            }
        }
        if changed > 0 {
            self.modified = true;
        }
        changed
    }

    /// Whether anything changed since `open`
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    fn render(&self) -> Result<String> {
        let mut content = serde_json::to_string_pretty(&self.doc)?;
        content.push('\n');
        Ok(content)
    }

    fn write_failed(path: &Path, action: &str, e: std::io::Error) -> ReleaseError {
        VersionError::ManifestUpdateFailed {
            path: path.to_path_buf(),
            reason: format!("Failed to {action} file: {e}"),
        }
        .into()
    }

    /// Write the manifest back with two-space indentation and a final newline
    pub async fn save(&self) -> Result<()> {
        let content = self.render()?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| Self::write_failed(&self.path, "write", e))
    }
}

/// Save every modified editor, or none of them.
///
/// Each manifest is first written next to its target; the targets are only
/// replaced once every write succeeded.
pub async fn save_all(editors: &[ManifestEditor]) -> Result<Vec<PathBuf>> {
    let mut staged: Vec<(PathBuf, &Path)> = Vec::new();
    for editor in editors.iter().filter(|e| e.is_modified()) {
        let staging = editor.path.with_extension("json.monorel-tmp");
        let written = match editor.render() {
            Ok(content) => tokio::fs::write(&staging, content)
                .await
                .map_err(|e| ManifestEditor::write_failed(&staging, "write", e)),
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            for (path, _) in &staged {
                if let Err(cleanup) = tokio::fs::remove_file(path).await {
                    log::debug!("Could not remove {}: {cleanup}", path.display());
                }
            }
            return Err(e);
        }
        staged.push((staging, &editor.path));
    }

    let mut saved = Vec::with_capacity(staged.len());
    for (staging, target) in staged {
        tokio::fs::rename(&staging, target)
            .await
            .map_err(|e| ManifestEditor::write_failed(target, "replace", e))?;
        saved.push(target.to_path_buf());
    }
    Ok(saved)
}

/// Rewrite a simple range (`^1.2.3`, `~1.2.3-rc.1`, `1.2.3`) to `version`.
///
/// Protocol ranges (`workspace:`, `npm:`, `file:`) and compound ranges are
/// not rewritten.
pub fn rewrite_range(range: &str, version: &Version) -> Option<String> {
    let trimmed = range.trim();
    if trimmed.contains(':') || trimmed.contains(' ') || trimmed.contains("||") {
        return None;
    }
    let prefix_len = trimmed
        .chars()
        .take_while(|c| matches!(c, '^' | '~' | '='))
        .count();
    let (prefix, rest) = trimmed.split_at(prefix_len);
    Version::parse(rest).ok()?;
    Some(format!("{prefix}{version}"))
}

/// Result of a version update operation
#[derive(Debug, Clone, Default)]
pub struct UpdateResult {
    /// Number of packages whose own version changed
    pub packages_updated: usize,
    /// Number of dependency ranges rewritten
    pub dependencies_updated: usize,
    /// Files that were modified
    pub modified_files: Vec<PathBuf>,
}

/// Coordinates version rewrites across the packages of one release unit
#[derive(Debug)]
pub struct VersionUpdater<'a> {
    packages: Vec<&'a PackageInfo>,
}

impl<'a> VersionUpdater<'a> {
    /// Create an updater over the unit's packages
    pub fn new(packages: Vec<&'a PackageInfo>) -> Self {
        Self { packages }
    }

    async fn open_all(&self) -> Result<Vec<ManifestEditor>> {
        let mut editors = Vec::with_capacity(self.packages.len());
        for package in &self.packages {
            editors.push(ManifestEditor::open(&package.manifest_path).await?);
        }
        Ok(editors)
    }

    /// Set every package to `new_version` and move ranges between packages
    /// of the unit along with it. Every manifest is read and edited before
    /// any is written, so an unreadable one leaves the unit untouched.
    pub async fn set_version(&self, new_version: &Version) -> Result<UpdateResult> {
        let names: Vec<&str> = self.packages.iter().map(|p| p.name.as_str()).collect();
        let mut result = UpdateResult::default();

        let mut editors = self.open_all().await?;
        for (package, editor) in self.packages.iter().zip(editors.iter_mut()) {
            if editor.set_version(new_version) {
                result.packages_updated += 1;
            }
            for sibling in &names {
                if *sibling != package.name {
                    result.dependencies_updated +=
                        editor.update_dependency_range(sibling, new_version);
                }
            }
        }
        result.modified_files = save_all(&editors).await?;

        log::info!(
            "Set version {new_version}: {} package(s), {} range(s)",
            result.packages_updated,
            result.dependencies_updated
        );
        Ok(result)
    }

    /// Rewrite ranges on the given dependencies to the given versions.
    pub async fn update_dependencies(
        &self,
        updates: &BTreeMap<String, Version>,
    ) -> Result<UpdateResult> {
        let mut result = UpdateResult::default();
        let mut editors = self.open_all().await?;
        for editor in &mut editors {
            for (dependency, version) in updates {
                result.dependencies_updated += editor.update_dependency_range(dependency, version);
            }
        }
        result.modified_files = save_all(&editors).await?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_rewrite_range_keeps_prefix() {
        assert_eq!(rewrite_range("^2.0.0-rc.1", &v("2.0.0")).as_deref(), Some("^2.0.0"));
        assert_eq!(rewrite_range("~1.4.0", &v("1.5.0")).as_deref(), Some("~1.5.0"));
        assert_eq!(rewrite_range("1.0.0-dev.3", &v("1.0.0")).as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_rewrite_range_skips_protocols_and_compound_ranges() {
        assert_eq!(rewrite_range("workspace:~", &v("1.0.0")), None);
        assert_eq!(rewrite_range("npm:@scope/pkg@1.0.0", &v("1.0.0")), None);
        assert_eq!(rewrite_range(">=1.0.0 <2.0.0", &v("1.0.0")), None);
        assert_eq!(rewrite_range("^1 || ^2", &v("1.0.0")), None);
    }

    #[tokio::test]
    async fn test_editor_preserves_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(
            &path,
            r#"{"name":"a","version":"1.0.0","scripts":{"build":"tsc"},"dependencies":{"b":"^1.0.0"}}"#,
        )
        .unwrap();

        let mut editor = ManifestEditor::open(&path).await.unwrap();
        assert!(editor.set_version(&v("1.1.0")));
        assert_eq!(editor.update_dependency_range("b", &v("1.1.0")), 1);
        editor.save().await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let name_at = written.find("\"name\"").unwrap();
        let scripts_at = written.find("\"scripts\"").unwrap();
        assert!(name_at < scripts_at);
        assert!(written.contains("\"version\": \"1.1.0\""));
        assert!(written.contains("\"b\": \"^1.1.0\""));
        assert!(written.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_set_version_is_noop_when_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, r#"{"name":"a","version":"1.0.0"}"#).unwrap();

        let mut editor = ManifestEditor::open(&path).await.unwrap();
        assert!(!editor.set_version(&v("1.0.0")));
        assert!(!editor.is_modified());
    }

    fn package(dir: &Path, name: &str) -> PackageInfo {
        PackageInfo {
            name: name.to_string(),
            version: v("1.0.0"),
            directory: dir.to_path_buf(),
            manifest_path: dir.join("package.json"),
            private: false,
            release_group: Some("client".to_string()),
            dependencies: BTreeMap::new(),
            dev_dependencies: BTreeMap::new(),
            peer_dependencies: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_set_version_writes_nothing_when_a_manifest_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();
        let original = r#"{"name":"a","version":"1.0.0","dependencies":{"b":"^1.0.0"}}"#;
        std::fs::write(a.join("package.json"), original).unwrap();
        std::fs::write(b.join("package.json"), r#"{"name":"b","version":"#).unwrap();

        let (pa, pb) = (package(&a, "a"), package(&b, "b"));
        let updater = VersionUpdater::new(vec![&pa, &pb]);
        assert!(updater.set_version(&v("1.1.0")).await.is_err());

        assert_eq!(std::fs::read_to_string(a.join("package.json")).unwrap(), original);
        assert!(!a.join("package.json.monorel-tmp").exists());
    }

    #[tokio::test]
    async fn test_set_version_moves_the_whole_unit() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();
        std::fs::write(
            a.join("package.json"),
            r#"{"name":"a","version":"1.0.0","dependencies":{"b":"^1.0.0"}}"#,
        )
        .unwrap();
        std::fs::write(b.join("package.json"), r#"{"name":"b","version":"1.0.0"}"#).unwrap();

        let (pa, pb) = (package(&a, "a"), package(&b, "b"));
        let result = VersionUpdater::new(vec![&pa, &pb])
            .set_version(&v("1.1.0"))
            .await
            .unwrap();
        assert_eq!(result.packages_updated, 2);
        assert_eq!(result.dependencies_updated, 1);
        assert_eq!(result.modified_files.len(), 2);

        let written = std::fs::read_to_string(a.join("package.json")).unwrap();
        assert!(written.contains("\"b\": \"^1.1.0\""));
        assert!(!b.join("package.json.monorel-tmp").exists());
    }
}
