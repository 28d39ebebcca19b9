//! Verification that package dependencies are present in `node_modules`.

use super::analyzer::PackageInfo;
use crate::error::Result;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
struct InstalledManifest {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

/// A dependency that could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDependency {
    /// Package (or installed module) that declares the dependency
    pub required_by: String,
    /// Dependency name
    pub dependency: String,
}

/// Resolve `name` from `from` the way Node does: `node_modules/<name>` in
/// `from` and then in each ancestor, stopping at `root`. A directory that
/// is itself a `node_modules` is searched directly.
pub fn resolve_module(from: &Path, name: &str, root: &Path) -> Option<PathBuf> {
    let mut dir = Some(from);
    while let Some(current) = dir {
        let candidate = if current.file_name().is_some_and(|n| n == "node_modules") {
            current.join(name)
        } else {
            current.join("node_modules").join(name)
        };
        if candidate.join("package.json").is_file() {
            return Some(candidate);
        }
        if current == root {
            break;
        }
        dir = current.parent();
    }
    None
}

/// Symlinks resolved; the path itself when it cannot be
async fn real_path(path: &Path) -> PathBuf {
    tokio::fs::canonicalize(path)
        .await
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Find every dependency of `packages` that is not installed.
///
/// Direct `dependencies` and `devDependencies` are checked, then the
/// `dependencies` of each resolved module, each module visited once.
/// Modules resolve their own dependencies from their real location, so
/// symlinked stores (pnpm's `node_modules/.pnpm`) resolve like Node does.
pub async fn find_missing_dependencies(
    packages: &[&PackageInfo],
    root: &Path,
) -> Result<Vec<MissingDependency>> {
    let root = real_path(root).await;
    let mut pending: Vec<(PathBuf, String, String)> = Vec::new();
    for package in packages {
        let directory = real_path(&package.directory).await;
        for name in package
            .dependencies
            .keys()
            .chain(package.dev_dependencies.keys())
        {
            pending.push((directory.clone(), package.name.clone(), name.clone()));
        }
    }

    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut missing = Vec::new();

    while let Some((from, required_by, name)) = pending.pop() {
        let Some(link) = resolve_module(&from, &name, &root) else {
            missing.push(MissingDependency {
                required_by,
                dependency: name,
            });
            continue;
        };
        let module = real_path(&link).await;
        if !visited.insert(module.clone()) {
            continue;
        }

        let content = tokio::fs::read_to_string(module.join("package.json")).await?;
        let manifest: InstalledManifest = serde_json::from_str(&content).unwrap_or_else(|e| {
            log::debug!("Unreadable manifest in {}: {e}", module.display());
            InstalledManifest::default()
        });
        for dependency in manifest.dependencies.into_keys() {
            pending.push((module.clone(), name.clone(), dependency));
        }
    }

    missing.sort_by(|a, b| {
        (&a.required_by, &a.dependency).cmp(&(&b.required_by, &b.dependency))
    });
    missing.dedup();
    Ok(missing)
}
