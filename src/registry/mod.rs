//! npm registry queries for published versions.

use crate::error::{RegistryError, Result};
use semver::Version;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::future::Future;
use url::Url;

/// Public npm registry
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Abbreviated package metadata media type
const ABBREVIATED_METADATA: &str = "application/vnd.npm.install-v1+json";

/// Source of truth for which versions of a package are published
pub trait PackageRegistry {
    /// Every published version of `name`; empty when the package is unknown
    fn published_versions(&self, name: &str) -> impl Future<Output = Result<Vec<Version>>>;

    /// Whether `version` of `name` is published
    fn is_published(&self, name: &str, version: &Version) -> impl Future<Output = Result<bool>> {
        async move {
            Ok(self
                .published_versions(name)
                .await?
                .iter()
                .any(|published| published == version))
        }
    }
}

#[derive(Debug, Deserialize)]
struct PackageDocument {
    #[serde(default)]
    versions: BTreeMap<String, serde_json::Value>,
}

/// HTTP client for an npm-compatible registry
#[derive(Debug, Clone)]
pub struct NpmRegistry {
    client: reqwest::Client,
    base: Url,
}

impl NpmRegistry {
    /// Client for the registry at `base`
    pub fn new(base: &str) -> Result<Self> {
        let mut normalized = base.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base = Url::parse(&normalized).map_err(|e| RegistryError::InvalidUrl {
            url: base.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            base,
        })
    }

    /// Client for `--registry`, else `NPM_CONFIG_REGISTRY`, else the public registry
    pub fn from_env(registry: Option<&str>) -> Result<Self> {
        match registry {
            Some(url) => Self::new(url),
            None => match std::env::var("NPM_CONFIG_REGISTRY") {
                Ok(url) if !url.trim().is_empty() => Self::new(&url),
                _ => Self::new(DEFAULT_REGISTRY),
            },
        }
    }

    /// Metadata URL for a package; the scope separator is escaped
    pub fn package_url(&self, name: &str) -> Result<Url> {
        let encoded = name.replace('/', "%2f");
        self.base
            .join(&encoded)
            .map_err(|e| {
                RegistryError::InvalidUrl {
                    url: format!("{}{encoded}", self.base),
                    reason: e.to_string(),
                }
                .into()
            })
    }
}

impl PackageRegistry for NpmRegistry {
    async fn published_versions(&self, name: &str) -> Result<Vec<Version>> {
        let url = self.package_url(name)?;
        log::debug!("GET {url}");
        let request_failed = |reason: String| RegistryError::RequestFailed {
            package: name.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, ABBREVIATED_METADATA)
            .send()
            .await
            .map_err(|e| request_failed(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            log::debug!("{name} is not on the registry");
            return Ok(Vec::new());
        }
        let response = response
            .error_for_status()
            .map_err(|e| request_failed(e.to_string()))?;
        let document: PackageDocument = response
            .json()
            .await
            .map_err(|e| request_failed(e.to_string()))?;

        Ok(document
            .versions
            .keys()
            .filter_map(|v| Version::parse(v).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_package_url() {
        let registry = NpmRegistry::new("https://registry.npmjs.org").unwrap();
        assert_eq!(
            registry.package_url("@fluidframework/core").unwrap().as_str(),
            "https://registry.npmjs.org/@fluidframework%2fcore"
        );
        assert_eq!(
            registry.package_url("left-pad").unwrap().as_str(),
            "https://registry.npmjs.org/left-pad"
        );
    }

    #[test]
    fn test_registry_with_path_prefix() {
        let registry = NpmRegistry::new("https://npm.example.com/api/npm/").unwrap();
        assert_eq!(
            registry.package_url("a").unwrap().as_str(),
            "https://npm.example.com/api/npm/a"
        );
    }

    #[test]
    fn test_invalid_registry_url() {
        assert!(NpmRegistry::new("not a url").is_err());
    }

    #[test]
    fn test_document_parsing() {
        let document: PackageDocument = serde_json::from_str(
            r#"{"name":"a","versions":{"1.0.0":{},"1.1.0-rc.1":{},"bogus":{}}}"#,
        )
        .unwrap();
        let versions: Vec<Version> = document
            .versions
            .keys()
            .filter_map(|v| Version::parse(v).ok())
            .collect();
        assert_eq!(versions.len(), 2);
    }
}
