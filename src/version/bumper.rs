//! Version bump computation for the supported version schemes.

use crate::error::{Result, VersionError};
use semver::{BuildMetadata, Prerelease, Version};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Prerelease prefix that marks the internal version scheme.
const INTERNAL_PREFIX: &str = "internal";

/// Kind of release being performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum VersionBump {
    /// Breaking release
    Major,
    /// Feature release
    Minor,
    /// Fix release
    Patch,
}

impl fmt::Display for VersionBump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionBump::Major => write!(f, "major"),
            VersionBump::Minor => write!(f, "minor"),
            VersionBump::Patch => write!(f, "patch"),
        }
    }
}

impl FromStr for VersionBump {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "major" => Ok(VersionBump::Major),
            "minor" => Ok(VersionBump::Minor),
            "patch" => Ok(VersionBump::Patch),
            other => Err(format!("unknown bump type '{other}'")),
        }
    }
}

/// How a version string is interpreted when bumping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionScheme {
    /// Plain semantic versioning (npm `semver.inc` rules)
    #[default]
    Semver,
    /// `X.0.0-internal.A.B.C`: the public major stays fixed and bumps act on `A.B.C`
    Internal,
}

impl VersionScheme {
    /// Infer the scheme from the shape of a version.
    pub fn detect(version: &Version) -> Self {
        let is_internal = version
            .pre
            .as_str()
            .split('.')
            .next()
            .is_some_and(|first| first == INTERNAL_PREFIX);
        if is_internal {
            VersionScheme::Internal
        } else {
            VersionScheme::Semver
        }
    }
}

impl fmt::Display for VersionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionScheme::Semver => write!(f, "semver"),
            VersionScheme::Internal => write!(f, "internal"),
        }
    }
}

/// Computes the next version from a current version.
#[derive(Debug, Clone)]
pub struct VersionBumper {
    current: Version,
    scheme: VersionScheme,
}

impl VersionBumper {
    /// Bumper for `current`, detecting the scheme from the version itself
    pub fn from_version(current: Version) -> Self {
        let scheme = VersionScheme::detect(&current);
        Self { current, scheme }
    }

    /// Bumper with an explicit scheme
    pub fn new(current: Version, scheme: VersionScheme) -> Self {
        Self { current, scheme }
    }

    /// Scheme in effect
    pub fn scheme(&self) -> VersionScheme {
        self.scheme
    }

    /// Compute the bumped version.
    pub fn bump(&self, bump: VersionBump) -> Result<Version> {
        match self.scheme {
            VersionScheme::Semver => Ok(bump_semver(&self.current, bump)),
            VersionScheme::Internal => bump_internal(&self.current, bump),
        }
    }
}

/// Follows npm's `semver.inc`: a prerelease whose lower components are
/// already zero releases to its own base version instead of skipping it.
fn bump_semver(current: &Version, bump: VersionBump) -> Version {
    let is_pre = !current.pre.is_empty();
    let mut next = match bump {
        VersionBump::Major => {
            if is_pre && current.minor == 0 && current.patch == 0 {
                Version::new(current.major, 0, 0)
            } else {
                Version::new(current.major + 1, 0, 0)
            }
        }
        VersionBump::Minor => {
            if is_pre && current.patch == 0 {
                Version::new(current.major, current.minor, 0)
            } else {
                Version::new(current.major, current.minor + 1, 0)
            }
        }
        VersionBump::Patch => {
            if is_pre {
                Version::new(current.major, current.minor, current.patch)
            } else {
                Version::new(current.major, current.minor, current.patch + 1)
            }
        }
    };
    next.build = BuildMetadata::EMPTY;
    next
}

fn bump_internal(current: &Version, bump: VersionBump) -> Result<Version> {
    let mismatch = || VersionError::SchemeMismatch {
        version: current.to_string(),
        scheme: VersionScheme::Internal.to_string(),
    };

    let parts: Vec<&str> = current.pre.as_str().split('.').collect();
    let [prefix, a, b, c] = parts.as_slice() else {
        return Err(mismatch().into());
    };
    if *prefix != INTERNAL_PREFIX {
        return Err(mismatch().into());
    }
    let parse = |s: &str| s.parse::<u64>().map_err(|_| mismatch());
    let (a, b, c) = (parse(a)?, parse(b)?, parse(c)?);

    let (a, b, c) = match bump {
        VersionBump::Major => (a + 1, 0, 0),
        VersionBump::Minor => (a, b + 1, 0),
        VersionBump::Patch => (a, b, c + 1),
    };

    let pre = Prerelease::new(&format!("{INTERNAL_PREFIX}.{a}.{b}.{c}")).map_err(|e| {
        VersionError::ParseFailed {
            version: current.to_string(),
            source: e,
        }
    })?;

    let mut next = Version::new(current.major, current.minor, current.patch);
    next.pre = pre;
    Ok(next)
}

/// Parse a version string with the crate error type.
pub fn parse_version(version: &str) -> Result<Version> {
    Version::parse(version.trim()).map_err(|e| {
        VersionError::ParseFailed {
            version: version.to_string(),
            source: e,
        }
        .into()
    })
}
