//! Shared types for package declarations.
//!
//! This module defines the versions, version ranges, target platforms and
//! package references used throughout usagescope.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use super::ParseError;

/// A semantic package version (`major.minor.patch[.revision][-prerelease]`).
///
/// Build metadata (`+...`) is accepted and discarded. The original text is
/// normalized on display, so `1.2` is shown as `1.2.0` and `1.2.0.0` as
/// `1.2.0`. A zero revision is the same as no revision: equality, hashing and
/// ordering all agree on that.
///
/// # Example
///
/// ```
/// use usagescope::parser::types::Version;
///
/// let v: Version = "1.2.3-beta".parse().unwrap();
/// assert_eq!(v.major, 1);
/// assert_eq!(v.to_string(), "1.2.3-beta");
/// ```
#[derive(Debug, Clone)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Fourth component used by some package ecosystems.
    pub revision: Option<u64>,
    /// Prerelease label without the leading dash.
    pub prerelease: Option<String>,
}

impl Version {
    /// Creates a release version.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            revision: None,
            prerelease: None,
        }
    }

    fn release(&self) -> (u64, u64, u64, u64) {
        (
            self.major,
            self.minor,
            self.patch,
            self.revision.unwrap_or(0),
        )
    }
}

impl FromStr for Version {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidVersion(s.to_string());

        let trimmed = s.trim();
        let without_build = trimmed.split('+').next().unwrap_or_default();
        let (numbers, prerelease) = match without_build.split_once('-') {
            Some((numbers, pre)) if !pre.is_empty() => (numbers, Some(pre.to_string())),
            Some(_) => return Err(invalid()),
            None => (without_build, None),
        };

        let parts: Vec<&str> = numbers.split('.').collect();
        if parts.is_empty() || parts.len() > 4 {
            return Err(invalid());
        }

        let mut components = [0u64; 4];
        for (slot, part) in components.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            *slot = part.parse().map_err(|_| invalid())?;
        }

        Ok(Self {
            major: components[0],
            minor: components[1],
            patch: components[2],
            revision: (parts.len() == 4 && components[3] != 0).then_some(components[3]),
            prerelease,
        })
    }
}

/// Compares prerelease labels identifier by identifier; numeric identifiers
/// compare by value and rank below alphanumeric ones.
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(m), Ok(n)) => m.cmp(&n).then_with(|| x.cmp(y)),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.release()
            .cmp(&other.release())
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => compare_prerelease(a, b),
            })
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.release().hash(state);
        self.prerelease.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(revision) = self.revision.filter(|r| *r != 0) {
            write!(f, ".{}", revision)?;
        }
        if let Some(pre) = &self.prerelease {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

impl Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A declared dependency version range.
///
/// Accepts a bare version (`1.0.0`, meaning "at least 1.0.0") or interval
/// notation (`[1.0.0, 2.0.0)`, `(, 3.0]`). Only the lower bound matters to
/// graph resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    pub min: Option<Version>,
    pub max: Option<Version>,
}

impl VersionRange {
    /// Returns the lowest version the range admits, if it has a lower bound.
    pub fn min_version(&self) -> Option<&Version> {
        self.min.as_ref()
    }
}

impl FromStr for VersionRange {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || ParseError::InvalidVersionRange(s.to_string());

        let opens = trimmed.starts_with('[') || trimmed.starts_with('(');
        let closes = trimmed.ends_with(']') || trimmed.ends_with(')');
        if !opens && !closes {
            let min = trimmed.parse::<Version>().map_err(|_| invalid())?;
            return Ok(Self {
                min: Some(min),
                max: None,
            });
        }
        if !(opens && closes) || trimmed.len() < 2 {
            return Err(invalid());
        }

        let inner = &trimmed[1..trimmed.len() - 1];
        let bound = |part: &str| -> Result<Option<Version>, ParseError> {
            let part = part.trim();
            if part.is_empty() {
                Ok(None)
            } else {
                part.parse().map(Some).map_err(|_| invalid())
            }
        };

        match inner.split_once(',') {
            Some((lower, upper)) => Ok(Self {
                min: bound(lower)?,
                max: bound(upper)?,
            }),
            // `[1.0.0]` pins an exact version.
            None => {
                let exact = bound(inner)?.ok_or_else(invalid)?;
                Ok(Self {
                    min: Some(exact.clone()),
                    max: Some(exact),
                })
            }
        }
    }
}

/// The platform a project compiles for, e.g. `net8.0` or `netstandard2.0`.
///
/// A platform is split into an alphabetic family and an optional numeric
/// version so that dependency groups written for an older version of the
/// same family are considered compatible.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetPlatform {
    moniker: String,
}

impl TargetPlatform {
    /// Creates a platform from its moniker.
    pub fn new(moniker: impl Into<String>) -> Self {
        Self {
            moniker: moniker.into(),
        }
    }

    /// The moniker as written.
    pub fn moniker(&self) -> &str {
        &self.moniker
    }

    /// Lowercased alphabetic prefix of the moniker.
    pub fn family(&self) -> String {
        self.moniker
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_ascii_lowercase()
    }

    /// Numeric version following the family, as `(major, minor)`.
    pub fn version(&self) -> Option<(u64, u64)> {
        let rest: String = self
            .moniker
            .chars()
            .skip_while(|c| c.is_ascii_alphabetic())
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if rest.is_empty() {
            return None;
        }
        let mut parts = rest.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        Some((major, minor))
    }

    /// Returns true if the moniker denotes "any platform".
    pub fn is_agnostic(&self) -> bool {
        let m = self.moniker.trim();
        m.is_empty() || m.eq_ignore_ascii_case("any") || m.eq_ignore_ascii_case("agnostic")
    }

    /// Returns true if a dependency group targeting `group` can be consumed
    /// by a project targeting `self`.
    pub fn is_compatible_with(&self, group: &TargetPlatform) -> bool {
        if group.is_agnostic() || self.moniker.eq_ignore_ascii_case(&group.moniker) {
            return true;
        }
        if self.family() != group.family() {
            return false;
        }
        match (self.version(), group.version()) {
            (Some(ours), Some(theirs)) => theirs <= ours,
            (_, None) => true,
            (None, Some(_)) => false,
        }
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.moniker)
    }
}

/// An explicit package declaration of a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageReference {
    /// The package name (e.g., "Newtonsoft.Json").
    pub name: String,

    /// The exact declared version.
    pub version: Version,
}

impl PackageReference {
    /// Creates a new PackageReference instance.
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}
