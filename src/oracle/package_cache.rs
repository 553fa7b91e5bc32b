//! Package specifications read from an on-disk package cache.
//!
//! Specifications are stored as JSON documents at
//! `<root>/<lowercase-name>/<version>/<lowercase-name>.spec.json`, using the
//! same schema as [`PackageSpecification`].

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{PackageSpecification, SpecificationError, SpecificationSource};
use crate::parser::types::Version;

/// Environment variable overriding the default cache location.
pub const PACKAGE_CACHE_ENV: &str = "USAGESCOPE_PACKAGE_CACHE";

/// A [`SpecificationSource`] backed by a directory tree.
#[derive(Debug, Clone)]
pub struct PackageCache {
    root: PathBuf,
}

impl PackageCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache rooted at `$USAGESCOPE_PACKAGE_CACHE`, or `~/.usagescope/packages`.
    pub fn from_env() -> Option<Self> {
        if let Some(root) = std::env::var_os(PACKAGE_CACHE_ENV) {
            return Some(Self::new(root));
        }
        let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"))?;
        Some(Self::new(Path::new(&home).join(".usagescope").join("packages")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the specification document for `name` at `version`.
    pub fn spec_path(&self, name: &str, version: &Version) -> PathBuf {
        let id = name.to_lowercase();
        self.root
            .join(&id)
            .join(version.to_string())
            .join(format!("{}.spec.json", id))
    }
}

#[async_trait]
impl SpecificationSource for PackageCache {
    async fn get_specification(
        &self,
        name: &str,
        version: &Version,
    ) -> Result<Option<PackageSpecification>, SpecificationError> {
        let path = self.spec_path(name, version);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Unable to find package specification: {}", path.display());
                return Ok(None);
            }
            Err(source) => {
                return Err(SpecificationError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| SpecificationError::Malformed {
                path: path.display().to_string(),
                source,
            })
    }
}
