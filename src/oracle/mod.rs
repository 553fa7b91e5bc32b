//! Collaborator interfaces consumed by the analysis engine.
//!
//! The engine never parses project files, compiles source or reads binary
//! modules itself. Those concerns sit behind the traits in this module and
//! are supplied by the host: the [`snapshot`] host reads a JSON workspace
//! snapshot, and [`package_cache`] reads package specifications from an
//! on-disk cache.
//!
//! All traits are object safe (via `async_trait`) so the inspector can hold
//! them as `Arc<dyn ...>` and share them across worker tasks.

pub mod layout;
pub mod package_cache;
pub mod snapshot;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::parser::types::{PackageReference, TargetPlatform, Version, VersionRange};
use crate::parser::ParseError;

pub use layout::LayoutError;
pub use package_cache::PackageCache;
pub use snapshot::{InMemorySpecifications, SnapshotWorkspace};

/// Identity of a symbol exported by a module (fully qualified name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(pub String);

impl SymbolId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a source document of a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub String);

impl FileId {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A position in a source document (1-indexed line and column).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    pub file: FileId,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: FileId::new(file),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// One reference to a symbol found by a [`ReferenceOracle`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolReference {
    /// The referenced symbol.
    pub symbol: SymbolId,
    /// Where it is referenced.
    pub location: Location,
}

/// The set of documents a reference search is restricted to.
#[derive(Debug, Clone, Default)]
pub struct SearchScope {
    documents: HashSet<FileId>,
}

impl SearchScope {
    pub fn new(documents: impl IntoIterator<Item = FileId>) -> Self {
        Self {
            documents: documents.into_iter().collect(),
        }
    }

    pub fn contains(&self, file: &FileId) -> bool {
        self.documents.contains(file)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// A binary module loaded from a packaged library artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
    /// Location of the artifact.
    pub path: String,
    /// Module name, normally the package name.
    pub name: String,
    /// Version of the package the module ships in.
    pub version: Version,
    /// Namespace of the first exported symbol, if any.
    pub root_namespace: Option<String>,
    /// Exported symbol inventory.
    pub exported_symbols: Vec<SymbolId>,
}

impl LoadedModule {
    pub fn exported_symbol_count(&self) -> usize {
        self.exported_symbols.len()
    }

    pub fn has_exports(&self) -> bool {
        !self.exported_symbols.is_empty()
    }
}

/// A dependency as declared in a package specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredDependency {
    pub name: String,
    /// Version range as written (`1.0.0`, `[1.0.0, 2.0.0)`, ...).
    pub version: String,
}

impl DeclaredDependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Parses the declared range and returns its lower bound.
    pub fn min_version(&self) -> Result<Option<Version>, ParseError> {
        let range: VersionRange = self.version.parse()?;
        Ok(range.min)
    }
}

/// Dependencies declared for one target platform.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DependencyGroup {
    /// Target platform moniker; `None` means platform agnostic.
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<DeclaredDependency>,
}

impl DependencyGroup {
    pub fn is_agnostic(&self) -> bool {
        self.target
            .as_deref()
            .map_or(true, |t| TargetPlatform::new(t).is_agnostic())
    }
}

/// A package's own declared dependency specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpecification {
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub groups: Vec<DependencyGroup>,
}

impl PackageSpecification {
    /// Picks the first group compatible with `platform` or platform agnostic.
    pub fn compatible_group(&self, platform: &TargetPlatform) -> Option<&DependencyGroup> {
        self.groups.iter().find(|group| match &group.target {
            None => true,
            Some(target) => platform.is_compatible_with(&TargetPlatform::new(target.as_str())),
        })
    }
}

/// Errors reading a package specification.
#[derive(Debug, thiserror::Error)]
pub enum SpecificationError {
    #[error("Failed to read package specification {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed package specification {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors loading a binary module.
#[derive(Debug, thiserror::Error)]
pub enum ModuleLoadError {
    #[error("Module not found: {0}")]
    NotFound(String),

    #[error("Failed to read module {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Per-project fatal errors reported by a [`Workspace`].
#[derive(Debug, thiserror::Error)]
pub enum ProjectLoadError {
    #[error("Failed to load project {project}: {reason}")]
    LoadFailed { project: String, reason: String },

    #[error("Failed to compile project {project}: {reason}")]
    CompilationFailed { project: String, reason: String },
}

/// Source of package dependency specifications.
#[async_trait]
pub trait SpecificationSource: Send + Sync {
    /// Returns the specification of `name` at `version`, or `None` when the
    /// package is unknown to this source.
    async fn get_specification(
        &self,
        name: &str,
        version: &Version,
    ) -> Result<Option<PackageSpecification>, SpecificationError>;
}

/// Loads binary module metadata.
#[async_trait]
pub trait ModuleSource: Send + Sync {
    async fn load_module(&self, path: &str) -> Result<LoadedModule, ModuleLoadError>;
}

/// Semantic reference lookup over a compiled project.
#[async_trait]
pub trait ReferenceOracle: Send + Sync {
    /// Finds references to `symbol` within `scope`. An unused symbol yields
    /// an empty list.
    async fn find_references(&self, symbol: &SymbolId, scope: &SearchScope)
        -> Vec<SymbolReference>;
}

/// Metadata of a project under analysis.
#[derive(Debug, Clone, Default)]
pub struct ProjectMetadata {
    pub name: String,
    pub documents: Vec<FileId>,
    pub default_namespace: Option<String>,
    /// Default namespaces of same-solution projects this project references.
    pub referenced_namespaces: Vec<String>,
}

/// A project opened and compiled by a [`Workspace`].
#[derive(Clone)]
pub struct LoadedProject {
    pub metadata: ProjectMetadata,
    pub target_platform: TargetPlatform,
    pub explicit_references: Vec<PackageReference>,
    pub module_paths: Vec<String>,
    pub modules: Arc<dyn ModuleSource>,
    pub references: Arc<dyn ReferenceOracle>,
}

impl fmt::Debug for LoadedProject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedProject")
            .field("metadata", &self.metadata)
            .field("target_platform", &self.target_platform)
            .field("explicit_references", &self.explicit_references)
            .field("module_paths", &self.module_paths)
            .finish_non_exhaustive()
    }
}

/// A loaded solution: a set of named projects.
#[async_trait]
pub trait Workspace: Send + Sync {
    /// Project names in solution order.
    fn projects(&self) -> Vec<String>;

    async fn open_project(&self, name: &str) -> Result<LoadedProject, ProjectLoadError>;
}

/// Queries several sources in order and returns the first specification found.
///
/// A source that fails is skipped; its error surfaces only when no other
/// source knows the package.
#[derive(Clone, Default)]
pub struct SpecificationChain {
    sources: Vec<Arc<dyn SpecificationSource>>,
}

impl SpecificationChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: Arc<dyn SpecificationSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl SpecificationSource for SpecificationChain {
    async fn get_specification(
        &self,
        name: &str,
        version: &Version,
    ) -> Result<Option<PackageSpecification>, SpecificationError> {
        let mut first_error = None;
        for source in &self.sources {
            match source.get_specification(name, version).await {
                Ok(Some(spec)) => return Ok(Some(spec)),
                Ok(None) => {}
                Err(e) => {
                    debug!("Specification source failed for {}@{}: {}", name, version, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        // A failure is only reported when no later source had the package.
        match first_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}
