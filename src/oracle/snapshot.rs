//! Workspace host backed by a JSON snapshot.
//!
//! [`SnapshotWorkspace`] serves projects, modules and symbol references out
//! of a [`SolutionSnapshot`]. Specifications embedded in the snapshot are
//! served through [`InMemorySpecifications`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{
    layout, FileId, LoadedModule, LoadedProject, Location, ModuleLoadError, ModuleSource,
    PackageSpecification, ProjectLoadError, ProjectMetadata, ReferenceOracle, SearchScope,
    SpecificationError, SpecificationSource, SymbolId, SymbolReference, Workspace,
};
use crate::parser::snapshot::{self, ModuleSnapshot, ProjectStatus, SolutionSnapshot};
use crate::parser::types::{TargetPlatform, Version};
use crate::parser::ParseResult;

/// Specifications held in memory, keyed by lowercase name and version.
#[derive(Debug, Clone, Default)]
pub struct InMemorySpecifications {
    specs: HashMap<(String, Version), PackageSpecification>,
}

impl InMemorySpecifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a specification, replacing any previous one for the same package.
    pub fn insert(&mut self, spec: PackageSpecification) {
        self.specs
            .insert((spec.name.to_lowercase(), spec.version.clone()), spec);
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl FromIterator<PackageSpecification> for InMemorySpecifications {
    fn from_iter<I: IntoIterator<Item = PackageSpecification>>(iter: I) -> Self {
        let mut specs = Self::new();
        for spec in iter {
            specs.insert(spec);
        }
        specs
    }
}

#[async_trait]
impl SpecificationSource for InMemorySpecifications {
    async fn get_specification(
        &self,
        name: &str,
        version: &Version,
    ) -> Result<Option<PackageSpecification>, SpecificationError> {
        Ok(self
            .specs
            .get(&(name.to_lowercase(), version.clone()))
            .cloned())
    }
}

/// Modules of a snapshot, keyed by path.
struct SnapshotModules {
    modules: Arc<HashMap<String, ModuleSnapshot>>,
}

#[async_trait]
impl ModuleSource for SnapshotModules {
    async fn load_module(&self, path: &str) -> Result<LoadedModule, ModuleLoadError> {
        let module = self
            .modules
            .get(path)
            .ok_or_else(|| ModuleLoadError::NotFound(path.to_string()))?;

        let name = match &module.name {
            Some(name) => name.clone(),
            None => layout::name_from_path(path)?,
        };
        let version = match &module.version {
            Some(version) => version.clone(),
            None => layout::version_from_path(path)?,
        };

        let exported_symbols: Vec<SymbolId> = module
            .exported_symbols
            .iter()
            .map(|s| SymbolId::new(s.as_str()))
            .collect();
        // Global-namespace symbols carry no namespace; take the first one that does.
        let root_namespace = exported_symbols
            .iter()
            .find_map(|s| s.as_str().rsplit_once('.'))
            .map(|(ns, _)| ns.to_string());

        Ok(LoadedModule {
            path: path.to_string(),
            name,
            version,
            root_namespace,
            exported_symbols,
        })
    }
}

/// Symbol references recorded for one project.
struct SnapshotReferences {
    by_symbol: HashMap<SymbolId, Vec<Location>>,
}

#[async_trait]
impl ReferenceOracle for SnapshotReferences {
    async fn find_references(
        &self,
        symbol: &SymbolId,
        scope: &SearchScope,
    ) -> Vec<SymbolReference> {
        self.by_symbol
            .get(symbol)
            .map(|locations| {
                locations
                    .iter()
                    .filter(|loc| scope.contains(&loc.file))
                    .map(|loc| SymbolReference {
                        symbol: symbol.clone(),
                        location: loc.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A [`Workspace`] serving a parsed [`SolutionSnapshot`].
pub struct SnapshotWorkspace {
    snapshot: SolutionSnapshot,
    modules: Arc<HashMap<String, ModuleSnapshot>>,
    specifications: InMemorySpecifications,
}

impl SnapshotWorkspace {
    pub fn new(snapshot: SolutionSnapshot) -> Self {
        let modules = snapshot
            .modules
            .iter()
            .map(|m| (m.path.clone(), m.clone()))
            .collect();
        let specifications = snapshot.specifications.iter().cloned().collect();

        Self {
            snapshot,
            modules: Arc::new(modules),
            specifications,
        }
    }

    /// Reads and validates a snapshot file.
    pub fn load(path: &Path) -> ParseResult<Self> {
        let snapshot = snapshot::parse_file(path)?;
        snapshot::validate(&snapshot)?;
        debug!(
            "Loaded snapshot {} with {} projects",
            snapshot.display_name(),
            snapshot.projects.len()
        );
        Ok(Self::new(snapshot))
    }

    pub fn name(&self) -> &str {
        self.snapshot.display_name()
    }

    /// Specifications embedded in the snapshot.
    pub fn specifications(&self) -> &InMemorySpecifications {
        &self.specifications
    }
}

#[async_trait]
impl Workspace for SnapshotWorkspace {
    fn projects(&self) -> Vec<String> {
        self.snapshot
            .projects
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }

    async fn open_project(&self, name: &str) -> Result<LoadedProject, ProjectLoadError> {
        let project = self
            .snapshot
            .project(name)
            .ok_or_else(|| ProjectLoadError::LoadFailed {
                project: name.to_string(),
                reason: "project is not part of the solution".to_string(),
            })?;

        match project.status {
            ProjectStatus::Ok => {}
            ProjectStatus::LoadFailed => {
                return Err(ProjectLoadError::LoadFailed {
                    project: project.name.clone(),
                    reason: "project file could not be loaded".to_string(),
                })
            }
            ProjectStatus::CompilationFailed => {
                return Err(ProjectLoadError::CompilationFailed {
                    project: project.name.clone(),
                    reason: "project did not compile".to_string(),
                })
            }
        }

        let referenced_namespaces = project
            .project_references
            .iter()
            .filter_map(|r| self.snapshot.project(r))
            .map(|p| p.default_namespace.clone().unwrap_or_else(|| p.name.clone()))
            .collect();

        let mut by_symbol: HashMap<SymbolId, Vec<Location>> = HashMap::new();
        for r in &project.references {
            by_symbol
                .entry(SymbolId::new(r.symbol.as_str()))
                .or_default()
                .push(Location::new(r.file.as_str(), r.line, r.column));
        }

        Ok(LoadedProject {
            metadata: ProjectMetadata {
                name: project.name.clone(),
                documents: project
                    .documents
                    .iter()
                    .map(|d| FileId::new(d.as_str()))
                    .collect(),
                default_namespace: project.default_namespace.clone(),
                referenced_namespaces,
            },
            target_platform: TargetPlatform::new(project.target_platform.as_str()),
            explicit_references: project.packages.clone(),
            module_paths: project.modules.clone(),
            modules: Arc::new(SnapshotModules {
                modules: Arc::clone(&self.modules),
            }),
            references: Arc::new(SnapshotReferences { by_symbol }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "projects": [
            {
                "name": "App",
                "default_namespace": "Contoso.App",
                "target_platform": "net8.0",
                "project_references": ["Core"],
                "documents": ["Program.cs", "Util.cs"],
                "packages": [{"name": "A", "version": "1.2.3"}],
                "modules": ["/cache/a/1.2.3/lib/net8.0/A.dll", "/cache/missing/1.0.0/lib/net8.0/M.dll"],
                "references": [
                    {"symbol": "A.Widget", "file": "Program.cs", "line": 3, "column": 5},
                    {"symbol": "A.Widget", "file": "Generated.cs", "line": 1, "column": 1}
                ]
            },
            {"name": "Core", "default_namespace": "Contoso.Core", "target_platform": "net8.0"},
            {"name": "Broken", "status": "compilation_failed", "target_platform": "net8.0"}
        ],
        "modules": [
            {"path": "/cache/a/1.2.3/lib/net8.0/A.dll", "exported_symbols": ["A.Widget", "A.Gadget"]},
            {"path": "/cache/glob/2.0.0/lib/net8.0/Glob.dll", "exported_symbols": ["Startup", "Glob.Core.Thing"]}
        ],
        "specifications": [{"name": "A", "version": "1.2.3", "groups": []}]
    }"#;

    fn workspace() -> SnapshotWorkspace {
        SnapshotWorkspace::new(snapshot::parse_str(SNAPSHOT).unwrap())
    }

    #[tokio::test]
    async fn test_open_project_metadata() {
        let ws = workspace();
        assert_eq!(ws.projects(), vec!["App", "Core", "Broken"]);

        let project = ws.open_project("App").await.unwrap();
        assert_eq!(project.metadata.documents.len(), 2);
        assert_eq!(project.metadata.referenced_namespaces, vec!["Contoso.Core"]);
        assert_eq!(project.target_platform.moniker(), "net8.0");
        assert_eq!(project.explicit_references[0].name, "A");
    }

    #[tokio::test]
    async fn test_open_failed_project() {
        let ws = workspace();
        let err = ws.open_project("Broken").await.unwrap_err();
        assert!(matches!(err, ProjectLoadError::CompilationFailed { .. }));

        let err = ws.open_project("Nope").await.unwrap_err();
        assert!(matches!(err, ProjectLoadError::LoadFailed { .. }));
    }

    #[tokio::test]
    async fn test_load_module_infers_name_and_version() {
        let ws = workspace();
        let project = ws.open_project("App").await.unwrap();

        let module = project
            .modules
            .load_module("/cache/a/1.2.3/lib/net8.0/A.dll")
            .await
            .unwrap();
        assert_eq!(module.name, "A");
        assert_eq!(module.version, Version::new(1, 2, 3));
        assert_eq!(module.root_namespace.as_deref(), Some("A"));
        assert_eq!(module.exported_symbol_count(), 2);

        let missing = project
            .modules
            .load_module("/cache/missing/1.0.0/lib/net8.0/M.dll")
            .await;
        assert!(matches!(missing, Err(ModuleLoadError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_root_namespace_skips_global_symbols() {
        let ws = workspace();
        let project = ws.open_project("App").await.unwrap();

        let module = project
            .modules
            .load_module("/cache/glob/2.0.0/lib/net8.0/Glob.dll")
            .await
            .unwrap();
        assert_eq!(module.root_namespace.as_deref(), Some("Glob.Core"));
        assert_eq!(module.version, "2.0.0.0".parse::<Version>().unwrap());
    }

    #[tokio::test]
    async fn test_find_references_respects_scope() {
        let ws = workspace();
        let project = ws.open_project("App").await.unwrap();
        let scope = SearchScope::new(project.metadata.documents.clone());

        let refs = project
            .references
            .find_references(&SymbolId::new("A.Widget"), &scope)
            .await;
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].location.file.as_str(), "Program.cs");

        let unused = project
            .references
            .find_references(&SymbolId::new("A.Gadget"), &scope)
            .await;
        assert!(unused.is_empty());
    }

    #[tokio::test]
    async fn test_embedded_specifications() {
        let ws = workspace();
        let spec = ws
            .specifications()
            .get_specification("a", &Version::new(1, 2, 3))
            .await
            .unwrap();
        assert!(spec.is_some());

        let other = ws
            .specifications()
            .get_specification("A", &Version::new(9, 9, 9))
            .await
            .unwrap();
        assert!(other.is_none());
    }
}
