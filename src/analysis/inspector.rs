//! Project and solution analysis drivers.
//!
//! [`Inspector::analyze_project`] runs the whole pipeline for one project:
//! open, resolve the dependency graph, load and bind modules, query symbol
//! references, compute metrics. [`Inspector::analyze_solution`] runs it for
//! every project of a workspace on a bounded pool of tasks and streams the
//! results as they complete.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::binder::{bind, BoundPackage};
use super::registry::UsageRegistry;
use crate::config::AnalysisParameters;
use crate::exclusion::ExclusionPolicy;
use crate::graph::{DependencyResolver, PackageGraph, PackageKey, ResolveError};
use crate::metrics::{create_metrics, Metric, MetricContext, MetricSet};
use crate::oracle::{
    LoadedModule, LoadedProject, ProjectLoadError, SearchScope, SpecificationSource, Workspace,
};
use crate::report::{PackageResult, ProjectResult, ProjectState};

/// Errors that stop a project from producing a result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("Analysis was cancelled")]
    Cancelled,
}

/// Drives package usage analysis.
pub struct Inspector {
    specifications: Arc<dyn SpecificationSource>,
    metrics: Arc<Vec<Box<dyn Metric>>>,
    parameters: AnalysisParameters,
}

impl Inspector {
    /// Creates an inspector running the metrics selected in `parameters`.
    pub fn new(specifications: Arc<dyn SpecificationSource>, parameters: AnalysisParameters) -> Self {
        let metrics = create_metrics(parameters.metrics());
        Self {
            specifications,
            metrics: Arc::new(metrics),
            parameters,
        }
    }

    /// Replaces the metric list.
    pub fn with_metrics(mut self, metrics: Vec<Box<dyn Metric>>) -> Self {
        self.metrics = Arc::new(metrics);
        self
    }

    /// Analyzes one project of `workspace`.
    ///
    /// Load, compilation and graph depth failures are reported through the
    /// result's [`ProjectState`]. Only cancellation is an error.
    pub async fn analyze_project(
        &self,
        workspace: &dyn Workspace,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<ProjectResult, AnalysisError> {
        let started = Instant::now();

        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        if self.parameters.is_project_excluded(name) {
            info!("Skipping excluded project {}", name);
            return Ok(ProjectResult::ignored(name));
        }

        info!("Analyzing project {}", name);
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AnalysisError::Cancelled),
            opened = workspace.open_project(name) => opened,
        };
        let project = match opened {
            Ok(project) => project,
            Err(e) => {
                let state = match e {
                    ProjectLoadError::LoadFailed { .. } => ProjectState::LoadFailed,
                    ProjectLoadError::CompilationFailed { .. } => ProjectState::CompilationFailed,
                };
                warn!("{}", e);
                return Ok(ProjectResult::failed(name, state, e.to_string(), started.elapsed()));
            }
        };

        let exclusions =
            ExclusionPolicy::for_project(self.parameters.excluded_namespaces(), &project.metadata);

        let mut graph = PackageGraph::new();
        let resolver = DependencyResolver::new(
            self.specifications.as_ref(),
            &exclusions,
            &project.target_platform,
            cancel,
        );
        match resolver.resolve(&mut graph, &project.explicit_references).await {
            Ok(roots) => debug!(
                "Project {}: {} explicit packages, {} packages in graph",
                name,
                roots.len(),
                graph.node_count()
            ),
            Err(ResolveError::Cancelled) => return Err(AnalysisError::Cancelled),
            Err(e) => {
                warn!("Project {}: {}", name, e);
                return Ok(ProjectResult::failed(
                    name,
                    ProjectState::LoadFailed,
                    e.to_string(),
                    started.elapsed(),
                ));
            }
        }

        let modules = load_modules(&project, cancel).await?;
        let bound = bind(modules, &graph, &exclusions);
        debug!("Project {}: bound {} packages", name, bound.len());

        let registry = collect_references(&project, &bound, cancel).await?;
        debug!(
            "Project {}: recorded references into {} packages",
            name,
            registry.package_count()
        );
        for package in &bound {
            debug!(
                "{}: {} of {} symbols used, {} references",
                package.key(),
                registry.used_symbol_count(package.key()),
                package.module.exported_symbol_count(),
                registry.reference_count(package.key())
            );
        }

        let mut results: Vec<PackageResult> = Vec::with_capacity(graph.node_count());
        let mut measured: HashMap<PackageKey, MetricSet> = HashMap::new();
        for package in &bound {
            let ctx = MetricContext {
                project: &project.metadata,
                package,
                registry: &registry,
                graph: &graph,
            };
            measured.insert(package.key().clone(), MetricSet::compute(&self.metrics, &ctx));
        }

        // Graph packages first (in resolution order), then unattributed ones.
        for node in graph.all_nodes() {
            let metrics = measured.remove(&node.key).unwrap_or_default();
            results.push(PackageResult::new(node.key.clone(), node.kind, metrics));
        }
        for package in &bound {
            if let Some(metrics) = measured.remove(package.key()) {
                results.push(PackageResult::new(package.key().clone(), package.kind(), metrics));
            }
        }

        let elapsed = started.elapsed();
        info!(
            "Analyzed project {} ({} packages) in {:.2?}",
            name,
            results.len(),
            elapsed
        );
        Ok(ProjectResult::ok(name, results, graph, elapsed))
    }

    /// Analyzes every project of `workspace`.
    ///
    /// At most [`AnalysisParameters::effective_concurrency`] projects run at
    /// once. Results arrive in completion order; cancelled projects produce
    /// no result. The stream ends once every project has finished.
    pub fn analyze_solution(
        self: Arc<Self>,
        workspace: Arc<dyn Workspace>,
        cancel: CancellationToken,
    ) -> ProjectResults {
        let projects = workspace.projects();
        let concurrency = self.parameters.effective_concurrency();
        let (tx, rx) = mpsc::channel(projects.len().max(1));

        info!(
            "Analyzing {} projects with up to {} at a time",
            projects.len(),
            concurrency
        );

        let driver = tokio::spawn(async move {
            let semaphore = Arc::new(Semaphore::new(concurrency));
            let mut workers = JoinSet::new();

            for name in projects {
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };

                let inspector = Arc::clone(&self);
                let workspace = Arc::clone(&workspace);
                let cancel = cancel.clone();
                let tx = tx.clone();

                workers.spawn(async move {
                    let _permit = permit;
                    match inspector
                        .analyze_project(workspace.as_ref(), &name, &cancel)
                        .await
                    {
                        Ok(result) => {
                            if tx.send(result).await.is_err() {
                                debug!("Result of project {} was not consumed", name);
                            }
                        }
                        Err(AnalysisError::Cancelled) => {
                            debug!("Analysis of project {} was cancelled", name);
                        }
                    }
                });
            }

            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    error!("Project analysis task failed: {}", e);
                }
            }
        });

        ProjectResults { rx, driver }
    }
}

/// Loads the project's modules one at a time, skipping failures.
async fn load_modules(
    project: &LoadedProject,
    cancel: &CancellationToken,
) -> Result<Vec<LoadedModule>, AnalysisError> {
    let mut modules = Vec::with_capacity(project.module_paths.len());

    for path in &project.module_paths {
        let loaded = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AnalysisError::Cancelled),
            loaded = project.modules.load_module(path) => loaded,
        };
        match loaded {
            Ok(module) => modules.push(module),
            Err(e) => debug!("Skipping module {}: {}", path, e),
        }
    }

    Ok(modules)
}

/// Queries references to every exported symbol of every bound package.
async fn collect_references(
    project: &LoadedProject,
    bound: &[BoundPackage],
    cancel: &CancellationToken,
) -> Result<UsageRegistry, AnalysisError> {
    let mut registry = UsageRegistry::new();
    let scope = Arc::new(SearchScope::new(project.metadata.documents.iter().cloned()));
    let mut queries = JoinSet::new();

    for package in bound {
        registry.add_package(package.key());
        for symbol in &package.module.exported_symbols {
            let oracle = Arc::clone(&project.references);
            let scope = Arc::clone(&scope);
            let key = package.key().clone();
            let symbol = symbol.clone();
            queries.spawn(async move {
                let references = oracle.find_references(&symbol, &scope).await;
                (key, references)
            });
        }
    }

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                queries.abort_all();
                return Err(AnalysisError::Cancelled);
            }
            next = queries.join_next() => match next {
                Some(Ok((key, references))) => {
                    registry.add_symbol_references(&key, references);
                }
                Some(Err(e)) => warn!("Reference query failed: {}", e),
                None => break,
            },
        }
    }

    Ok(registry)
}

/// Stream of project results produced by [`Inspector::analyze_solution`].
///
/// Dropping the stream stops the remaining analysis.
pub struct ProjectResults {
    rx: mpsc::Receiver<ProjectResult>,
    driver: JoinHandle<()>,
}

impl ProjectResults {
    /// Waits for the next completed project; `None` once all are done.
    pub async fn next(&mut self) -> Option<ProjectResult> {
        self.rx.recv().await
    }

    /// Drains the stream.
    pub async fn collect_all(mut self) -> Vec<ProjectResult> {
        let mut results = Vec::new();
        while let Some(result) = self.next().await {
            results.push(result);
        }
        results
    }
}

impl Drop for ProjectResults {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{MetricName, MetricResult};
    use crate::oracle::{InMemorySpecifications, PackageSpecification, SnapshotWorkspace};
    use crate::parser::snapshot::SolutionSnapshot;
    use crate::report::{HasMetricsFilter, NoopFilter};
    use serde_json::json;

    fn module_path(name: &str, version: &str) -> String {
        format!("/cache/{}/{}/lib/net8.0/{}.dll", name.to_lowercase(), version, name)
    }

    /// P declares A 1.2.3, which depends on B 4.5.6. A exports 10 symbols,
    /// 3 of them referenced across 4 of the project's 20 documents.
    fn solution() -> SolutionSnapshot {
        let documents: Vec<String> = (0..20).map(|i| format!("src/F{}.cs", i)).collect();
        let a_symbols: Vec<String> = (0..10).map(|i| format!("A.Type{}", i)).collect();
        let b_symbols: Vec<String> = (0..5).map(|i| format!("B.Type{}", i)).collect();

        serde_json::from_value(json!({
            "name": "Sample",
            "projects": [
                {
                    "name": "P",
                    "default_namespace": "Contoso.P",
                    "target_platform": "net8.0",
                    "documents": documents,
                    "packages": [{"name": "A", "version": "1.2.3"}],
                    "modules": [
                        module_path("A", "1.2.3"),
                        module_path("B", "4.5.6"),
                        module_path("Broken", "1.0.0")
                    ],
                    "references": [
                        {"symbol": "A.Type0", "file": "src/F0.cs", "line": 1},
                        {"symbol": "A.Type0", "file": "src/F1.cs", "line": 8},
                        {"symbol": "A.Type1", "file": "src/F2.cs", "line": 3},
                        {"symbol": "A.Type2", "file": "src/F3.cs", "line": 5},
                        {"symbol": "A.Type2", "file": "src/F3.cs", "line": 9},
                        {"symbol": "A.Type2", "file": "obj/Generated.cs", "line": 1}
                    ]
                },
                {
                    "name": "Deep",
                    "target_platform": "net8.0",
                    "packages": [{"name": "L0", "version": "1.0.0"}]
                },
                {"name": "Broken", "status": "compilation_failed", "target_platform": "net8.0"},
                {"name": "P.Tests", "target_platform": "net8.0"}
            ],
            "modules": [
                {"path": module_path("A", "1.2.3"), "exported_symbols": a_symbols},
                {"path": module_path("B", "4.5.6"), "exported_symbols": b_symbols}
            ],
            "specifications": [
                {"name": "A", "version": "1.2.3", "groups": [
                    {"target": "net8.0", "dependencies": [{"name": "B", "version": "4.5.6"}]}
                ]}
            ]
        }))
        .unwrap()
    }

    /// `L0 -> L1 -> ... -> L11`, one level deeper than allowed.
    fn deep_chain() -> Vec<PackageSpecification> {
        (0..11)
            .map(|i| {
                serde_json::from_value(json!({
                    "name": format!("L{}", i),
                    "version": "1.0.0",
                    "groups": [{"dependencies": [{"name": format!("L{}", i + 1), "version": "1.0.0"}]}]
                }))
                .unwrap()
            })
            .collect()
    }

    fn inspector(workspace: &SnapshotWorkspace, parameters: AnalysisParameters) -> Inspector {
        let mut specs = workspace.specifications().clone();
        for spec in deep_chain() {
            specs.insert(spec);
        }
        Inspector::new(Arc::new(specs), parameters)
    }

    fn key(name: &str, version: &str) -> PackageKey {
        PackageKey::new(name, version.parse().unwrap())
    }

    #[tokio::test]
    async fn test_end_to_end_metrics() {
        let workspace = SnapshotWorkspace::new(solution());
        let inspector = inspector(&workspace, AnalysisParameters::new());

        let result = inspector
            .analyze_project(&workspace, "P", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.state, ProjectState::Ok);
        assert_eq!(result.packages.len(), 2);

        let a = result.package(&key("A", "1.2.3")).unwrap();
        assert_eq!(a.metrics.get(MetricName::Usage), Some(&MetricResult::Usage(30.0)));
        assert_eq!(
            a.metrics.get(MetricName::Scattering),
            Some(&MetricResult::Scattering(20.0))
        );
        assert_eq!(
            a.metrics.get(MetricName::TransitiveCount),
            Some(&MetricResult::TransitiveCount(1))
        );

        let b = result.package(&key("B", "4.5.6")).unwrap();
        assert!(b.metrics.is_empty());

        let filter = HasMetricsFilter::new(&result);
        let shown: Vec<&str> = result.rows(&filter).iter().map(|r| r.key.name.as_str()).collect();
        assert_eq!(shown, vec!["A"]);

        let all: Vec<&str> = result.rows(&NoopFilter).iter().map(|r| r.key.name.as_str()).collect();
        assert_eq!(all, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_metric_selection() {
        let workspace = SnapshotWorkspace::new(solution());
        let parameters = AnalysisParameters::new().with_metrics(vec![MetricName::Usage]);
        let inspector = inspector(&workspace, parameters);

        let result = inspector
            .analyze_project(&workspace, "P", &CancellationToken::new())
            .await
            .unwrap();
        let a = result.package(&key("A", "1.2.3")).unwrap();
        assert_eq!(a.metrics.len(), 1);
    }

    #[tokio::test]
    async fn test_unbound_graph_package_reported_without_metrics() {
        let mut snapshot = solution();
        snapshot.modules.retain(|m| !m.path.contains("/b/"));
        let workspace = SnapshotWorkspace::new(snapshot);
        let inspector = inspector(&workspace, AnalysisParameters::new());

        let result = inspector
            .analyze_project(&workspace, "P", &CancellationToken::new())
            .await
            .unwrap();

        let b = result.package(&key("B", "4.5.6")).unwrap();
        assert!(b.metrics.is_empty());
        assert_eq!(b.kind, crate::graph::ReferenceKind::Transient);
    }

    #[tokio::test]
    async fn test_unattributed_module() {
        let mut snapshot = solution();
        snapshot.specifications.clear();
        snapshot.projects[0].packages.clear();
        let workspace = SnapshotWorkspace::new(snapshot);
        let inspector = Inspector::new(
            Arc::new(InMemorySpecifications::new()),
            AnalysisParameters::new(),
        );

        let result = inspector
            .analyze_project(&workspace, "P", &CancellationToken::new())
            .await
            .unwrap();

        let a = result.package(&key("A", "1.2.3")).unwrap();
        assert_eq!(a.kind, crate::graph::ReferenceKind::Unattributed);
        assert_eq!(a.metrics.get(MetricName::Usage), Some(&MetricResult::Usage(30.0)));
        assert!(a.metrics.get(MetricName::TransitiveCount).is_none());

        let filter = HasMetricsFilter::new(&result);
        assert_eq!(result.rows(&filter).len(), 1);
    }

    #[tokio::test]
    async fn test_depth_exceeded_is_load_failure() {
        let workspace = SnapshotWorkspace::new(solution());
        let inspector = inspector(&workspace, AnalysisParameters::new());

        let result = inspector
            .analyze_project(&workspace, "Deep", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.state, ProjectState::LoadFailed);
        assert!(result.message.unwrap().contains("L0"));
    }

    #[tokio::test]
    async fn test_compilation_failure_and_ignored() {
        let workspace = SnapshotWorkspace::new(solution());
        let parameters = AnalysisParameters::new().with_excluded_projects(vec!["p.tests".into()]);
        let inspector = inspector(&workspace, parameters);
        let cancel = CancellationToken::new();

        let broken = inspector.analyze_project(&workspace, "Broken", &cancel).await.unwrap();
        assert_eq!(broken.state, ProjectState::CompilationFailed);
        assert!(broken.message.is_some());

        let ignored = inspector.analyze_project(&workspace, "P.Tests", &cancel).await.unwrap();
        assert_eq!(ignored.state, ProjectState::Ignored);
    }

    #[tokio::test]
    async fn test_cancelled_project() {
        let workspace = SnapshotWorkspace::new(solution());
        let inspector = inspector(&workspace, AnalysisParameters::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = inspector.analyze_project(&workspace, "P", &cancel).await;
        assert_eq!(result.unwrap_err(), AnalysisError::Cancelled);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_analyze_solution_streams_every_project() {
        let workspace = SnapshotWorkspace::new(solution());
        let parameters = AnalysisParameters::new().with_max_concurrency(2).unwrap();
        let inspector = Arc::new(inspector(&workspace, parameters));

        let results = inspector
            .analyze_solution(Arc::new(workspace), CancellationToken::new())
            .collect_all()
            .await;

        let mut states: Vec<(String, ProjectState)> =
            results.iter().map(|r| (r.name.clone(), r.state)).collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            states,
            vec![
                ("Broken".to_string(), ProjectState::CompilationFailed),
                ("Deep".to_string(), ProjectState::LoadFailed),
                ("P".to_string(), ProjectState::Ok),
                ("P.Tests".to_string(), ProjectState::Ok),
            ]
        );
    }

    #[tokio::test]
    async fn test_analyze_solution_cancelled_yields_nothing() {
        let workspace = SnapshotWorkspace::new(solution());
        let parameters = AnalysisParameters::new().with_max_concurrency(1).unwrap();
        let inspector = Arc::new(inspector(&workspace, parameters));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut stream = inspector.analyze_solution(Arc::new(workspace), cancel);
        assert!(stream.next().await.is_none());
    }
}
