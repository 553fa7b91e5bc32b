//! Dependency graph resolution.
//!
//! Builds a project's [`PackageGraph`] from its explicit package
//! declarations by recursively reading each package's own dependency
//! specification for the project's target platform.

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::package_graph::{PackageGraph, PackageKey, PackageNode, ReferenceKind};
use crate::exclusion::ExclusionPolicy;
use crate::oracle::SpecificationSource;
use crate::parser::types::{PackageReference, TargetPlatform};

/// Deepest dependency level resolved below an explicit package.
pub const MAX_DEPENDENCY_DEPTH: usize = 10;

/// Errors that abort graph resolution for a project.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("The dependency graph of package {package} exceeds the maximum depth of {max}")]
    DepthExceeded { package: String, max: usize },

    #[error("Dependency resolution was cancelled")]
    Cancelled,
}

pub type ResolveResult<T> = Result<T, ResolveError>;

type SubgraphFuture<'f> = Pin<Box<dyn Future<Output = ResolveResult<Vec<PackageKey>>> + Send + 'f>>;

/// Resolves the dependency graph of one project.
pub struct DependencyResolver<'a> {
    specifications: &'a dyn SpecificationSource,
    exclusions: &'a ExclusionPolicy,
    platform: &'a TargetPlatform,
    cancel: &'a CancellationToken,
    max_depth: usize,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(
        specifications: &'a dyn SpecificationSource,
        exclusions: &'a ExclusionPolicy,
        platform: &'a TargetPlatform,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            specifications,
            exclusions,
            platform,
            cancel,
            max_depth: MAX_DEPENDENCY_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Resolves `explicit` into `graph` and returns the explicit roots.
    ///
    /// An explicit reference that was already reached as a dependency of an
    /// earlier explicit package is promoted to explicit and not resolved a
    /// second time. Excluded references are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::DepthExceeded`] naming the explicit package
    /// whose subgraph is too deep, or [`ResolveError::Cancelled`].
    pub async fn resolve(
        &self,
        graph: &mut PackageGraph,
        explicit: &[PackageReference],
    ) -> ResolveResult<Vec<PackageKey>> {
        let mut roots: Vec<PackageKey> = Vec::new();

        for reference in explicit {
            if self.exclusions.is_excluded(&reference.name) {
                debug!("Skipping excluded package {}", reference);
                continue;
            }

            let key = PackageKey::from(reference);
            if graph.contains(&key) {
                graph.promote_to_explicit(&key);
            } else {
                graph.add(PackageNode::new(key.clone(), ReferenceKind::Explicit));
                let children = self
                    .resolve_subgraph(graph, key.clone(), &reference.name, 0)
                    .await?;
                for child in &children {
                    graph.add_parent(child, &key);
                }
            }

            if !roots.contains(&key) {
                roots.push(key);
            }
        }

        debug!(
            "Resolved {} packages from {} explicit references",
            graph.node_count(),
            roots.len()
        );
        Ok(roots)
    }

    /// Resolves the dependencies of `key` and returns its direct children.
    ///
    /// Dependencies are inserted after their own subgraph is resolved.
    fn resolve_subgraph<'f>(
        &'f self,
        graph: &'f mut PackageGraph,
        key: PackageKey,
        root: &'f str,
        depth: usize,
    ) -> SubgraphFuture<'f> {
        Box::pin(async move {
            if depth > self.max_depth {
                return Err(ResolveError::DepthExceeded {
                    package: root.to_string(),
                    max: self.max_depth,
                });
            }
            if self.cancel.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }

            let spec = match self
                .specifications
                .get_specification(&key.name, &key.version)
                .await
            {
                Ok(Some(spec)) => spec,
                Ok(None) => {
                    debug!("Unable to find package specification for {}", key);
                    return Ok(Vec::new());
                }
                Err(e) => {
                    debug!("Unable to read package specification for {}: {}", key, e);
                    return Ok(Vec::new());
                }
            };

            let Some(group) = spec.compatible_group(self.platform) else {
                debug!(
                    "Package {} declares no dependencies for {}",
                    key, self.platform
                );
                return Ok(Vec::new());
            };

            let mut children: Vec<PackageKey> = Vec::new();
            for dependency in &group.dependencies {
                if self.exclusions.is_excluded(&dependency.name) {
                    continue;
                }

                let version = match dependency.min_version() {
                    Ok(Some(version)) => version,
                    Ok(None) => {
                        warn!(
                            "Dependency {} of {} has no minimum version ({}), skipping",
                            dependency.name, key, dependency.version
                        );
                        continue;
                    }
                    Err(e) => {
                        warn!("Dependency {} of {}: {}", dependency.name, key, e);
                        continue;
                    }
                };

                let child = PackageKey::new(dependency.name.clone(), version);
                if !graph.contains(&child) {
                    let grandchildren = self
                        .resolve_subgraph(&mut *graph, child.clone(), root, depth + 1)
                        .await?;
                    graph.add(PackageNode::new(child.clone(), ReferenceKind::Transient));
                    for grandchild in &grandchildren {
                        graph.add_parent(grandchild, &child);
                    }
                }

                if !children.contains(&child) {
                    children.push(child);
                }
            }

            Ok(children)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{DeclaredDependency, DependencyGroup, InMemorySpecifications, PackageSpecification};
    use crate::parser::types::Version;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    fn spec(name: &str, version: &str, target: Option<&str>, deps: &[(&str, &str)]) -> PackageSpecification {
        PackageSpecification {
            name: name.into(),
            version: v(version),
            groups: vec![DependencyGroup {
                target: target.map(str::to_string),
                dependencies: deps
                    .iter()
                    .map(|(n, r)| DeclaredDependency::new(*n, *r))
                    .collect(),
            }],
        }
    }

    fn reference(name: &str, version: &str) -> PackageReference {
        PackageReference::new(name, v(version))
    }

    async fn resolve_with(
        specs: &InMemorySpecifications,
        exclusions: &ExclusionPolicy,
        explicit: &[PackageReference],
    ) -> (PackageGraph, ResolveResult<Vec<PackageKey>>) {
        let platform = TargetPlatform::new("net8.0");
        let cancel = CancellationToken::new();
        let resolver = DependencyResolver::new(specs, exclusions, &platform, &cancel);
        let mut graph = PackageGraph::new();
        let result = resolver.resolve(&mut graph, explicit).await;
        (graph, result)
    }

    fn no_exclusions() -> ExclusionPolicy {
        ExclusionPolicy::new(Vec::<String>::new())
    }

    /// `P0 -> P1 -> ... -> Pn`, with `Pn` a leaf.
    fn chain(n: usize) -> InMemorySpecifications {
        (0..n)
            .map(|i| {
                let next = format!("P{}", i + 1);
                spec(&format!("P{}", i), "1.0.0", None, &[(next.as_str(), "1.0.0")])
            })
            .collect()
    }

    #[tokio::test]
    async fn test_resolve_simple_tree() {
        let specs: InMemorySpecifications =
            [spec("A", "1.2.3", Some("net8.0"), &[("B", "4.5.6")])].into_iter().collect();

        let (graph, result) =
            resolve_with(&specs, &no_exclusions(), &[reference("A", "1.2.3")]).await;
        let roots = result.unwrap();

        assert_eq!(roots, vec![PackageKey::new("A", v("1.2.3"))]);
        assert_eq!(graph.node_count(), 2);

        let b = graph.try_get("B", &v("4.5.6")).unwrap();
        assert_eq!(b.kind, ReferenceKind::Transient);
        assert_eq!(graph.parents(&b.key)[0].name(), "A");
    }

    #[tokio::test]
    async fn test_shared_transient_is_deduplicated() {
        let specs: InMemorySpecifications = [
            spec("A", "1.0.0", None, &[("C", "2.0.0")]),
            spec("B", "1.0.0", None, &[("c", "[2.0.0, 3.0.0)")]),
        ]
        .into_iter()
        .collect();

        let (graph, result) = resolve_with(
            &specs,
            &no_exclusions(),
            &[reference("A", "1.0.0"), reference("B", "1.0.0")],
        )
        .await;
        result.unwrap();

        assert_eq!(graph.node_count(), 3);
        let c = PackageKey::new("C", v("2.0.0"));
        let parents: Vec<&str> = graph.parents(&c).iter().map(|n| n.name()).collect();
        assert_eq!(parents, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_four_part_zero_revision_shares_node() {
        let specs: InMemorySpecifications = [
            spec("A", "1.0.0", None, &[("C", "1.0.0")]),
            spec("B", "1.0.0", None, &[("C", "[1.0.0.0, )")]),
        ]
        .into_iter()
        .collect();

        let (graph, result) = resolve_with(
            &specs,
            &no_exclusions(),
            &[reference("A", "1.0.0"), reference("B", "1.0.0")],
        )
        .await;
        result.unwrap();

        assert_eq!(graph.node_count(), 3);
        let c = graph.try_get("C", &v("1.0.0.0")).unwrap();
        let parents: Vec<&str> = graph.parents(&c.key).iter().map(|n| n.name()).collect();
        assert_eq!(parents, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_depth_guard_allows_ten_levels() {
        let specs = chain(10);
        let (graph, result) =
            resolve_with(&specs, &no_exclusions(), &[reference("P0", "1.0.0")]).await;

        assert!(result.is_ok());
        assert_eq!(graph.node_count(), 11);
    }

    #[tokio::test]
    async fn test_depth_guard_rejects_eleven_levels() {
        let specs = chain(11);
        let (_, result) =
            resolve_with(&specs, &no_exclusions(), &[reference("P0", "1.0.0")]).await;

        let err = result.unwrap_err();
        assert_eq!(
            err,
            ResolveError::DepthExceeded {
                package: "P0".into(),
                max: MAX_DEPENDENCY_DEPTH
            }
        );
        assert!(err.to_string().contains("P0"));
    }

    #[tokio::test]
    async fn test_custom_max_depth() {
        let specs = chain(3);
        let platform = TargetPlatform::new("net8.0");
        let cancel = CancellationToken::new();
        let exclusions = no_exclusions();
        let resolver =
            DependencyResolver::new(&specs, &exclusions, &platform, &cancel).with_max_depth(2);

        let mut graph = PackageGraph::new();
        let result = resolver.resolve(&mut graph, &[reference("P0", "1.0.0")]).await;
        assert!(matches!(result, Err(ResolveError::DepthExceeded { max: 2, .. })));
    }

    #[tokio::test]
    async fn test_missing_specification_is_leaf() {
        let specs = InMemorySpecifications::new();
        let (graph, result) =
            resolve_with(&specs, &no_exclusions(), &[reference("Lonely", "1.0.0")]).await;

        assert_eq!(result.unwrap().len(), 1);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[tokio::test]
    async fn test_incompatible_group_is_leaf() {
        let specs: InMemorySpecifications =
            [spec("A", "1.0.0", Some("net9.0"), &[("B", "1.0.0")])].into_iter().collect();

        let (graph, _) = resolve_with(&specs, &no_exclusions(), &[reference("A", "1.0.0")]).await;
        assert_eq!(graph.node_count(), 1);
    }

    #[tokio::test]
    async fn test_excluded_packages_skipped() {
        let specs: InMemorySpecifications = [spec(
            "A",
            "1.0.0",
            None,
            &[("System.Memory", "4.5.5"), ("Internal.Tools", "1.0.0"), ("B", "1.0.0")],
        )]
        .into_iter()
        .collect();
        let exclusions = ExclusionPolicy::new(["Internal."]);

        let (graph, result) = resolve_with(
            &specs,
            &exclusions,
            &[reference("A", "1.0.0"), reference("System.Text.Json", "8.0.0")],
        )
        .await;

        assert_eq!(result.unwrap().len(), 1);
        let names: Vec<&str> = graph.all_nodes().iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_range_without_minimum_skipped() {
        let specs: InMemorySpecifications =
            [spec("A", "1.0.0", None, &[("B", "(, 2.0.0)"), ("C", "not-a-range"), ("D", "1.0.0")])]
                .into_iter()
                .collect();

        let (graph, _) = resolve_with(&specs, &no_exclusions(), &[reference("A", "1.0.0")]).await;
        let children: Vec<&str> = graph
            .children(&PackageKey::new("A", v("1.0.0")))
            .iter()
            .map(|n| n.name())
            .collect();
        assert_eq!(children, vec!["D"]);
    }

    #[tokio::test]
    async fn test_explicit_already_reached_is_promoted() {
        let specs: InMemorySpecifications =
            [spec("A", "1.0.0", None, &[("B", "1.0.0")])].into_iter().collect();

        let (graph, result) = resolve_with(
            &specs,
            &no_exclusions(),
            &[reference("A", "1.0.0"), reference("B", "1.0.0")],
        )
        .await;

        assert_eq!(result.unwrap().len(), 2);
        let b = graph.try_get("B", &v("1.0.0")).unwrap();
        assert_eq!(b.kind, ReferenceKind::Explicit);
        assert_eq!(graph.parents(&b.key).len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_resolution() {
        let specs = chain(2);
        let platform = TargetPlatform::new("net8.0");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let exclusions = no_exclusions();
        let resolver = DependencyResolver::new(&specs, &exclusions, &platform, &cancel);

        let mut graph = PackageGraph::new();
        let result = resolver.resolve(&mut graph, &[reference("P0", "1.0.0")]).await;
        assert_eq!(result.unwrap_err(), ResolveError::Cancelled);
    }
}
