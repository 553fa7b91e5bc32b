//! Analysis results and their report layout.
//!
//! A [`ProjectResult`] carries the metric values of every package of one
//! project together with the project's dependency graph. [`ProjectResult::rows`]
//! flattens it into the top-down row order used by every exporter: explicit
//! packages by name, each followed by its dependencies, then unattributed
//! packages.

pub mod filter;

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::graph::{PackageGraph, PackageKey, ReferenceKind};
use crate::metrics::MetricSet;

pub use filter::{HasMetricsFilter, NoopFilter, ResultFilter};

/// Terminal state of a project's analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectState {
    Ok,
    Ignored,
    LoadFailed,
    CompilationFailed,
}

impl fmt::Display for ProjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProjectState::Ok => "ok",
            ProjectState::Ignored => "ignored",
            ProjectState::LoadFailed => "load failed",
            ProjectState::CompilationFailed => "compilation failed",
        };
        f.write_str(s)
    }
}

/// Metric values of one package.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageResult {
    pub key: PackageKey,
    pub kind: ReferenceKind,
    pub metrics: MetricSet,
}

impl PackageResult {
    pub fn new(key: PackageKey, kind: ReferenceKind, metrics: MetricSet) -> Self {
        Self { key, kind, metrics }
    }
}

/// Outcome of analyzing one project.
#[derive(Debug, Clone)]
pub struct ProjectResult {
    pub name: String,
    pub state: ProjectState,
    pub elapsed: Duration,
    pub packages: Vec<PackageResult>,
    pub graph: PackageGraph,
    /// Failure description for unsuccessful states.
    pub message: Option<String>,
}

impl ProjectResult {
    pub fn ok(
        name: impl Into<String>,
        packages: Vec<PackageResult>,
        graph: PackageGraph,
        elapsed: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            state: ProjectState::Ok,
            elapsed,
            packages,
            graph,
            message: None,
        }
    }

    pub fn ignored(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: ProjectState::Ignored,
            elapsed: Duration::ZERO,
            packages: Vec::new(),
            graph: PackageGraph::new(),
            message: None,
        }
    }

    pub fn failed(
        name: impl Into<String>,
        state: ProjectState,
        message: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            state,
            elapsed,
            packages: Vec::new(),
            graph: PackageGraph::new(),
            message: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.state == ProjectState::Ok
    }

    pub fn package(&self, key: &PackageKey) -> Option<&PackageResult> {
        self.packages.iter().find(|p| &p.key == key)
    }

    /// Flattens the result into report rows, skipping what `filter` hides.
    ///
    /// A package reached through several parents is listed under each of
    /// them. A dependency cycle is cut where it would revisit a package
    /// already on the current path.
    pub fn rows(&self, filter: &dyn ResultFilter) -> Vec<ReportRow<'_>> {
        let by_key: HashMap<&PackageKey, &PackageResult> =
            self.packages.iter().map(|p| (&p.key, p)).collect();

        let mut rows = Vec::new();
        let mut path: Vec<&PackageKey> = Vec::new();
        for root in self.graph.explicit_nodes() {
            self.push_rows(&root.key, 0, filter, &by_key, &mut path, &mut rows);
        }

        let mut unattributed: Vec<&PackageResult> = self
            .packages
            .iter()
            .filter(|p| p.kind == ReferenceKind::Unattributed && !filter.is_excluded(&p.key))
            .collect();
        unattributed.sort_by(|a, b| a.key.cmp(&b.key));
        rows.extend(unattributed.into_iter().map(|p| ReportRow {
            depth: 0,
            key: &p.key,
            kind: p.kind,
            metrics: Some(&p.metrics),
        }));

        rows
    }

    fn push_rows<'r>(
        &'r self,
        key: &'r PackageKey,
        depth: usize,
        filter: &dyn ResultFilter,
        by_key: &HashMap<&'r PackageKey, &'r PackageResult>,
        path: &mut Vec<&'r PackageKey>,
        rows: &mut Vec<ReportRow<'r>>,
    ) {
        if filter.is_excluded(key) || path.contains(&key) {
            return;
        }
        let Some(node) = self.graph.get(key) else {
            return;
        };

        rows.push(ReportRow {
            depth,
            key: &node.key,
            kind: node.kind,
            metrics: by_key.get(key).map(|p| &p.metrics),
        });

        path.push(key);
        for child in self.graph.children(key) {
            self.push_rows(&child.key, depth + 1, filter, by_key, path, rows);
        }
        path.pop();
    }
}

/// One line of a report.
#[derive(Debug, Clone, Copy)]
pub struct ReportRow<'a> {
    /// Nesting level below the explicit root (0 for roots).
    pub depth: usize,
    pub key: &'a PackageKey,
    pub kind: ReferenceKind,
    pub metrics: Option<&'a MetricSet>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PackageNode;
    use crate::metrics::{MetricName, MetricResult};
    use crate::parser::types::Version;

    fn key(name: &str) -> PackageKey {
        PackageKey::new(name, Version::new(1, 0, 0))
    }

    fn measured() -> MetricSet {
        let mut set = MetricSet::new();
        set.insert(MetricName::Usage, MetricResult::Usage(50.0));
        set
    }

    fn sample() -> ProjectResult {
        let mut graph = PackageGraph::new();
        graph.add(PackageNode::new(key("Zed"), ReferenceKind::Explicit));
        graph.add(PackageNode::new(key("Alpha"), ReferenceKind::Explicit));
        graph.add(PackageNode::new(key("Shared"), ReferenceKind::Transient));
        graph.add(PackageNode::new(key("Core"), ReferenceKind::Transient));
        graph.add_parent(&key("Shared"), &key("Zed"));
        graph.add_parent(&key("Core"), &key("Zed"));
        graph.add_parent(&key("Shared"), &key("Alpha"));

        let packages = vec![
            PackageResult::new(key("Zed"), ReferenceKind::Explicit, measured()),
            PackageResult::new(key("Alpha"), ReferenceKind::Explicit, MetricSet::new()),
            PackageResult::new(key("Shared"), ReferenceKind::Transient, MetricSet::new()),
            PackageResult::new(key("Core"), ReferenceKind::Transient, MetricSet::new()),
            PackageResult::new(key("Loose"), ReferenceKind::Unattributed, measured()),
            PackageResult::new(key("Idle"), ReferenceKind::Unattributed, MetricSet::new()),
        ];
        ProjectResult::ok("P", packages, graph, Duration::from_millis(5))
    }

    fn names(rows: &[ReportRow<'_>]) -> Vec<(usize, String)> {
        rows.iter().map(|r| (r.depth, r.key.name.clone())).collect()
    }

    #[test]
    fn test_rows_top_down_order() {
        let result = sample();
        let rows = result.rows(&NoopFilter);

        assert_eq!(
            names(&rows),
            vec![
                (0, "Alpha".to_string()),
                (1, "Shared".to_string()),
                (0, "Zed".to_string()),
                (1, "Core".to_string()),
                (1, "Shared".to_string()),
                (0, "Idle".to_string()),
                (0, "Loose".to_string()),
            ]
        );
        assert!(rows[0].metrics.unwrap().is_empty());
        assert_eq!(rows[2].kind, ReferenceKind::Explicit);
    }

    #[test]
    fn test_rows_with_metrics_filter() {
        let result = sample();
        let filter = HasMetricsFilter::new(&result);
        let rows = result.rows(&filter);

        assert_eq!(
            names(&rows),
            vec![(0, "Zed".to_string()), (0, "Loose".to_string())]
        );
    }

    #[test]
    fn test_rows_cut_cycles() {
        let mut result = sample();
        result.graph.add_parent(&key("Zed"), &key("Core"));

        let rows = result.rows(&NoopFilter);
        let zed_rows = rows.iter().filter(|r| r.key.name == "Zed").count();
        assert_eq!(zed_rows, 1);
    }

    #[test]
    fn test_failed_and_ignored_results() {
        let failed = ProjectResult::failed("P", ProjectState::LoadFailed, "boom", Duration::ZERO);
        assert!(!failed.is_ok());
        assert_eq!(failed.message.as_deref(), Some("boom"));
        assert!(failed.rows(&NoopFilter).is_empty());

        let ignored = ProjectResult::ignored("Q");
        assert_eq!(ignored.state, ProjectState::Ignored);
        assert_eq!(ignored.state.to_string(), "ignored");
    }
}
