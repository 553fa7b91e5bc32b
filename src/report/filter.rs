//! Result filters deciding which packages appear in a report.

use std::collections::HashSet;

use super::ProjectResult;
use crate::graph::PackageKey;

/// Decides whether a package is hidden from a report.
pub trait ResultFilter {
    fn is_excluded(&self, key: &PackageKey) -> bool;
}

/// Shows every package.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFilter;

impl ResultFilter for NoopFilter {
    fn is_excluded(&self, _key: &PackageKey) -> bool {
        false
    }
}

/// Shows packages that have a metric value or lead to one.
///
/// A package is kept when it, or any package below it in the dependency
/// graph, has at least one metric value.
#[derive(Debug, Clone, Default)]
pub struct HasMetricsFilter {
    kept: HashSet<PackageKey>,
}

impl HasMetricsFilter {
    pub fn new(result: &ProjectResult) -> Self {
        let mut kept: HashSet<PackageKey> = HashSet::new();
        let mut pending: Vec<&PackageKey> = result
            .packages
            .iter()
            .filter(|p| !p.metrics.is_empty())
            .map(|p| &p.key)
            .collect();

        // Walk upwards so every ancestor of a measured package is kept.
        while let Some(key) = pending.pop() {
            if !kept.insert(key.clone()) {
                continue;
            }
            for parent in result.graph.parents(key) {
                if !kept.contains(&parent.key) {
                    pending.push(&parent.key);
                }
            }
        }

        Self { kept }
    }

    pub fn kept_count(&self) -> usize {
        self.kept.len()
    }
}

impl ResultFilter for HasMetricsFilter {
    fn is_excluded(&self, key: &PackageKey) -> bool {
        !self.kept.contains(key)
    }
}
