//! Binding of loaded modules to graph packages.

use std::collections::HashSet;

use tracing::debug;

use crate::exclusion::ExclusionPolicy;
use crate::graph::{PackageGraph, PackageKey, PackageNode, ReferenceKind};
use crate::oracle::LoadedModule;

/// A package together with the module that ships its code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundPackage {
    pub node: PackageNode,
    pub module: LoadedModule,
}

impl BoundPackage {
    pub fn key(&self) -> &PackageKey {
        &self.node.key
    }

    pub fn kind(&self) -> ReferenceKind {
        self.node.kind
    }
}

/// Matches each loaded module to its graph node.
///
/// Modules whose root namespace or name is excluded are dropped, as are
/// modules exporting nothing. A module with no graph entry is bound as
/// [`ReferenceKind::Unattributed`]. When two modules share an identity the
/// first one wins.
pub fn bind(
    modules: Vec<LoadedModule>,
    graph: &PackageGraph,
    exclusions: &ExclusionPolicy,
) -> Vec<BoundPackage> {
    let mut seen: HashSet<PackageKey> = HashSet::new();
    let mut bound = Vec::with_capacity(modules.len());

    for module in modules {
        let excluded_ns = module
            .root_namespace
            .as_deref()
            .is_some_and(|ns| exclusions.is_excluded(ns));
        if excluded_ns || exclusions.is_excluded(&module.name) {
            debug!("Skipping module {}: its exported symbols are excluded", module.path);
            continue;
        }
        if !module.has_exports() {
            debug!("Skipping module {}: it exports no symbols", module.path);
            continue;
        }

        let key = PackageKey::new(module.name.clone(), module.version.clone());
        if !seen.insert(key.clone()) {
            continue;
        }

        let node = match graph.get(&key) {
            Some(node) => node.clone(),
            None => PackageNode::unattributed(key),
        };
        bound.push(BoundPackage { node, module });
    }

    bound
}
