//! Package graph implementation using petgraph.
//!
//! Stores resolved package nodes keyed by `(name, version)`. Each identity
//! exists at most once; two resolution paths reaching the same package
//! share the node and merge their parent links. Edges point from the
//! dependent package to its dependency, so parents are incoming edges and
//! children outgoing edges.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use petgraph::Direction;
use serde::Serialize;

use crate::parser::types::{PackageReference, Version};

/// How a package came to be part of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Declared directly by the project.
    Explicit,
    /// Pulled in by another package's declared dependencies.
    Transient,
    /// A loaded module with no entry in the declaration graph.
    Unattributed,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Explicit => write!(f, "explicit"),
            ReferenceKind::Transient => write!(f, "transient"),
            ReferenceKind::Unattributed => write!(f, "unattributed"),
        }
    }
}

/// Identity of a package: name (compared ignoring ASCII case) and version.
#[derive(Debug, Clone, Serialize)]
pub struct PackageKey {
    pub name: String,
    pub version: Version,
}

impl PackageKey {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    fn folded_name(&self) -> impl Iterator<Item = u8> + '_ {
        self.name.bytes().map(|b| b.to_ascii_lowercase())
    }
}

impl From<&PackageReference> for PackageKey {
    fn from(reference: &PackageReference) -> Self {
        Self::new(reference.name.clone(), reference.version.clone())
    }
}

impl PartialEq for PackageKey {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name) && self.version == other.version
    }
}

impl Eq for PackageKey {}

impl Hash for PackageKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.folded_name() {
            state.write_u8(b);
        }
        self.version.hash(state);
    }
}

impl Ord for PackageKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded_name()
            .cmp(other.folded_name())
            .then_with(|| self.version.cmp(&other.version))
    }
}

impl PartialOrd for PackageKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A node in the package graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageNode {
    pub key: PackageKey,
    pub kind: ReferenceKind,
}

impl PackageNode {
    /// Creates a new package node.
    ///
    /// # Example
    ///
    /// ```rust
    /// use usagescope::graph::{PackageKey, PackageNode, ReferenceKind};
    /// use usagescope::parser::types::Version;
    ///
    /// let node = PackageNode::new(PackageKey::new("Serilog", Version::new(3, 1, 1)), ReferenceKind::Explicit);
    /// assert_eq!(node.name(), "Serilog");
    /// ```
    pub fn new(key: PackageKey, kind: ReferenceKind) -> Self {
        Self { key, kind }
    }

    /// A stand-in for a module the graph knows nothing about.
    pub fn unattributed(key: PackageKey) -> Self {
        Self::new(key, ReferenceKind::Unattributed)
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn version(&self) -> &Version {
        &self.key.version
    }
}

/// Resolved dependency graph of one project.
///
/// # Example
///
/// ```rust
/// use usagescope::graph::{PackageGraph, PackageKey, PackageNode, ReferenceKind};
/// use usagescope::parser::types::Version;
///
/// let a = PackageKey::new("A", Version::new(1, 2, 3));
/// let b = PackageKey::new("B", Version::new(4, 5, 6));
///
/// let mut graph = PackageGraph::new();
/// graph.add(PackageNode::new(a.clone(), ReferenceKind::Explicit));
/// graph.add(PackageNode::new(b.clone(), ReferenceKind::Transient));
/// graph.add_parent(&b, &a);
///
/// assert_eq!(graph.node_count(), 2);
/// assert_eq!(graph.children(&a).len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PackageGraph {
    /// The underlying directed graph
    graph: DiGraph<PackageNode, ()>,
    /// Maps package identities to their node indices
    node_indices: HashMap<PackageKey, NodeIndex>,
}

impl PackageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node. Returns false and leaves the graph unchanged if a node
    /// with the same identity already exists.
    pub fn add(&mut self, node: PackageNode) -> bool {
        if self.node_indices.contains_key(&node.key) {
            return false;
        }
        let key = node.key.clone();
        let idx = self.graph.add_node(node);
        self.node_indices.insert(key, idx);
        true
    }

    /// Looks up a node by name and version.
    pub fn try_get(&self, name: &str, version: &Version) -> Option<&PackageNode> {
        self.get(&PackageKey::new(name, version.clone()))
    }

    pub fn get(&self, key: &PackageKey) -> Option<&PackageNode> {
        self.node_indices
            .get(key)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    pub fn contains(&self, key: &PackageKey) -> bool {
        self.node_indices.contains_key(key)
    }

    /// Records `parent` as depending on `child`. Existing links are kept;
    /// adding the same link twice is a no-op. Returns false if either node
    /// is missing.
    pub fn add_parent(&mut self, child: &PackageKey, parent: &PackageKey) -> bool {
        let (Some(&c), Some(&p)) = (self.node_indices.get(child), self.node_indices.get(parent))
        else {
            return false;
        };
        self.graph.update_edge(p, c, ());
        true
    }

    /// Marks an existing node as explicitly declared.
    pub fn promote_to_explicit(&mut self, key: &PackageKey) -> bool {
        match self
            .node_indices
            .get(key)
            .and_then(|&idx| self.graph.node_weight_mut(idx))
        {
            Some(node) => {
                node.kind = ReferenceKind::Explicit;
                true
            }
            None => false,
        }
    }

    fn neighbors(&self, key: &PackageKey, direction: Direction) -> Vec<&PackageNode> {
        let Some(&idx) = self.node_indices.get(key) else {
            return Vec::new();
        };

        let mut nodes: Vec<&PackageNode> = self
            .graph
            .edges_directed(idx, direction)
            .filter_map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                self.graph.node_weight(other)
            })
            .collect();
        nodes.sort_by(|a, b| a.key.cmp(&b.key));
        nodes
    }

    /// Packages that depend on `key`, ordered by identity.
    pub fn parents(&self, key: &PackageKey) -> Vec<&PackageNode> {
        self.neighbors(key, Direction::Incoming)
    }

    /// Packages `key` depends on, ordered by identity.
    pub fn children(&self, key: &PackageKey) -> Vec<&PackageNode> {
        self.neighbors(key, Direction::Outgoing)
    }

    /// All nodes in insertion order.
    pub fn all_nodes(&self) -> Vec<&PackageNode> {
        self.graph.node_weights().collect()
    }

    /// Explicit nodes ordered by identity.
    pub fn explicit_nodes(&self) -> Vec<&PackageNode> {
        let mut nodes: Vec<&PackageNode> = self
            .graph
            .node_weights()
            .filter(|n| n.kind == ReferenceKind::Explicit)
            .collect();
        nodes.sort_by(|a, b| a.key.cmp(&b.key));
        nodes
    }

    /// Every package reachable below `key`, excluding `key` itself.
    ///
    /// Each package is reported once no matter how many paths reach it, and
    /// cycles terminate.
    pub fn descendants(&self, key: &PackageKey) -> Vec<&PackageNode> {
        let Some(&start) = self.node_indices.get(key) else {
            return Vec::new();
        };

        let mut dfs = Dfs::new(&self.graph, start);
        let mut found = Vec::new();
        while let Some(idx) = dfs.next(&self.graph) {
            if idx != start {
                if let Some(node) = self.graph.node_weight(idx) {
                    found.push(node);
                }
            }
        }
        found
    }

    pub fn descendant_count(&self, key: &PackageKey) -> usize {
        self.descendants(key).len()
    }

    /// Strongly connected groups of packages that depend on each other.
    pub fn detect_cycles(&self) -> Vec<Vec<PackageKey>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                scc.iter()
                    .filter_map(|&idx| self.graph.node_weight(idx))
                    .map(|node| node.key.clone())
                    .collect()
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}
