//! Graph module for package dependency modeling.
//!
//! This module provides the [`PackageGraph`] arena holding a project's
//! resolved packages and the [`DependencyResolver`] that builds it from
//! explicit package declarations.
//!
//! # Example
//!
//! ```rust
//! use usagescope::graph::{PackageGraph, PackageKey, PackageNode, ReferenceKind};
//! use usagescope::parser::types::Version;
//!
//! let mut graph = PackageGraph::new();
//! let app = PackageKey::new("Serilog", Version::new(3, 1, 1));
//! graph.add(PackageNode::new(app.clone(), ReferenceKind::Explicit));
//!
//! assert_eq!(graph.node_count(), 1);
//! assert!(graph.contains(&app));
//! ```

mod package_graph;
mod resolver;

pub use package_graph::{PackageGraph, PackageKey, PackageNode, ReferenceKind};
pub use resolver::{DependencyResolver, ResolveError, ResolveResult, MAX_DEPENDENCY_DEPTH};
