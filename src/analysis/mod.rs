//! Usage analysis module for usagescope.
//!
//! This module binds loaded modules to the resolved package graph, records
//! which exported symbols the project's source references, and drives the
//! per-project and per-solution analysis.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use usagescope::analysis::Inspector;
//! use usagescope::config::AnalysisParameters;
//! use usagescope::oracle::SnapshotWorkspace;
//!
//! let workspace = SnapshotWorkspace::load(Path::new("workspace.json"))?;
//! let specs = Arc::new(workspace.specifications().clone());
//! let inspector = Arc::new(Inspector::new(specs, AnalysisParameters::new()));
//!
//! let mut results = inspector.analyze_solution(Arc::new(workspace), CancellationToken::new());
//! while let Some(project) = results.next().await {
//!     println!("{}: {} packages", project.name, project.packages.len());
//! }
//! ```

pub mod binder;
pub mod inspector;
pub mod registry;

// Re-export main types for convenience
pub use binder::{bind, BoundPackage};
pub use inspector::{AnalysisError, Inspector, ProjectResults};
pub use registry::UsageRegistry;
