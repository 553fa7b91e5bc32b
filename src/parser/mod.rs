//! Parser module for usagescope.
//!
//! This module provides the declaration types shared across the engine
//! (versions, version ranges, target platforms, package references) and the
//! parser for workspace snapshot files.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use usagescope::parser::{parse_file, validate};
//!
//! let snapshot = parse_file(Path::new("workspace.json")).unwrap();
//! validate(&snapshot).unwrap();
//!
//! for project in &snapshot.projects {
//!     println!("{}: {} packages", project.name, project.packages.len());
//! }
//! ```

pub mod snapshot;
pub mod types;

// Re-export commonly used types for convenience
pub use snapshot::{
    parse_file, parse_str, validate, ModuleSnapshot, ParseError, ParseResult, ProjectSnapshot,
    ProjectStatus, ReferenceSnapshot, SolutionSnapshot,
};

pub use types::{PackageReference, TargetPlatform, Version, VersionRange};
