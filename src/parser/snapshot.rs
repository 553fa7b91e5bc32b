//! Parser for workspace snapshot files.
//!
//! A workspace snapshot is a JSON document describing a solution as the
//! analysis engine sees it after project loading and compilation: each
//! project's documents, declared packages and loaded modules, the
//! references its source makes to exported symbols, and optionally the
//! dependency specifications of the packages involved.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::{PackageReference, Version};
use crate::oracle::PackageSpecification;

/// Errors that can occur while parsing snapshots and declarations.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Failed to read the file from disk.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse JSON content.
    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A version string is not a valid semantic version.
    #[error("Invalid version: '{0}'")]
    InvalidVersion(String),

    /// A version range string could not be parsed.
    #[error("Invalid version range: '{0}'")]
    InvalidVersionRange(String),

    /// The snapshot structure is inconsistent.
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result type alias for parser operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Outcome of opening a project, as recorded by the snapshot producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Ok,
    LoadFailed,
    CompilationFailed,
}

/// A reference from project source to a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSnapshot {
    pub symbol: String,
    pub file: String,
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

/// A project of the solution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub name: String,

    #[serde(default)]
    pub status: ProjectStatus,

    #[serde(default)]
    pub default_namespace: Option<String>,

    pub target_platform: String,

    /// Names of same-solution projects this project references.
    #[serde(default)]
    pub project_references: Vec<String>,

    #[serde(default)]
    pub documents: Vec<String>,

    /// Explicit package declarations.
    #[serde(default)]
    pub packages: Vec<PackageReference>,

    /// Paths of the modules the project references.
    #[serde(default)]
    pub modules: Vec<String>,

    #[serde(default)]
    pub references: Vec<ReferenceSnapshot>,
}

/// A binary module available to the solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSnapshot {
    pub path: String,

    /// Defaults to the file name of `path`.
    #[serde(default)]
    pub name: Option<String>,

    /// Defaults to the version segment of `path`.
    #[serde(default)]
    pub version: Option<Version>,

    #[serde(default)]
    pub exported_symbols: Vec<String>,
}

/// The root of a workspace snapshot file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolutionSnapshot {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub projects: Vec<ProjectSnapshot>,

    #[serde(default)]
    pub modules: Vec<ModuleSnapshot>,

    #[serde(default)]
    pub specifications: Vec<PackageSpecification>,
}

impl SolutionSnapshot {
    /// Looks up a project by name (case-insensitive).
    pub fn project(&self, name: &str) -> Option<&ProjectSnapshot> {
        self.projects
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Display name of the solution.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("solution")
    }
}

/// Parses a snapshot file from a file path.
///
/// ```ignore
/// use std::path::Path;
/// use usagescope::parser::snapshot::parse_file;
///
/// let snapshot = parse_file(Path::new("workspace.json")).unwrap();
/// println!("{} projects", snapshot.projects.len());
/// ```
pub fn parse_file(path: &Path) -> ParseResult<SolutionSnapshot> {
    let content = fs::read_to_string(path)?;
    parse_str(&content)
}

/// Parses a snapshot from a string.
///
/// # Example
///
/// ```
/// use usagescope::parser::snapshot::parse_str;
///
/// let json = r#"{"projects": [{"name": "App", "target_platform": "net8.0"}]}"#;
/// let snapshot = parse_str(json).unwrap();
/// assert_eq!(snapshot.projects[0].name, "App");
/// ```
pub fn parse_str(content: &str) -> ParseResult<SolutionSnapshot> {
    let snapshot: SolutionSnapshot = serde_json::from_str(content)?;
    Ok(snapshot)
}

/// Validates a parsed snapshot.
///
/// Rejects snapshots with no projects, unnamed or duplicate projects, and
/// projects referencing siblings that do not exist.
pub fn validate(snapshot: &SolutionSnapshot) -> ParseResult<()> {
    if snapshot.projects.is_empty() {
        return Err(ParseError::InvalidSnapshot(
            "snapshot contains no projects".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for project in &snapshot.projects {
        if project.name.trim().is_empty() {
            return Err(ParseError::InvalidSnapshot(
                "project with an empty name".to_string(),
            ));
        }
        if !seen.insert(project.name.to_lowercase()) {
            return Err(ParseError::InvalidSnapshot(format!(
                "duplicate project: {}",
                project.name
            )));
        }
    }

    for project in &snapshot.projects {
        for reference in &project.project_references {
            if snapshot.project(reference).is_none() {
                return Err(ParseError::InvalidSnapshot(format!(
                    "project {} references unknown project {}",
                    project.name, reference
                )));
            }
        }
    }

    Ok(())
}
